//! Stream Processor - buffered streaming wrapper around the detector
//!
//! Values are buffered until one full window accumulates; the window is
//! analyzed, a result is emitted, and the buffer advances by the slide
//! interval. Equivalent to batch windowing when fed the same sequence.

use std::collections::VecDeque;

use crate::temporal::TemporalDetector;
use crate::types::TemporalPatterns;

/// Buffered streaming pipeline over the temporal detector.
pub struct StreamProcessor {
    detector: TemporalDetector,
    buffer: VecDeque<f64>,
    /// Absolute index of the first buffered element.
    offset: usize,
}

impl StreamProcessor {
    pub fn new(detector: TemporalDetector) -> Self {
        Self {
            detector,
            buffer: VecDeque::new(),
            offset: 0,
        }
    }

    /// Number of buffered, not-yet-analyzed values.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Push one value; returns an analysis result when a window completes.
    pub fn push(&mut self, value: f64) -> Option<TemporalPatterns> {
        self.buffer.push_back(value);
        if self.buffer.len() < self.detector.window_size() {
            return None;
        }

        let window: Vec<f64> = self.buffer.iter().copied().collect();
        let result = self.detector.analyze_single_window(&window, self.offset);

        for _ in 0..self.detector.slide_interval() {
            if self.buffer.pop_front().is_none() {
                break;
            }
            self.offset += 1;
        }

        Some(result)
    }

    /// Push a batch of values, collecting every emitted window result.
    pub fn push_all(&mut self, values: &[f64]) -> Vec<TemporalPatterns> {
        values.iter().filter_map(|&v| self.push(v)).collect()
    }
}
