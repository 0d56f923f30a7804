//! Identifier minting for engine artifacts.
//!
//! Format: `pat_` / `anom_` / `corr_` followed by 16 lowercase hex characters
//! drawn from the OS entropy source, so identifiers are unguessable and
//! collision-safe across restarts.

use rand::rngs::OsRng;
use rand::RngCore;

/// Mint a pattern identifier (`pat_` + 16 hex chars).
pub fn pattern_id() -> String {
    mint("pat_")
}

/// Mint an anomaly identifier (`anom_` + 16 hex chars).
pub fn anomaly_id() -> String {
    mint("anom_")
}

/// Mint a correlation identifier (`corr_` + 16 hex chars).
pub fn correlation_id() -> String {
    mint("corr_")
}

/// Current wall-clock timestamp in epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn mint(prefix: &str) -> String {
    use std::fmt::Write;

    let mut bytes = [0u8; 8];
    OsRng.fill_bytes(&mut bytes);
    let mut out = String::with_capacity(prefix.len() + 16);
    out.push_str(prefix);
    for b in bytes {
        // Writing to a String cannot fail.
        let _ = write!(out, "{b:02x}");
    }
    out
}
