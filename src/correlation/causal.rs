//! Granger-style causal screening over retained relationships.
//!
//! For each relationship whose series are long enough, an F-test compares a
//! restricted autoregression of the target on its own lags against an
//! unrestricted model that adds the candidate cause's lags. A direction is
//! accepted when F exceeds the acceptance gate; both directions passing
//! marks the link bidirectional.
//!
//! The graph is stored as (nodes, edge index pairs) — no pointers. Root
//! causes are nodes with outgoing edges and no incoming edges; effects
//! mirror that.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::analyzer::{lagged_correlation, CorrelationMethod};
use crate::types::{CausalAnalysis, CausalGraph, CausalLink, Relationship};

/// Autoregressive lag order for both Granger models.
const LAG_ORDER: usize = 2;

/// Minimum series length for a Granger test.
const MIN_SERIES_LEN: usize = 20;

/// F-statistic gate for accepting a causal direction.
const F_ACCEPT: f64 = 3.0;

/// Numerical floor guarding residual-sum divisions.
const RSS_FLOOR: f64 = 1e-12;

/// Run the causal screen over all retained relationships.
pub fn analyze(series: &[Cow<'_, [f64]>], relationships: &[Relationship]) -> CausalAnalysis {
    let mut links = Vec::new();

    for rel in relationships {
        let a = &series[rel.source];
        let b = &series[rel.target];
        if a.len() < MIN_SERIES_LEN || b.len() < MIN_SERIES_LEN {
            // Reported per-record by omission; the overall call still succeeds.
            debug!(
                source = rel.source,
                target = rel.target,
                "Series too short for Granger screen — skipping pair"
            );
            continue;
        }

        let forward = granger_f_statistic(a, b, LAG_ORDER);
        let reverse = granger_f_statistic(b, a, LAG_ORDER);
        let optimal_lag = best_lag(a, b);

        if forward > F_ACCEPT {
            links.push(CausalLink {
                source: rel.source,
                target: rel.target,
                f_statistic: forward,
                reverse_f_statistic: reverse,
                bidirectional: reverse > F_ACCEPT,
                optimal_lag,
            });
        } else if reverse > F_ACCEPT {
            links.push(CausalLink {
                source: rel.target,
                target: rel.source,
                f_statistic: reverse,
                reverse_f_statistic: forward,
                bidirectional: false,
                optimal_lag: -optimal_lag,
            });
        }
    }

    let graph = build_graph(&links);
    let (root_causes, effects) = roots_and_effects(&graph);

    debug!(
        links = links.len(),
        nodes = graph.nodes.len(),
        roots = root_causes.len(),
        "Causal screen complete"
    );

    CausalAnalysis {
        links,
        graph,
        root_causes,
        effects,
    }
}

/// Granger F-statistic for "x causes y" with lag order p.
///
/// Restricted: y[t] ~ intercept + y[t-1..t-p].
/// Unrestricted: adds x[t-1..t-p].
/// F = ((RSS_r - RSS_u) / p) / (RSS_u / (n - 2p - 1)).
///
/// Returns 0.0 when either regression is unsolvable (degenerate inputs).
pub fn granger_f_statistic(x: &[f64], y: &[f64], p: usize) -> f64 {
    let n = x.len().min(y.len());
    if n < MIN_SERIES_LEN || n <= 2 * p + 1 {
        return 0.0;
    }
    let x = &x[..n];
    let y = &y[..n];

    let observations = n - p;

    // Restricted design: intercept + p own lags.
    let mut restricted = Vec::with_capacity(observations);
    // Unrestricted design: intercept + p own lags + p cause lags.
    let mut unrestricted = Vec::with_capacity(observations);
    let mut targets = Vec::with_capacity(observations);

    for t in p..n {
        let mut row_r = Vec::with_capacity(1 + p);
        let mut row_u = Vec::with_capacity(1 + 2 * p);
        row_r.push(1.0);
        row_u.push(1.0);
        for lag in 1..=p {
            row_r.push(y[t - lag]);
            row_u.push(y[t - lag]);
        }
        for lag in 1..=p {
            row_u.push(x[t - lag]);
        }
        restricted.push(row_r);
        unrestricted.push(row_u);
        targets.push(y[t]);
    }

    let Some(rss_restricted) = residual_sum_of_squares(&restricted, &targets) else {
        return 0.0;
    };
    let Some(rss_unrestricted) = residual_sum_of_squares(&unrestricted, &targets) else {
        return 0.0;
    };

    let dof = observations as f64 - (2 * p + 1) as f64;
    if dof <= 0.0 {
        return 0.0;
    }

    let numerator = ((rss_restricted - rss_unrestricted).max(0.0)) / p as f64;
    let denominator = (rss_unrestricted / dof).max(RSS_FLOOR);
    numerator / denominator
}

/// RSS of an OLS fit solved via the normal equations.
///
/// Returns None when the Gram matrix is singular.
fn residual_sum_of_squares(design: &[Vec<f64>], targets: &[f64]) -> Option<f64> {
    let k = design.first()?.len();

    // Gram matrix X'X and moment vector X'y.
    let mut gram = vec![vec![0.0; k]; k];
    let mut moment = vec![0.0; k];
    for (row, &target) in design.iter().zip(targets) {
        for i in 0..k {
            moment[i] += row[i] * target;
            for j in 0..k {
                gram[i][j] += row[i] * row[j];
            }
        }
    }

    let beta = solve_linear_system(&mut gram, &mut moment)?;

    let rss = design
        .iter()
        .zip(targets)
        .map(|(row, &target)| {
            let predicted: f64 = row.iter().zip(&beta).map(|(a, b)| a * b).sum();
            (target - predicted).powi(2)
        })
        .sum();
    Some(rss)
}

/// In-place Gaussian elimination with partial pivoting.
fn solve_linear_system(matrix: &mut [Vec<f64>], rhs: &mut [f64]) -> Option<Vec<f64>> {
    let k = rhs.len();

    for col in 0..k {
        // Partial pivot.
        let mut pivot_row = col;
        for row in (col + 1)..k {
            if matrix[row][col].abs() > matrix[pivot_row][col].abs() {
                pivot_row = row;
            }
        }
        if matrix[pivot_row][col].abs() < RSS_FLOOR {
            return None;
        }
        matrix.swap(col, pivot_row);
        rhs.swap(col, pivot_row);

        for row in (col + 1)..k {
            let factor = matrix[row][col] / matrix[col][col];
            for c in col..k {
                matrix[row][c] -= factor * matrix[col][c];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut solution = vec![0.0; k];
    for row in (0..k).rev() {
        let mut sum = rhs[row];
        for col in (row + 1)..k {
            sum -= matrix[row][col] * solution[col];
        }
        solution[row] = sum / matrix[row][row];
    }
    Some(solution)
}

/// Lag with the highest |Pearson r| between the pair (positive = a leads).
fn best_lag(a: &[f64], b: &[f64]) -> i64 {
    let n = a.len().min(b.len());
    let max_lag = (n / 4) as i64;
    let methods = [CorrelationMethod::Pearson];

    let mut best = 0i64;
    let mut best_r = 0.0f64;
    for lag in -max_lag..=max_lag {
        let r = lagged_correlation(a, b, lag, &methods);
        if r.abs() > best_r.abs() {
            best_r = r;
            best = lag;
        }
    }
    best
}

/// Build the directed multigraph from accepted links.
fn build_graph(links: &[CausalLink]) -> CausalGraph {
    let mut node_set = BTreeSet::new();
    let mut edges = Vec::new();
    for link in links {
        node_set.insert(link.source);
        node_set.insert(link.target);
        edges.push((link.source, link.target));
        if link.bidirectional {
            edges.push((link.target, link.source));
        }
    }
    CausalGraph {
        nodes: node_set.into_iter().collect(),
        edges,
    }
}

/// Roots have out-edges and no in-edges; effects mirror.
fn roots_and_effects(graph: &CausalGraph) -> (Vec<usize>, Vec<usize>) {
    let mut out_degree: BTreeMap<usize, usize> = BTreeMap::new();
    let mut in_degree: BTreeMap<usize, usize> = BTreeMap::new();
    for &(source, target) in &graph.edges {
        *out_degree.entry(source).or_insert(0) += 1;
        *in_degree.entry(target).or_insert(0) += 1;
    }

    let roots = graph
        .nodes
        .iter()
        .copied()
        .filter(|n| out_degree.get(n).copied().unwrap_or(0) > 0 && !in_degree.contains_key(n))
        .collect();
    let effects = graph
        .nodes
        .iter()
        .copied()
        .filter(|n| in_degree.get(n).copied().unwrap_or(0) > 0 && !out_degree.contains_key(n))
        .collect();
    (roots, effects)
}

/// Clustering coefficient and modularity over the undirected relationship
/// graph.
///
/// Clustering coefficient is global transitivity: 3 x triangles over
/// connected triples. Modularity is Newman Q with connected components as
/// the community partition — a partition-quality floor, not a community
/// search.
pub fn graph_statistics(pattern_count: usize, relationships: &[Relationship]) -> (f64, f64) {
    if relationships.is_empty() {
        return (0.0, 0.0);
    }

    let mut adjacency: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); pattern_count];
    for rel in relationships {
        adjacency[rel.source].insert(rel.target);
        adjacency[rel.target].insert(rel.source);
    }

    // Transitivity: count closed and total connected triples centered on
    // each node.
    let mut closed = 0usize;
    let mut triples = 0usize;
    for neighbors in &adjacency {
        let ns: Vec<usize> = neighbors.iter().copied().collect();
        for i in 0..ns.len() {
            for j in (i + 1)..ns.len() {
                triples += 1;
                if adjacency[ns[i]].contains(&ns[j]) {
                    closed += 1;
                }
            }
        }
    }
    let clustering = if triples > 0 {
        closed as f64 / triples as f64
    } else {
        0.0
    };

    // Newman Q over connected components.
    let component = connected_components(&adjacency);
    let m = relationships.len() as f64;
    let mut within: BTreeMap<usize, f64> = BTreeMap::new();
    let mut degree_sum: BTreeMap<usize, f64> = BTreeMap::new();
    for rel in relationships {
        let c = component[rel.source];
        *within.entry(c).or_insert(0.0) += 1.0;
    }
    for (node, neighbors) in adjacency.iter().enumerate() {
        if neighbors.is_empty() {
            continue;
        }
        *degree_sum.entry(component[node]).or_insert(0.0) += neighbors.len() as f64;
    }
    let modularity = within
        .keys()
        .map(|c| {
            let e_c = within.get(c).copied().unwrap_or(0.0) / m;
            let d_c = degree_sum.get(c).copied().unwrap_or(0.0) / (2.0 * m);
            e_c - d_c * d_c
        })
        .sum();

    (clustering, modularity)
}

/// Label each node with its connected component id.
fn connected_components(adjacency: &[BTreeSet<usize>]) -> Vec<usize> {
    let n = adjacency.len();
    let mut component = vec![usize::MAX; n];
    let mut next_id = 0;

    for start in 0..n {
        if component[start] != usize::MAX {
            continue;
        }
        component[start] = next_id;
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            for &neighbor in &adjacency[node] {
                if component[neighbor] == usize::MAX {
                    component[neighbor] = next_id;
                    stack.push(neighbor);
                }
            }
        }
        next_id += 1;
    }
    component
}
