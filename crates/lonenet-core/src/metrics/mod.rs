//! Graph metrics over a social graph snapshot.
//!
//! - `pearson(graph)`: attribute assortativity of energy across arc endpoints
//! - `average_degree(graph)`, `mean_energy(graph)`
//! - `degree_assortativity(graph)`: source out-degree vs. target in-degree
//! - `coleman_homophily_index(graph, groups)`: per-group segregation index
//! - `classify_lonely(graph, threshold)`, `separation_neighbors(graph, depth)`
//!
//! Notes:
//! - All functions are pure; none mutate the graph.
//! - Iteration follows slot order, so results are deterministic.
//! - Degenerate Coleman groups yield `NaN`; degenerate correlations are errors.

use rustc_hash::FxHashSet;

use crate::engine::errors::ModelError;
use crate::engine::graph::{NodeId, SocialGraph};

/// Decimal places kept by [`pearson`].
pub const PEARSON_PRECISION: i32 = 5;

/// Default energy threshold separating lonely from non-lonely nodes.
pub const LONELY_THRESHOLD: f64 = 0.4;

/// Rounds `value` to `decimals` places, normalising `-0.0` to `0.0`.
pub fn round_decimals(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale + 0.0
}

/// Index of the group value closest to `value`; ties go to the lower index.
pub fn nearest_group(value: f64, groups: &[f64]) -> Option<usize> {
    groups
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, g)| {
            let dist = (value - g).abs();
            match best {
                Some((_, d)) if d <= dist => best,
                _ => Some((i, dist)),
            }
        })
        .map(|(i, _)| i)
}

/// Energy assortativity rounded to [`PEARSON_PRECISION`] decimals.
pub fn pearson(graph: &SocialGraph) -> Result<f64, ModelError> {
    pearson_raw(graph).map(|r| round_decimals(r, PEARSON_PRECISION))
}

/// Pearson correlation of source and target energy across all arcs.
///
/// When every source shares one energy and every target shares one energy the
/// correlation is defined as exactly 1. Any other zero-variance configuration
/// (and the empty arc set) is a [`ModelError::Numerical`].
pub fn pearson_raw(graph: &SocialGraph) -> Result<f64, ModelError> {
    let states = graph.states();
    let pairs: Vec<(f64, f64)> = graph
        .edge_slots()
        .map(|(s, d)| (states[s].e, states[d].e))
        .collect();
    correlation(&pairs, "energy")
}

/// Pearson correlation of source out-degree with target in-degree.
///
/// Returns `NaN` when either side has zero variance or there are no arcs.
pub fn degree_assortativity(graph: &SocialGraph) -> f64 {
    let pairs: Vec<(f64, f64)> = graph
        .edge_slots()
        .map(|(s, d)| {
            (
                graph.out_slots(s).len() as f64,
                graph.in_slots(d).len() as f64,
            )
        })
        .collect();
    match correlation(&pairs, "degree") {
        Ok(r) if !pairs.iter().all(|p| *p == pairs[0]) => r,
        _ => f64::NAN,
    }
}

fn correlation(pairs: &[(f64, f64)], what: &str) -> Result<f64, ModelError> {
    let Some(&(x0, y0)) = pairs.first() else {
        return Err(ModelError::Numerical(format!(
            "{} correlation of a graph without arcs",
            what
        )));
    };
    if pairs.iter().all(|&(x, y)| x == x0 && y == y0) {
        return Ok(1.0);
    }

    let n = pairs.len() as f64;
    let (sum_x, sum_y) = pairs
        .iter()
        .fold((0.0, 0.0), |(sx, sy), &(x, y)| (sx + x, sy + y));
    let (mean_x, mean_y) = (sum_x / n, sum_y / n);
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for &(x, y) in pairs {
        let (dx, dy) = (x - mean_x, y - mean_y);
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return Err(ModelError::Numerical(format!(
            "zero variance in {} endpoints ({} arcs); cannot correlate",
            what,
            pairs.len()
        )));
    }
    let r = cov / (var_x.sqrt() * var_y.sqrt());
    if r.is_nan() {
        return Err(ModelError::Numerical(format!(
            "{} correlation is NaN",
            what
        )));
    }
    Ok(r.clamp(-1.0, 1.0))
}

/// Mean total (in + out) degree; `0.0` for the empty graph.
pub fn average_degree(graph: &SocialGraph) -> f64 {
    if graph.is_empty() {
        return 0.0;
    }
    (2 * graph.edge_count()) as f64 / graph.node_count() as f64
}

/// Mean node energy; `NaN` for the empty graph.
pub fn mean_energy(graph: &SocialGraph) -> f64 {
    let states = graph.states();
    states.iter().map(|s| s.e).sum::<f64>() / states.len() as f64
}

/// Coleman homophily index per group, aligned with `groups`.
///
/// Nodes belong to the group whose value is nearest their current energy.
/// The index is negative when within-group out-ties fall short of the count
/// expected under random choice and positive when they exceed it, scaled to
/// [-1, 1]. Empty groups and zero denominators yield `NaN`.
pub fn coleman_homophily_index(graph: &SocialGraph, groups: &[f64]) -> Vec<f64> {
    let n = graph.node_count();
    let assignment: Vec<Option<usize>> = graph
        .states()
        .iter()
        .map(|s| nearest_group(s.e, groups))
        .collect();

    let mut members = vec![0usize; groups.len()];
    let mut out_degree = vec![0usize; groups.len()];
    let mut within = vec![0usize; groups.len()];
    for slot in 0..n {
        let Some(g) = assignment[slot] else { continue };
        members[g] += 1;
        out_degree[g] += graph.out_slots(slot).len();
        within[g] += graph
            .out_slots(slot)
            .iter()
            .filter(|&&d| assignment[d] == Some(g))
            .count();
    }

    (0..groups.len())
        .map(|g| {
            if members[g] == 0 || n < 2 {
                return f64::NAN;
            }
            let share = (members[g] - 1) as f64 / (n - 1) as f64;
            let expected = out_degree[g] as f64 * share;
            let observed = within[g] as f64;
            let denominator = if observed < expected {
                expected
            } else {
                out_degree[g] as f64 - expected
            };
            if denominator == 0.0 {
                f64::NAN
            } else {
                (observed - expected) / denominator
            }
        })
        .collect()
}

/// Lonely (`0`) / non-lonely (`1`) classification per node.
///
/// Energy at or below `threshold` is floored, anything above is ceiled.
pub fn classify_lonely(graph: &SocialGraph, threshold: f64) -> Vec<(NodeId, f64)> {
    graph
        .ids()
        .iter()
        .zip(graph.states())
        .map(|(&id, s)| {
            let class = if s.e <= threshold { s.e.floor() } else { s.e.ceil() };
            (id, class)
        })
        .collect()
}

/// Out-neighbors first reached at each degree of separation `1..=depth`.
///
/// `levels[d - 1]` holds the nodes first reached at distance `d`, sorted by id.
/// The ego itself may reappear at distance two or more through a cycle.
pub fn separation_neighbors(graph: &SocialGraph, depth: usize) -> Vec<(NodeId, Vec<Vec<NodeId>>)> {
    graph
        .ids()
        .iter()
        .enumerate()
        .map(|(slot, &id)| {
            let mut levels: Vec<Vec<usize>> = Vec::with_capacity(depth);
            let mut visited: FxHashSet<usize> = FxHashSet::default();
            let mut first: Vec<usize> = graph.out_slots(slot).to_vec();
            first.sort_unstable();
            first.dedup();
            if depth > 0 {
                visited.extend(first.iter().copied());
                levels.push(first);
            }
            while levels.len() < depth {
                let mut next: Vec<usize> = levels
                    .last()
                    .into_iter()
                    .flatten()
                    .flat_map(|&s| graph.out_slots(s).iter().copied())
                    .collect();
                next.sort_unstable();
                next.dedup();
                let fresh: Vec<usize> = next.iter().copied().filter(|s| !visited.contains(s)).collect();
                visited.extend(next);
                levels.push(fresh);
            }
            let mut named: Vec<Vec<NodeId>> = levels
                .into_iter()
                .map(|level| level.into_iter().map(|s| graph.id_at(s)).collect())
                .collect();
            for level in &mut named {
                level.sort_unstable();
            }
            (id, named)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::graph::NodeState;

    fn graph_with(values: &[f64], arcs: &[(u32, u32)]) -> SocialGraph {
        let mut g = SocialGraph::default();
        for (i, &v) in values.iter().enumerate() {
            g.add_node(NodeId(i as u32), NodeState::uniform(v)).unwrap();
        }
        for &(a, b) in arcs {
            g.add_edge(NodeId(a), NodeId(b)).unwrap();
        }
        g
    }

    #[test]
    fn pearson_of_uniform_endpoints_is_one() {
        let g = graph_with(&[0.2, 0.2, 0.2], &[(0, 1), (1, 2)]);
        assert_eq!(pearson(&g).unwrap(), 1.0);
    }

    #[test]
    fn pearson_detects_full_assortativity_and_disassortativity() {
        let assort = graph_with(&[0.2, 0.2, 0.8, 0.8], &[(0, 1), (1, 0), (2, 3), (3, 2)]);
        assert_eq!(pearson(&assort).unwrap(), 1.0);

        let disassort = graph_with(&[0.2, 0.2, 0.8, 0.8], &[(0, 2), (2, 1), (1, 3), (3, 0)]);
        assert_eq!(pearson(&disassort).unwrap(), -1.0);
    }

    #[test]
    fn pearson_rejects_one_sided_zero_variance() {
        // every source is 0.2, targets vary
        let g = graph_with(&[0.2, 0.2, 0.8], &[(0, 1), (0, 2)]);
        assert!(matches!(pearson(&g), Err(ModelError::Numerical(_))));
    }

    #[test]
    fn pearson_of_arcless_graph_is_an_error() {
        let g = graph_with(&[0.2, 0.8], &[]);
        assert!(pearson(&g).is_err());
    }

    #[test]
    fn average_degree_counts_both_directions() {
        let g = graph_with(&[0.2, 0.2, 0.2], &[(0, 1), (1, 2)]);
        assert!((average_degree(&g) - 4.0 / 3.0).abs() < 1e-12);
        assert_eq!(average_degree(&SocialGraph::default()), 0.0);
    }

    #[test]
    fn coleman_index_signs_and_nan() {
        // perfectly segregated two-group graph
        let g = graph_with(&[0.2, 0.2, 0.8, 0.8], &[(0, 1), (1, 0), (2, 3), (3, 2)]);
        let idx = coleman_homophily_index(&g, &[0.2, 0.8]);
        assert!((idx[0] - 1.0).abs() < 1e-12);
        assert!((idx[1] - 1.0).abs() < 1e-12);

        // fully cross-group ties push the index to -1
        let g = graph_with(&[0.2, 0.2, 0.8, 0.8], &[(0, 2), (1, 3), (2, 0), (3, 1)]);
        let idx = coleman_homophily_index(&g, &[0.2, 0.8]);
        assert!((idx[0] + 1.0).abs() < 1e-12);

        // a group with no members
        let idx = coleman_homophily_index(&g, &[0.2, 0.5, 0.8]);
        assert!(idx[1].is_nan());
    }

    #[test]
    fn classify_lonely_uses_threshold() {
        let g = graph_with(&[0.2, 0.4, 0.41, 0.8], &[]);
        let classes: Vec<f64> = classify_lonely(&g, LONELY_THRESHOLD)
            .into_iter()
            .map(|(_, c)| c)
            .collect();
        assert_eq!(classes, vec![0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn separation_levels_exclude_earlier_levels() {
        // 0 -> 1 -> 2 -> 3, and 0 -> 2
        let g = graph_with(&[0.2; 4], &[(0, 1), (1, 2), (2, 3), (0, 2)]);
        let levels = separation_neighbors(&g, 3);
        let (id, ego) = &levels[0];
        assert_eq!(*id, NodeId(0));
        assert_eq!(ego[0], vec![NodeId(1), NodeId(2)]);
        assert_eq!(ego[1], vec![NodeId(3)]);
        assert!(ego[2].is_empty());
    }

    #[test]
    fn degree_assortativity_is_nan_when_degenerate() {
        let g = graph_with(&[0.2, 0.2], &[(0, 1)]);
        assert!(degree_assortativity(&g).is_nan());
    }

    #[test]
    fn nearest_group_breaks_ties_low() {
        assert_eq!(nearest_group(0.5, &[0.2, 0.8]), Some(0));
        assert_eq!(nearest_group(0.7, &[0.2, 0.8]), Some(1));
        assert_eq!(nearest_group(0.7, &[]), None);
    }
}
