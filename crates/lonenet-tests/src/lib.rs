//! Shared fixtures for the lonenet integration and property tests.

use lonenet_core::engine::errors::ModelError;
use lonenet_core::{AssortativityTuner, GeneratorKind, NodeId, NodeState, SocialGraph};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Group values used throughout the tests.
pub const GROUPS: [f64; 2] = [0.2, 0.8];

pub fn seeded(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Graph with node `i` at `values[i]` and the given arcs.
pub fn graph_from(values: &[f64], arcs: &[(u32, u32)]) -> Result<SocialGraph, ModelError> {
    let mut graph = SocialGraph::with_capacity(values.len());
    for (i, &value) in values.iter().enumerate() {
        graph.add_node(NodeId(i as u32), NodeState::uniform(value))?;
    }
    for &(src, dst) in arcs {
        graph.add_edge(NodeId(src), NodeId(dst))?;
    }
    Ok(graph)
}

/// Directed line `0 -> 1 -> ... -> n-1` with every node at `value`.
pub fn line_graph(n: u32, value: f64) -> Result<SocialGraph, ModelError> {
    let values = vec![value; n as usize];
    let arcs: Vec<(u32, u32)> = (1..n).map(|i| (i - 1, i)).collect();
    graph_from(&values, &arcs)
}

/// Two-group tuner large enough that one swap moves assortativity by less
/// than 0.01.
pub fn two_group_tuner(max_retries: usize) -> Result<AssortativityTuner, ModelError> {
    AssortativityTuner::new(
        &GROUPS,
        100,
        GeneratorKind::PreferentialAttachment { m: 3 },
        max_retries,
    )
}
