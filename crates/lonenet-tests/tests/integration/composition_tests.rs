//! Integration tests for fully assortative and disassortative compositions.

use lonenet_core::engine::generators::{GeneratorKind, GraphBuilder};
use lonenet_core::metrics::{average_degree, pearson};
use lonenet_core::{fully_assortative, fully_disassortative};
use lonenet_tests::{seeded, GROUPS};

fn generators() -> Vec<GeneratorKind> {
    vec![
        GeneratorKind::PreferentialAttachment { m: 3 },
        GeneratorKind::PowerLawCluster { m: 3, p: 0.2 },
        GeneratorKind::UniformRandom { p: 0.1 },
    ]
}

#[test]
fn test_fully_assortative_is_exactly_one() {
    for (seed, kind) in generators().into_iter().enumerate() {
        let builder = GraphBuilder::new(kind);
        let net = fully_assortative(&GROUPS, 40, &builder, &mut seeded(seed as u64)).unwrap();
        assert_eq!(pearson(&net.graph).unwrap(), 1.0, "{:?}", kind);
        assert_eq!(net.links.len(), net.graph.edge_count());
    }
}

#[test]
fn test_fully_disassortative_is_exactly_minus_one_with_same_average_degree() {
    for (seed, kind) in generators().into_iter().enumerate() {
        let builder = GraphBuilder::new(kind);
        let assort = fully_assortative(&GROUPS, 40, &builder, &mut seeded(seed as u64)).unwrap();
        let disassort =
            fully_disassortative(&GROUPS, 40, &builder, &mut seeded(seed as u64)).unwrap();

        assert_eq!(pearson(&disassort.graph).unwrap(), -1.0, "{:?}", kind);
        assert_eq!(average_degree(&disassort.graph), average_degree(&assort.graph));
        assert_eq!(disassort.graph.edge_count(), assort.graph.edge_count());
    }
}

#[test]
fn test_compositions_keep_group_states_uniform() {
    let builder = GraphBuilder::new(GeneratorKind::PreferentialAttachment { m: 2 });
    let net = fully_disassortative(&GROUPS, 25, &builder, &mut seeded(3)).unwrap();
    for (key, members) in net.members.iter().enumerate() {
        assert_eq!(members.len(), 25);
        for id in members {
            let state = net.graph.state(*id).unwrap();
            assert_eq!(state.e, GROUPS[key]);
            assert_eq!(state.k, GROUPS[key]);
        }
    }
}

#[test]
fn test_four_symmetric_groups_reach_minus_one() {
    let groups = [0.1, 0.4, 0.6, 0.9];
    let builder = GraphBuilder::new(GeneratorKind::PreferentialAttachment { m: 2 });
    let net = fully_disassortative(&groups, 20, &builder, &mut seeded(12)).unwrap();
    assert_eq!(pearson(&net.graph).unwrap(), -1.0);
}
