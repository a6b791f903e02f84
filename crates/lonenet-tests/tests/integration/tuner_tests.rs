//! Integration tests for the assortativity tuner.

use lonenet_core::engine::errors::ModelError;
use lonenet_core::engine::generators::GraphBuilder;
use lonenet_core::engine::tuner::hits_target;
use lonenet_core::metrics::pearson;
use lonenet_core::{fully_assortative, AssortativityTuner, GeneratorKind};
use lonenet_tests::{seeded, two_group_tuner, GROUPS};
use std::collections::HashSet;

#[test]
fn test_tune_reaches_each_target_within_budget() {
    let tuner = two_group_tuner(100).unwrap();
    let mut rng = seeded(2024);
    for target in [-0.8, -0.4, 0.0, 0.4, 0.8] {
        let tuned = tuner.tune(target, &mut rng).unwrap();
        assert!(tuned.retries <= 100);
        if target != 0.0 {
            assert!(
                hits_target(tuned.assortativity, target),
                "target {} measured {}",
                target,
                tuned.assortativity
            );
            let rounded = (pearson(tuned.graph()).unwrap() * 100.0).round() / 100.0;
            assert_eq!(rounded, target);
        }
    }
}

#[test]
fn test_tuned_graphs_have_no_self_loops_or_duplicates() {
    let tuner = two_group_tuner(100).unwrap();
    let mut rng = seeded(5);
    for target in [-0.6, 0.3] {
        let tuned = tuner.tune(target, &mut rng).unwrap();
        let arcs: Vec<_> = tuned.graph().edges().collect();
        let unique: HashSet<_> = arcs.iter().copied().collect();
        assert_eq!(unique.len(), arcs.len());
        assert!(arcs.iter().all(|(a, b)| a != b));
    }
}

#[test]
fn test_positive_tuning_keeps_start_degrees() {
    let tuner = two_group_tuner(100).unwrap();
    let builder = GraphBuilder::new(tuner.generator());
    let start = fully_assortative(&GROUPS, 100, &builder, &mut seeded(99)).unwrap();
    let tuned = tuner.tune(0.2, &mut seeded(99)).unwrap();
    assert_eq!(tuned.retries, 0);
    assert_eq!(tuned.graph().degree_sequence(), start.graph.degree_sequence());
}

#[test]
fn test_retry_budget_is_reported() {
    let tuner = AssortativityTuner::new(
        &GROUPS,
        3,
        GeneratorKind::PreferentialAttachment { m: 1 },
        5,
    )
    .unwrap();
    let err = tuner.tune(0.5, &mut seeded(1)).unwrap_err();
    assert!(matches!(
        err,
        ModelError::RetryBudgetExceeded { retries: 5, .. }
    ));
}

#[test]
fn test_sweep_collects_default_targets() {
    let tuner = two_group_tuner(20).unwrap();
    let targets = [-0.8, -0.6, -0.4, -0.2, 0.0, 0.2, 0.4, 0.6, 0.8];
    let tuned = tuner.tune_sweep(&targets, &mut seeded(17)).unwrap();
    for (net, &target) in tuned.iter().zip(&targets) {
        assert!(hits_target(net.assortativity, target));
    }
}
