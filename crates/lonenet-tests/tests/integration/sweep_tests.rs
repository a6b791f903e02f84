//! Integration tests for per-target sweep units.

use lonenet_core::engine::sweep::{run_units, tune_targets, unit_seed};
use lonenet_core::engine::tuner::hits_target;
use lonenet_core::ModelError;
use lonenet_tests::two_group_tuner;

#[test]
fn test_tune_targets_is_reproducible() {
    let tuner = two_group_tuner(100).unwrap();
    let targets = [0.6, -0.2];
    let a = tune_targets(&tuner, &targets, 1, 123);
    let b = tune_targets(&tuner, &targets, 1, 123);

    for (x, y) in a.iter().zip(&b) {
        assert_eq!(x.seed, unit_seed(123, x.index));
        let gx = x.outcome.as_ref().unwrap();
        let gy = y.outcome.as_ref().unwrap();
        assert!(hits_target(gx[0].assortativity, x.target));
        assert_eq!(
            gx[0].graph().edges().collect::<Vec<_>>(),
            gy[0].graph().edges().collect::<Vec<_>>()
        );
    }
}

#[test]
fn test_failed_unit_is_isolated() {
    let tuner = two_group_tuner(100).unwrap();
    let units = run_units(&[0.4, 2.0], 8, |target, rng| tuner.tune(target, rng));

    assert!(units[0].outcome.is_ok());
    assert!(matches!(units[1].outcome, Err(ModelError::Config(_))));
}
