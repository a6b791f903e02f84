//! Integration tests for the energy dynamics and simulation runs.

use lonenet_core::engine::dynamics::ConvergenceMonitor;
use lonenet_core::{DynamicsEngine, DynamicsParams, RelativeStrengths, Simulation};
use lonenet_tests::{graph_from, line_graph, seeded, two_group_tuner, GROUPS};

fn params(point: [f64; 3], noise_std: f64) -> DynamicsParams {
    let strengths = RelativeStrengths::from_point(point).unwrap();
    DynamicsParams::new(0.05, 0.5, strengths, noise_std).unwrap()
}

#[test]
fn test_line_graph_cognitive_steps() {
    let graph = line_graph(3, 0.2).unwrap();
    let mut engine = DynamicsEngine::new(graph, params([1.0, 0.0, 0.0], 0.0)).unwrap();
    let mut rng = seeded(0);

    let expected_k = [0.205, 0.209875, 0.214628125, 0.219262421875, 0.223780861328125];
    for &k in &expected_k {
        engine.step(&mut rng);
        for state in engine.graph().states() {
            assert_eq!(state.e, 0.2);
            assert!((state.k - k).abs() < 1e-12, "k = {}, expected {}", state.k, k);
        }
    }
    assert_eq!(engine.steps(), 5);
}

#[test]
fn test_sources_without_in_arcs_keep_energy_under_noise() {
    // node 0 only sends; nodes 1 and 2 receive
    let graph = graph_from(&[0.7, 0.3, 0.4], &[(0, 1), (0, 2), (1, 2)]).unwrap();
    let mut engine = DynamicsEngine::new(graph, params([0.2, 0.3, 0.5], 0.5)).unwrap();
    engine.run_for(20, &mut seeded(3));

    let states = engine.graph().states();
    assert_eq!(states[0].e, 0.7);
    assert_ne!(states[1].e, 0.3);
    assert_ne!(states[2].e, 0.4);
}

#[test]
fn test_same_seed_gives_same_trajectory() {
    let run = |seed| {
        let graph = graph_from(&[0.2, 0.8, 0.5], &[(0, 1), (1, 2), (2, 0)]).unwrap();
        let sim = Simulation::new(graph, params([0.3, 0.3, 0.4], 0.1), 50).unwrap();
        sim.run(&mut seeded(seed))
    };
    let a = run(11);
    let b = run(11);
    assert_eq!(a.trace, b.trace);
    assert_eq!(a.graph.states(), b.graph.states());
}

#[test]
fn test_assortative_contagion_run_freezes() {
    let tuned = two_group_tuner(10).unwrap().tune(1.0, &mut seeded(6)).unwrap();
    let nodes = tuned.graph().node_count();
    let sim = Simulation::new(tuned.into_graph(), params([0.0, 0.0, 1.0], 0.0), 200).unwrap();
    let record = sim.run(&mut seeded(6));

    assert_eq!(ConvergenceMonitor::window_for(200, 0.1), 20);
    assert_eq!(record.converged_at, Some(20));
    assert_eq!(record.assortativity.len(), 201);
    assert_eq!(record.trace.horizon(), 200);
    for node in 0..nodes {
        let row = record.trace.row(node);
        assert!(row[20..].iter().all(|x| x.to_bits() == row[20].to_bits()));
    }

    let summary = record.group_summary(&GROUPS);
    assert_eq!(summary[0].members, 100);
    assert_eq!(summary[1].members, 100);
    assert!(summary[1].mean.iter().all(|&m| (m - 0.8).abs() < 1e-12));
}

#[test]
fn test_disabled_window_runs_full_horizon() {
    let graph = graph_from(&[0.2, 0.8], &[]).unwrap();
    let record = Simulation::new(graph, params([1.0, 0.0, 0.0], 0.0), 15)
        .unwrap()
        .with_convergence(0.1, 1e-5)
        .unwrap()
        .run(&mut seeded(0));
    assert_eq!(record.converged_at, None);
    assert_eq!(record.assortativity.len(), 16);
}

#[test]
fn test_invalid_point_is_config_error() {
    let err = RelativeStrengths::from_point([0.5, 0.5, 0.5]).unwrap_err();
    assert!(err.is_config());
}

#[test]
fn test_invalid_convergence_settings_are_rejected() {
    let graph = line_graph(2, 0.5).unwrap();
    let sim = Simulation::new(graph, params([1.0, 0.0, 0.0], 0.0), 10).unwrap();
    assert!(sim.with_convergence(1.5, 1e-5).unwrap_err().is_config());
}
