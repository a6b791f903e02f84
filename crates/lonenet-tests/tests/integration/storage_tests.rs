//! Integration tests for graph and result persistence.

use lonenet_core::engine::dynamics::Simulation;
use lonenet_core::metrics::pearson;
use lonenet_core::storage::{
    list_graph_files, next_graph_path, GraphStore, JsonGraphStore, ResultsStore, SimulationSummary,
};
use lonenet_core::{DynamicsParams, RelativeStrengths};
use lonenet_tests::{seeded, two_group_tuner, GROUPS};

#[test]
fn test_tuned_graph_survives_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let tuned = two_group_tuner(100).unwrap().tune(0.4, &mut seeded(21)).unwrap();

    let path = next_graph_path(&dir.path().join("0.4")).unwrap();
    JsonGraphStore.save(tuned.graph(), &path).unwrap();
    let loaded = JsonGraphStore.load(&path).unwrap();

    assert_eq!(loaded.ids(), tuned.graph().ids());
    assert_eq!(loaded.states(), tuned.graph().states());
    assert_eq!(
        loaded.edges().collect::<Vec<_>>(),
        tuned.graph().edges().collect::<Vec<_>>()
    );
    assert_eq!(loaded.degree_sequence(), tuned.graph().degree_sequence());
    assert_eq!(pearson(&loaded).unwrap(), tuned.assortativity);
}

#[test]
fn test_numbered_files_accumulate() {
    let dir = tempfile::tempdir().unwrap();
    let tuner = two_group_tuner(10).unwrap();
    let mut rng = seeded(2);
    for _ in 0..3 {
        let tuned = tuner.tune(1.0, &mut rng).unwrap();
        let path = next_graph_path(dir.path()).unwrap();
        JsonGraphStore.save(tuned.graph(), &path).unwrap();
    }
    let files = list_graph_files(dir.path()).unwrap();
    let names: Vec<String> = files
        .iter()
        .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["0.json", "1.json", "2.json"]);
}

#[test]
fn test_simulation_summary_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let tuned = two_group_tuner(10).unwrap().tune(-1.0, &mut seeded(4)).unwrap();
    let strengths = RelativeStrengths::new(0.2, 0.3, 0.5).unwrap();
    let params = DynamicsParams::new(0.05, 0.5, strengths, 0.02).unwrap();
    let record = Simulation::new(tuned.into_graph(), params, 30)
        .unwrap()
        .run(&mut seeded(4));

    let summary = SimulationSummary::from_record(&record, &GROUPS);
    let store = ResultsStore::new(dir.path().join("dyn_data"));
    let name = format!("-1.0/{}/0.json", strengths.label());
    store.save(&name, &summary).unwrap();

    let loaded = store.load(&name).unwrap();
    assert_eq!(loaded.groups.len(), 2);
    assert_eq!(loaded.groups[0].mean.len(), 30);
    assert_eq!(loaded.assortativity.len(), 31);
    assert_eq!(loaded.converged_at, summary.converged_at);
    assert_eq!(loaded.groups[0].mean, summary.groups[0].mean);
}
