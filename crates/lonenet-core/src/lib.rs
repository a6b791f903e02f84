//! # Lonenet Core
//!
//! Core engine for social graphs tuned to a target energy assortativity and
//! for the loneliness dynamics simulated on them.

pub mod config;
pub mod engine;
pub mod metrics;
pub mod storage;

// Re-export commonly used types
pub use config::ExperimentConfig;
pub use engine::composition::{fully_assortative, fully_disassortative, ComposedNetwork};
pub use engine::dynamics::{
    DynamicsEngine, DynamicsParams, RelativeStrengths, Simulation, SimulationRecord,
};
pub use engine::errors::ModelError;
pub use engine::generators::{GeneratorKind, GraphBuilder};
pub use engine::graph::{NodeId, NodeState, SocialGraph};
pub use engine::tuner::{AssortativityTuner, TunedNetwork};
