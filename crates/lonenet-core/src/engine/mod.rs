//! The graph construction, tuning and simulation engine.
//!
//! This module provides:
//! - **errors**: Error types shared by every stage
//! - **graph**: Directed social graph with dense node storage
//! - **generators**: Base graph generators for one attribute group
//! - **component_links**: Provenance index of arcs per attribute group
//! - **composition**: Fully assortative and disassortative compositions
//! - **tuner**: Degree-preserving search for a target assortativity
//! - **dynamics**: Synchronous co-evolution of connectivity and energy
//! - **sweep**: Independent units of work per target value

pub mod component_links;
pub mod composition;
pub mod dynamics;
pub mod errors;
pub mod generators;
pub mod graph;
pub mod sweep;
pub mod tuner;
