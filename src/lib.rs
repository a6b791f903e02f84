//! # Lonenet
//!
//! Social graphs tuned to a target energy assortativity, and the loneliness
//! dynamics simulated on them.
//!
//! This crate re-exports [`lonenet_core`]. The `lonenet` binary lives in the
//! `lonenet-cli` workspace member.
//!
//! ```rust,ignore
//! use lonenet::{AssortativityTuner, GeneratorKind};
//! use rand::SeedableRng;
//!
//! let tuner = AssortativityTuner::new(
//!     &[0.2, 0.8],
//!     100,
//!     GeneratorKind::PreferentialAttachment { m: 11 },
//!     100,
//! )?;
//! let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(7);
//! let tuned = tuner.tune(0.4, &mut rng)?;
//! ```

#![forbid(unsafe_code)]

pub use lonenet_core::*;
