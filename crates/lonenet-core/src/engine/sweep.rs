//! Data-parallel fan-out over assortativity targets.
//!
//! Every target is an independent unit of work with its own RNG and its own
//! graphs; units share nothing mutable and each returns its own `Result`, so a
//! unit that exhausts its retry budget does not disturb its siblings.
//!
//! ## Feature gating
//!
//! Units run on the rayon pool behind the `parallel` feature flag. When
//! disabled, the same API runs them sequentially.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::errors::ModelError;
use super::tuner::{AssortativityTuner, TunedNetwork};

/// Outcome of one sweep unit.
#[derive(Debug)]
pub struct SweepUnit<T> {
    /// Position of the target in the requested list
    pub index: usize,
    pub target: f64,
    /// Seed the unit's RNG was created from
    pub seed: u64,
    pub outcome: Result<T, ModelError>,
}

/// Seed of unit `index`, derived from `base` with a splitmix64 step.
pub fn unit_seed(base: u64, index: usize) -> u64 {
    let mut z = base.wrapping_add((index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Configured seed, or a fresh one from entropy.
pub fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(rand::random)
}

/// Runs `job` once per target, each with its own seeded RNG.
///
/// Results are returned in target order regardless of scheduling.
pub fn run_units<T, F>(targets: &[f64], base_seed: u64, job: F) -> Vec<SweepUnit<T>>
where
    T: Send,
    F: Fn(f64, &mut ChaCha8Rng) -> Result<T, ModelError> + Sync + Send,
{
    let run_one = |(index, &target): (usize, &f64)| {
        let seed = unit_seed(base_seed, index);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let outcome = job(target, &mut rng);

        #[cfg(feature = "tracing")]
        {
            match &outcome {
                Ok(_) => tracing::info!(aim = target, seed, "sweep unit finished"),
                Err(err) => tracing::info!(aim = target, seed, error = %err, "sweep unit failed"),
            }
        }

        SweepUnit {
            index,
            target,
            seed,
            outcome,
        }
    };

    #[cfg(feature = "parallel")]
    {
        targets.par_iter().enumerate().map(run_one).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        targets.iter().enumerate().map(run_one).collect()
    }
}

/// Tunes `networks` graphs for every target.
pub fn tune_targets(
    tuner: &AssortativityTuner,
    targets: &[f64],
    networks: usize,
    base_seed: u64,
) -> Vec<SweepUnit<Vec<TunedNetwork>>> {
    run_units(targets, base_seed, |target, rng| {
        (0..networks).map(|_| tuner.tune(target, rng)).collect()
    })
}
