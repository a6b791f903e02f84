//! Experiment configuration.
//!
//! A configuration names the attribute groups and generator of the networks,
//! the assortativity targets to sweep, and the parameters of the dynamics.
//! Omitted fields take the defaults below. `validate` checks everything up
//! front so a bad file fails before any graph is generated.
//!
//! ```json
//! {
//!   "network": {
//!     "groups": [0.2, 0.8],
//!     "n_per_group": 100,
//!     "generator": { "kind": "preferential_attachment", "m": 11 }
//!   },
//!   "simulation": { "horizon": 1000, "points": [[1.0, 0.0, 0.0]] },
//!   "seed": 7
//! }
//! ```

#[cfg(feature = "serde")]
use std::path::Path;

use crate::engine::composition::{mirrored_pairs, validate_groups};
use crate::engine::dynamics::{
    DynamicsParams, RelativeStrengths, DEFAULT_VARIANCE_THRESHOLD, DEFAULT_WINDOW_FRACTION,
};
use crate::engine::errors::ModelError;
use crate::engine::generators::GeneratorKind;
use crate::engine::tuner::{AssortativityTuner, DEFAULT_MAX_RETRIES};

fn default_targets() -> Vec<f64> {
    vec![-0.8, -0.6, -0.4, -0.2, 0.0, 0.2, 0.4, 0.6, 0.8]
}

fn default_max_retries() -> usize {
    DEFAULT_MAX_RETRIES
}

fn default_horizon() -> usize {
    1000
}

fn default_h() -> f64 {
    0.05
}

fn default_beta() -> f64 {
    0.5
}

fn default_noise_std() -> f64 {
    0.02
}

fn default_window_fraction() -> f64 {
    DEFAULT_WINDOW_FRACTION
}

fn default_variance_threshold() -> f64 {
    DEFAULT_VARIANCE_THRESHOLD
}

/// Network generation and tuning settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkConfig {
    /// Attribute value of each group
    pub groups: Vec<f64>,
    pub n_per_group: usize,
    pub generator: GeneratorKind,
    #[cfg_attr(feature = "serde", serde(default = "default_targets"))]
    pub targets: Vec<f64>,
    #[cfg_attr(feature = "serde", serde(default = "default_max_retries"))]
    pub max_retries: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            groups: vec![0.2, 0.8],
            n_per_group: 100,
            generator: GeneratorKind::PreferentialAttachment { m: 11 },
            targets: default_targets(),
            max_retries: default_max_retries(),
        }
    }
}

/// Dynamics and convergence settings.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SimulationConfig {
    pub horizon: usize,
    pub h: f64,
    pub beta: f64,
    /// Relative strengths `[pc, pb, pec]` to simulate
    pub points: Vec<[f64; 3]>,
    pub noise_std: f64,
    pub window_fraction: f64,
    pub variance_threshold: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            horizon: default_horizon(),
            h: default_h(),
            beta: default_beta(),
            points: vec![[1.0, 0.0, 0.0]],
            noise_std: default_noise_std(),
            window_fraction: default_window_fraction(),
            variance_threshold: default_variance_threshold(),
        }
    }
}

/// Complete experiment description.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExperimentConfig {
    pub network: NetworkConfig,
    #[cfg_attr(feature = "serde", serde(default))]
    pub simulation: SimulationConfig,
    /// Base seed; absent means seeding from entropy
    #[cfg_attr(feature = "serde", serde(default))]
    pub seed: Option<u64>,
}

impl ExperimentConfig {
    /// Reads and validates a JSON configuration file.
    #[cfg(feature = "serde")]
    pub fn from_path(path: &Path) -> Result<Self, ModelError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ModelError::Config(format!("cannot read config {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    #[cfg(feature = "serde")]
    pub fn from_json(text: &str) -> Result<Self, ModelError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| ModelError::Config(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Fails fast on any setting the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ModelError> {
        let net = &self.network;
        validate_groups(&net.groups, net.n_per_group)?;
        net.generator.validate(net.n_per_group)?;

        if let Some(bad) = net.targets.iter().find(|t| !(t.is_finite() && (-1.0..=1.0).contains(*t))) {
            return Err(ModelError::Config(format!(
                "target assortativity {} must lie in [-1, 1]",
                bad
            )));
        }
        if net.targets.iter().any(|&t| t < 0.0) {
            mirrored_pairs(&net.groups)?;
        }

        let sim = &self.simulation;
        if sim.horizon == 0 {
            return Err(ModelError::Config("simulation horizon must be positive".into()));
        }
        if !(0.0..=1.0).contains(&sim.window_fraction) {
            return Err(ModelError::Config(format!(
                "window fraction {} must lie in [0, 1]",
                sim.window_fraction
            )));
        }
        if !(sim.variance_threshold.is_finite() && sim.variance_threshold >= 0.0) {
            return Err(ModelError::Config(format!(
                "variance threshold {} must be non-negative",
                sim.variance_threshold
            )));
        }
        for point in self.points()? {
            DynamicsParams::new(sim.h, sim.beta, point, sim.noise_std)?;
        }
        Ok(())
    }

    /// Validated relative strengths of every configured point.
    pub fn points(&self) -> Result<Vec<RelativeStrengths>, ModelError> {
        self.simulation
            .points
            .iter()
            .map(|&p| RelativeStrengths::from_point(p))
            .collect()
    }

    pub fn tuner(&self) -> Result<AssortativityTuner, ModelError> {
        let net = &self.network;
        AssortativityTuner::new(&net.groups, net.n_per_group, net.generator, net.max_retries)
    }

    pub fn dynamics_params(&self, strengths: RelativeStrengths) -> Result<DynamicsParams, ModelError> {
        let sim = &self.simulation;
        DynamicsParams::new(sim.h, sim.beta, strengths, sim.noise_std)
    }

    /// Directory name describing the network settings,
    /// e.g. `preferential_attachment-[0.2, 0.8]es-100n-m11`.
    pub fn network_label(&self) -> String {
        let net = &self.network;
        format!(
            "{}-{:?}es-{}n-{}",
            net.generator.name(),
            net.groups,
            net.n_per_group,
            net.generator.parameter_label()
        )
    }

    /// Directory name describing the simulation settings, e.g. `noise_0.02-b0.5-sd1000`.
    pub fn simulation_label(&self) -> String {
        let sim = &self.simulation;
        format!("noise_{}-b{}-sd{}", sim.noise_std, sim.beta, sim.horizon)
    }
}
