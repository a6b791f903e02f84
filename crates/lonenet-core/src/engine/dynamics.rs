//! Co-evolution of connectivity and energy on a fixed social graph.
//!
//! Each timestep is a synchronous update: every node's next `(k, e)` is
//! computed from the current state vector into a second buffer, and the two
//! buffers are exchanged once all nodes are done. For node `i`:
//!
//! - `dk = e - k * beta`
//! - with no in-neighbors, `de = 0`
//! - otherwise `de = e (1 - e) * (pc * cognitive + pb * behavioral + pec * contagion + noise)`
//!   where `cognitive = k_i - mean(k_j)`, `behavioral = mean(e_i (e_j - 0.5) / out_degree(j))`,
//!   `contagion = mean(e_j) - e_i` over in-neighbors `j`, and
//!   `noise ~ N(0, noise_std) * sqrt(h)`
//! - `(k, e) += h * (dk, de)`
//!
//! States are not clamped to `[0, 1]` after the Euler step.
//!
//! A [`Simulation`] drives the engine for a fixed horizon, records every
//! node's energy per timestep, and stops early once a [`ConvergenceMonitor`]
//! reports that all energies have settled.

use rand::Rng;
use rand_distr::StandardNormal;

use super::errors::ModelError;
use super::graph::{NodeState, SocialGraph};
use crate::metrics::{nearest_group, pearson, round_decimals};

/// Neutral energy of the behavioral term.
const BEHAVIOR_PIVOT: f64 = 0.5;

/// Default fraction of the horizon used as convergence window.
pub const DEFAULT_WINDOW_FRACTION: f64 = 0.1;

/// Default per-node energy variance under which a run counts as settled.
pub const DEFAULT_VARIANCE_THRESHOLD: f64 = 1e-5;

/// Relative weights of the cognitive, behavioral and contagion terms.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RelativeStrengths {
    pub cognitive: f64,
    pub behavioral: f64,
    pub contagion: f64,
}

impl RelativeStrengths {
    /// Builds a point, rejecting weights that do not sum to 1 at three decimals.
    pub fn new(cognitive: f64, behavioral: f64, contagion: f64) -> Result<Self, ModelError> {
        let point = [cognitive, behavioral, contagion];
        if point.iter().any(|p| !p.is_finite()) {
            return Err(ModelError::Config(format!(
                "relative strengths {:?} must be finite",
                point
            )));
        }
        let sum = cognitive + behavioral + contagion;
        if round_decimals(sum, 3) != 1.0 {
            return Err(ModelError::Config(format!(
                "relative strengths pc+pb+pec = {} != 1 for point {:?}",
                sum, point
            )));
        }
        Ok(Self {
            cognitive,
            behavioral,
            contagion,
        })
    }

    pub fn from_point(point: [f64; 3]) -> Result<Self, ModelError> {
        Self::new(point[0], point[1], point[2])
    }

    pub fn as_point(&self) -> [f64; 3] {
        [self.cognitive, self.behavioral, self.contagion]
    }

    /// Directory-friendly label such as `p1.0-0.0-0.0`.
    pub fn label(&self) -> String {
        let parts: Vec<String> = self
            .as_point()
            .iter()
            .map(|p| format!("{:?}", round_decimals(*p, 2)))
            .collect();
        format!("p{}", parts.join("-"))
    }
}

/// Integration and coupling parameters for the dynamics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicsParams {
    /// Euler step size
    pub h: f64,
    /// Connectivity decay
    pub beta: f64,
    pub strengths: RelativeStrengths,
    /// Standard deviation of the energy noise before `sqrt(h)` scaling
    pub noise_std: f64,
}

impl DynamicsParams {
    pub fn new(
        h: f64,
        beta: f64,
        strengths: RelativeStrengths,
        noise_std: f64,
    ) -> Result<Self, ModelError> {
        if !(h.is_finite() && h > 0.0) {
            return Err(ModelError::Config(format!("step size h={} must be positive", h)));
        }
        if !beta.is_finite() {
            return Err(ModelError::Config(format!("beta={} must be finite", beta)));
        }
        if !(noise_std.is_finite() && noise_std >= 0.0) {
            return Err(ModelError::Config(format!(
                "noise_std={} must be non-negative",
                noise_std
            )));
        }
        Ok(Self {
            h,
            beta,
            strengths,
            noise_std,
        })
    }
}

/// Synchronous, double-buffered stepper over one graph.
#[derive(Debug, Clone)]
pub struct DynamicsEngine {
    graph: SocialGraph,
    params: DynamicsParams,
    next: Vec<NodeState>,
    steps: usize,
}

impl DynamicsEngine {
    /// Takes ownership of `graph`; every node state must be finite.
    pub fn new(graph: SocialGraph, params: DynamicsParams) -> Result<Self, ModelError> {
        if let Some((slot, state)) = graph
            .states()
            .iter()
            .enumerate()
            .find(|(_, s)| !(s.k.is_finite() && s.e.is_finite()))
        {
            return Err(ModelError::Config(format!(
                "node {} has no usable state ({:?})",
                graph.id_at(slot),
                state
            )));
        }
        let next = graph.states().to_vec();
        Ok(Self {
            graph,
            params,
            next,
            steps: 0,
        })
    }

    pub fn graph(&self) -> &SocialGraph {
        &self.graph
    }

    pub fn into_graph(self) -> SocialGraph {
        self.graph
    }

    pub fn params(&self) -> &DynamicsParams {
        &self.params
    }

    /// Number of steps taken so far.
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Advances every node by one timestep.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let DynamicsParams {
            h,
            beta,
            strengths,
            noise_std,
        } = self.params;
        let noise_scale = noise_std * h.sqrt();
        let states = self.graph.states();

        for (slot, next) in self.next.iter_mut().enumerate() {
            let NodeState { k, e } = states[slot];
            let dk = e - k * beta;

            let in_slots = self.graph.in_slots(slot);
            let de = if in_slots.is_empty() {
                0.0
            } else {
                let d = in_slots.len() as f64;
                let (mut k_sum, mut b_sum, mut e_sum) = (0.0, 0.0, 0.0);
                for &j in in_slots {
                    let neighbor = states[j];
                    k_sum += neighbor.k;
                    b_sum += e * (neighbor.e - BEHAVIOR_PIVOT) / self.graph.out_slots(j).len() as f64;
                    e_sum += neighbor.e;
                }
                let noise = if noise_scale > 0.0 {
                    rng.sample::<f64, _>(StandardNormal) * noise_scale
                } else {
                    0.0
                };
                let drive = strengths.cognitive * (k - k_sum / d)
                    + strengths.behavioral * (b_sum / d)
                    + strengths.contagion * (e_sum / d - e)
                    + noise;
                drive * e * (1.0 - e)
            };

            *next = NodeState {
                k: k + h * dk,
                e: e + h * de,
            };
        }

        self.graph.exchange_states(&mut self.next);
        self.steps += 1;
    }

    pub fn run_for<R: Rng + ?Sized>(&mut self, steps: usize, rng: &mut R) {
        for _ in 0..steps {
            self.step(rng);
        }
    }
}

/// Trailing-window variance test over every node's energy.
#[derive(Debug, Clone)]
pub struct ConvergenceMonitor {
    nodes: usize,
    window: usize,
    threshold: f64,
    /// `window` rows of `nodes` energies, written round-robin
    ring: Vec<f64>,
    head: usize,
    observed: usize,
}

impl ConvergenceMonitor {
    /// A window shorter than two timesteps disables detection.
    pub fn new(nodes: usize, window: usize, threshold: f64) -> Self {
        Self {
            nodes,
            window,
            threshold,
            ring: vec![0.0; nodes * window],
            head: 0,
            observed: 0,
        }
    }

    /// Window length for a horizon: `floor(horizon * fraction)`.
    pub fn window_for(horizon: usize, fraction: f64) -> usize {
        (horizon as f64 * fraction).floor() as usize
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn is_enabled(&self) -> bool {
        self.window >= 2
    }

    /// Records one timestep of energies; returns `true` once more than
    /// `window` timesteps were seen and every node's population variance over
    /// the last `window` of them is below the threshold.
    pub fn observe(&mut self, states: &[NodeState]) -> bool {
        if !self.is_enabled() || states.len() != self.nodes {
            return false;
        }
        let row = self.head * self.nodes;
        for (cell, state) in self.ring[row..row + self.nodes].iter_mut().zip(states) {
            *cell = state.e;
        }
        self.head = (self.head + 1) % self.window;
        self.observed += 1;
        if self.observed <= self.window {
            return false;
        }

        let w = self.window as f64;
        (0..self.nodes).all(|node| {
            let column = (0..self.window).map(|r| self.ring[r * self.nodes + node]);
            let mean = column.clone().sum::<f64>() / w;
            let variance = column.map(|x| (x - mean) * (x - mean)).sum::<f64>() / w;
            variance < self.threshold
        })
    }
}

/// Node x timestep energy buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyTrace {
    nodes: usize,
    horizon: usize,
    /// Row-major: `data[node * horizon + t]`
    data: Vec<f64>,
}

impl EnergyTrace {
    pub fn new(nodes: usize, horizon: usize) -> Self {
        Self {
            nodes,
            horizon,
            data: vec![0.0; nodes * horizon],
        }
    }

    pub fn nodes(&self) -> usize {
        self.nodes
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn get(&self, node: usize, t: usize) -> f64 {
        self.data[node * self.horizon + t]
    }

    /// Energies of one node over time.
    pub fn row(&self, node: usize) -> &[f64] {
        &self.data[node * self.horizon..(node + 1) * self.horizon]
    }

    /// Energies of all nodes at timestep `t`.
    pub fn column(&self, t: usize) -> Vec<f64> {
        (0..self.nodes).map(|node| self.get(node, t)).collect()
    }

    fn record(&mut self, t: usize, states: &[NodeState]) {
        for (node, state) in states.iter().enumerate() {
            self.data[node * self.horizon + t] = state.e;
        }
    }

    /// Repeats timestep `t` into every later timestep.
    fn freeze_from(&mut self, t: usize) {
        for node in 0..self.nodes {
            let row = node * self.horizon;
            let value = self.data[row + t];
            self.data[row + t + 1..row + self.horizon].fill(value);
        }
    }
}

/// Per-group mean and population standard deviation over time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupSeries {
    pub group: f64,
    pub members: usize,
    #[cfg_attr(
        feature = "serde",
        serde(deserialize_with = "crate::storage::nullable_series::deserialize")
    )]
    pub mean: Vec<f64>,
    #[cfg_attr(
        feature = "serde",
        serde(deserialize_with = "crate::storage::nullable_series::deserialize")
    )]
    pub std: Vec<f64>,
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct SimulationRecord {
    pub trace: EnergyTrace,
    /// Initial value plus one entry per timestep; `NaN` where undefined
    pub assortativity: Vec<f64>,
    /// Timestep at which the run froze, if it converged
    pub converged_at: Option<usize>,
    /// Energies before the first step
    pub initial_energy: Vec<f64>,
    /// Graph after the last computed step
    pub graph: SocialGraph,
}

impl SimulationRecord {
    /// Splits nodes by the group value nearest their initial energy and
    /// summarises each group per timestep. Empty groups yield `NaN` series.
    pub fn group_summary(&self, groups: &[f64]) -> Vec<GroupSeries> {
        let assignment: Vec<Option<usize>> = self
            .initial_energy
            .iter()
            .map(|&e| nearest_group(e, groups))
            .collect();

        groups
            .iter()
            .enumerate()
            .map(|(g, &group)| {
                let members: Vec<usize> = (0..assignment.len())
                    .filter(|&node| assignment[node] == Some(g))
                    .collect();
                let count = members.len() as f64;
                let (mut mean, mut std) = (
                    Vec::with_capacity(self.trace.horizon()),
                    Vec::with_capacity(self.trace.horizon()),
                );
                for t in 0..self.trace.horizon() {
                    let m = members.iter().map(|&n| self.trace.get(n, t)).sum::<f64>() / count;
                    let var = members
                        .iter()
                        .map(|&n| {
                            let d = self.trace.get(n, t) - m;
                            d * d
                        })
                        .sum::<f64>()
                        / count;
                    mean.push(m);
                    std.push(var.sqrt());
                }
                GroupSeries {
                    group,
                    members: members.len(),
                    mean,
                    std,
                }
            })
            .collect()
    }
}

/// Fixed-horizon run with early freezing on convergence.
#[derive(Debug, Clone)]
pub struct Simulation {
    engine: DynamicsEngine,
    horizon: usize,
    window_fraction: f64,
    variance_threshold: f64,
}

impl Simulation {
    pub fn new(graph: SocialGraph, params: DynamicsParams, horizon: usize) -> Result<Self, ModelError> {
        if horizon == 0 {
            return Err(ModelError::Config("simulation horizon must be positive".into()));
        }
        Ok(Self {
            engine: DynamicsEngine::new(graph, params)?,
            horizon,
            window_fraction: DEFAULT_WINDOW_FRACTION,
            variance_threshold: DEFAULT_VARIANCE_THRESHOLD,
        })
    }

    /// Overrides the convergence window fraction and variance threshold.
    pub fn with_convergence(mut self, window_fraction: f64, variance_threshold: f64) -> Result<Self, ModelError> {
        if !(0.0..=1.0).contains(&window_fraction) {
            return Err(ModelError::Config(format!(
                "window fraction {} must lie in [0, 1]",
                window_fraction
            )));
        }
        if !(variance_threshold.is_finite() && variance_threshold >= 0.0) {
            return Err(ModelError::Config(format!(
                "variance threshold {} must be non-negative",
                variance_threshold
            )));
        }
        self.window_fraction = window_fraction;
        self.variance_threshold = variance_threshold;
        Ok(self)
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Runs up to `horizon` steps.
    ///
    /// After convergence at step `t` the trace repeats step `t` and the
    /// assortativity series repeats its value at `t`, so both keep their full
    /// length.
    pub fn run<R: Rng + ?Sized>(mut self, rng: &mut R) -> SimulationRecord {
        let nodes = self.engine.graph().node_count();
        let mut trace = EnergyTrace::new(nodes, self.horizon);
        let window = ConvergenceMonitor::window_for(self.horizon, self.window_fraction);
        let mut monitor = ConvergenceMonitor::new(nodes, window, self.variance_threshold);
        let initial_energy: Vec<f64> = self.engine.graph().states().iter().map(|s| s.e).collect();

        let mut assortativity = Vec::with_capacity(self.horizon + 1);
        assortativity.push(pearson(self.engine.graph()).unwrap_or(f64::NAN));
        let mut converged_at = None;

        for t in 0..self.horizon {
            self.engine.step(rng);
            let states = self.engine.graph().states();
            trace.record(t, states);
            assortativity.push(pearson(self.engine.graph()).unwrap_or(f64::NAN));

            if monitor.observe(states) {
                trace.freeze_from(t);
                let last = assortativity[assortativity.len() - 1];
                assortativity.resize(self.horizon + 1, last);
                converged_at = Some(t);
                #[cfg(feature = "tracing")]
                tracing::debug!(step = t, window, "energies settled, freezing trace");
                break;
            }
        }

        SimulationRecord {
            trace,
            assortativity,
            converged_at,
            initial_energy,
            graph: self.engine.into_graph(),
        }
    }
}
