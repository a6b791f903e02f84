//! Assortativity tuning by degree-preserving target swaps.
//!
//! Starting from a fully assortative (target > 0) or fully disassortative
//! (target < 0) composition, the tuner repeatedly draws one indexed arc from
//! each of two groups and swaps their targets. After every accepted swap the
//! energy assortativity is measured; the search stops as soon as its rounded
//! value equals the target. An attempt that runs out of candidates starts over
//! from a freshly generated composition, up to `max_retries` times.
//!
//! The degree sequence never changes: every accepted swap moves one arc head
//! between two sources, and swaps that would duplicate an arc or form a
//! self-loop are rejected by the graph without mutation.

use rand::seq::SliceRandom;
use rand::Rng;

use super::component_links::{ComponentLinks, GroupKey};
use super::composition::{
    fully_assortative, fully_disassortative, mirrored_pairs, validate_groups, ComposedNetwork,
};
use super::errors::ModelError;
use super::generators::{GeneratorKind, GraphBuilder};
use super::graph::{Link, NodeId, NodeState, SocialGraph};
use crate::metrics::{average_degree, pearson, round_decimals};

/// Default number of fresh restarts before a target is abandoned.
pub const DEFAULT_MAX_RETRIES: usize = 100;

/// A graph tuned to a requested assortativity.
#[derive(Debug, Clone, PartialEq)]
pub struct TunedNetwork {
    /// Requested assortativity
    pub target: f64,
    /// Measured assortativity (five decimals)
    pub assortativity: f64,
    /// Restarts needed before the target was hit
    pub retries: usize,
    pub network: ComposedNetwork,
}

impl TunedNetwork {
    pub fn graph(&self) -> &SocialGraph {
        &self.network.graph
    }

    pub fn into_graph(self) -> SocialGraph {
        self.network.graph
    }
}

/// Decimal places a target is matched at: two, or three when the target
/// itself carries a third decimal.
pub fn target_precision(target: f64) -> i32 {
    if round_decimals(target, 2) == target {
        2
    } else {
        3
    }
}

/// True when `measured` rounds to `target` at the target's precision.
pub fn hits_target(measured: f64, target: f64) -> bool {
    round_decimals(measured, target_precision(target)) == target
}

/// Bounded randomized search for graphs at a target assortativity.
#[derive(Debug, Clone)]
pub struct AssortativityTuner {
    groups: Vec<f64>,
    n_per_group: usize,
    builder: GraphBuilder,
    max_retries: usize,
}

impl AssortativityTuner {
    /// Validates groups and generator parameters up front.
    pub fn new(
        groups: &[f64],
        n_per_group: usize,
        generator: GeneratorKind,
        max_retries: usize,
    ) -> Result<Self, ModelError> {
        validate_groups(groups, n_per_group)?;
        generator.validate(n_per_group)?;
        Ok(Self {
            groups: groups.to_vec(),
            n_per_group,
            builder: GraphBuilder::new(generator),
            max_retries,
        })
    }

    pub fn groups(&self) -> &[f64] {
        &self.groups
    }

    pub fn n_per_group(&self) -> usize {
        self.n_per_group
    }

    pub fn generator(&self) -> GeneratorKind {
        self.builder.kind()
    }

    pub fn max_retries(&self) -> usize {
        self.max_retries
    }

    /// Produces a graph whose rounded assortativity equals `target`.
    ///
    /// A target of exactly 0 skips the swap search: one component spanning all
    /// groups is generated and group values are assigned by shuffling. Targets
    /// of exactly +1 and -1 return the corresponding full composition.
    pub fn tune<R: Rng + ?Sized>(&self, target: f64, rng: &mut R) -> Result<TunedNetwork, ModelError> {
        check_target(target)?;
        if target < 0.0 {
            mirrored_pairs(&self.groups)?;
        }
        if target == 0.0 {
            let network = self.shuffled_network(rng)?;
            let assortativity = pearson(&network.graph)?;
            return Ok(TunedNetwork {
                target,
                assortativity,
                retries: 0,
                network,
            });
        }

        let mut retries = 0;
        loop {
            let network = self.base_network(target, rng)?;
            if target == 1.0 || target == -1.0 {
                let assortativity = pearson(&network.graph)?;
                return Ok(TunedNetwork {
                    target,
                    assortativity,
                    retries,
                    network,
                });
            }

            match self.search(network, target, rng)? {
                SearchOutcome::Hit(network, assortativity) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(aim = target, assortativity, retries, "tuning hit target");
                    return Ok(TunedNetwork {
                        target,
                        assortativity,
                        retries,
                        network,
                    });
                }
                SearchOutcome::Exhausted { last } => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(aim = target, last, retries, "swap candidates exhausted, restarting");
                    let _ = last;
                }
            }

            if retries == self.max_retries {
                return Err(ModelError::RetryBudgetExceeded { target, retries });
            }
            retries += 1;
        }
    }

    /// Collects one graph per target from a single swap trajectory.
    ///
    /// Each pass starts from a fully assortative composition and snapshots the
    /// graph the first time its rounded assortativity equals a still-missing
    /// target. Passes repeat with fresh randomness until every target is
    /// collected or `max_retries` restarts are spent. Results are aligned with
    /// `targets`.
    pub fn tune_sweep<R: Rng + ?Sized>(
        &self,
        targets: &[f64],
        rng: &mut R,
    ) -> Result<Vec<TunedNetwork>, ModelError> {
        for &target in targets {
            check_target(target)?;
        }
        let mut found: Vec<Option<TunedNetwork>> = vec![None; targets.len()];
        let mut retries = 0;

        loop {
            let mut network = fully_assortative(&self.groups, self.n_per_group, &self.builder, rng)?;
            let reference = Reference::of(&network.graph);
            let initial = pearson(&network.graph)?;
            collect_hits(targets, &mut found, &network, initial, retries);

            let mut pools = shuffled_pools(&network.links, rng);
            while !found.iter().all(Option::is_some) {
                let Some((first, second)) = draw_pair(&mut pools, rng) else {
                    break;
                };
                if !accept_swap(&mut network, first, second, &reference)? {
                    continue;
                }
                let measured = pearson(&network.graph)?;
                collect_hits(targets, &mut found, &network, measured, retries);
            }

            if found.iter().all(Option::is_some) {
                return Ok(found.into_iter().flatten().collect());
            }
            if retries == self.max_retries {
                let missing = targets
                    .iter()
                    .zip(&found)
                    .find(|(_, slot)| slot.is_none())
                    .map_or(f64::NAN, |(t, _)| *t);
                return Err(ModelError::RetryBudgetExceeded {
                    target: missing,
                    retries,
                });
            }
            #[cfg(feature = "tracing")]
            tracing::debug!(
                missing = found.iter().filter(|slot| slot.is_none()).count(),
                retries,
                "sweep pass ended with targets missing"
            );
            retries += 1;
        }
    }

    fn base_network<R: Rng + ?Sized>(&self, target: f64, rng: &mut R) -> Result<ComposedNetwork, ModelError> {
        if target > 0.0 {
            fully_assortative(&self.groups, self.n_per_group, &self.builder, rng)
        } else {
            fully_disassortative(&self.groups, self.n_per_group, &self.builder, rng)
        }
    }

    /// One swap pass over shuffled candidate pools.
    fn search<R: Rng + ?Sized>(
        &self,
        mut network: ComposedNetwork,
        target: f64,
        rng: &mut R,
    ) -> Result<SearchOutcome, ModelError> {
        let reference = Reference::of(&network.graph);
        let mut pools = shuffled_pools(&network.links, rng);
        let mut last = pearson(&network.graph)?;

        while let Some((first, second)) = draw_pair(&mut pools, rng) {
            if !accept_swap(&mut network, first, second, &reference)? {
                continue;
            }
            last = pearson(&network.graph)?;
            if hits_target(last, target) {
                reference.check_degrees(&network.graph)?;
                return Ok(SearchOutcome::Hit(network, last));
            }
        }
        reference.check_degrees(&network.graph)?;
        Ok(SearchOutcome::Exhausted { last })
    }

    /// Single component over all groups with shuffled group values.
    fn shuffled_network<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<ComposedNetwork, ModelError> {
        let total = self.n_per_group * self.groups.len();
        let (mut graph, created) = self.builder.build(total, self.groups[0], 0, rng)?;

        let mut assignment: Vec<GroupKey> = (0..self.groups.len())
            .flat_map(|key| std::iter::repeat(key).take(self.n_per_group))
            .collect();
        assignment.shuffle(rng);

        let mut members = vec![Vec::with_capacity(self.n_per_group); self.groups.len()];
        for (slot, &key) in assignment.iter().enumerate() {
            members[key].push(graph.id_at(slot));
        }
        for (state, &key) in graph.states_mut().iter_mut().zip(&assignment) {
            *state = NodeState::uniform(self.groups[key]);
        }

        let mut links = ComponentLinks::new(&self.groups);
        for link in created {
            let key = graph
                .slot(link.1)
                .map(|slot| assignment[slot])
                .ok_or_else(|| ModelError::InvariantViolation(format!("arc {:?} has no target", link)))?;
            links.insert(key, link)?;
        }
        Ok(ComposedNetwork {
            graph,
            links,
            members,
        })
    }
}

enum SearchOutcome {
    Hit(ComposedNetwork, f64),
    Exhausted { last: f64 },
}

/// Degree bookkeeping captured at the start of a pass.
struct Reference {
    average_degree: f64,
    degrees: Vec<(NodeId, usize, usize)>,
}

impl Reference {
    fn of(graph: &SocialGraph) -> Self {
        Self {
            average_degree: average_degree(graph),
            degrees: graph.degree_sequence(),
        }
    }

    fn check_average(&self, graph: &SocialGraph) -> Result<(), ModelError> {
        let now = average_degree(graph);
        if now != self.average_degree {
            return Err(ModelError::InvariantViolation(format!(
                "average degree changed from {} to {} while rewiring",
                self.average_degree, now
            )));
        }
        Ok(())
    }

    fn check_degrees(&self, graph: &SocialGraph) -> Result<(), ModelError> {
        self.check_average(graph)?;
        if graph.degree_sequence() != self.degrees {
            return Err(ModelError::InvariantViolation(
                "degree sequence changed while rewiring".into(),
            ));
        }
        Ok(())
    }
}

fn check_target(target: f64) -> Result<(), ModelError> {
    if target.is_finite() && (-1.0..=1.0).contains(&target) {
        Ok(())
    } else {
        Err(ModelError::Config(format!(
            "target assortativity {} must lie in [-1, 1]",
            target
        )))
    }
}

/// Candidate arcs per group in random order; arcs are popped from the back.
fn shuffled_pools<R: Rng + ?Sized>(links: &ComponentLinks, rng: &mut R) -> Vec<Vec<Link>> {
    links
        .candidate_pools()
        .into_iter()
        .map(|(_, mut pool)| {
            pool.shuffle(rng);
            pool
        })
        .collect()
}

/// Pops one arc from each of two distinct non-empty pools.
///
/// Returns `None` once fewer than two pools have arcs left.
fn draw_pair<R: Rng + ?Sized>(pools: &mut [Vec<Link>], rng: &mut R) -> Option<(Link, Link)> {
    let open: Vec<usize> = (0..pools.len()).filter(|&i| !pools[i].is_empty()).collect();
    if open.len() < 2 {
        return None;
    }
    let i = rng.gen_range(0..open.len());
    let mut j = rng.gen_range(0..open.len() - 1);
    if j >= i {
        j += 1;
    }
    let first = pools[open[i]].pop()?;
    let second = pools[open[j]].pop()?;
    Some((first, second))
}

/// Applies the swap to graph and index; `false` when the graph rejected it.
fn accept_swap(
    network: &mut ComposedNetwork,
    first: Link,
    second: Link,
    reference: &Reference,
) -> Result<bool, ModelError> {
    if !network.graph.swap_targets(first, second)? {
        return Ok(false);
    }
    network.links.record_swap(first, second)?;
    reference.check_average(&network.graph)?;
    Ok(true)
}

fn collect_hits(
    targets: &[f64],
    found: &mut [Option<TunedNetwork>],
    network: &ComposedNetwork,
    measured: f64,
    retries: usize,
) {
    for (slot, &target) in found.iter_mut().zip(targets) {
        if slot.is_none() && hits_target(measured, target) {
            #[cfg(feature = "tracing")]
            tracing::debug!(aim = target, measured, "sweep collected target");
            *slot = Some(TunedNetwork {
                target,
                assortativity: measured,
                retries,
                network: network.clone(),
            });
        }
    }
}
