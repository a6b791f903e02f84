//! Base graph generators for a single attribute group.
//!
//! Each generator produces an undirected skeleton (or, for the uniform model,
//! directed arcs directly) and turns it into a [`SocialGraph`] whose nodes all
//! share one `(k, e)` value. Preferential generators regenerate until the
//! skeleton is connected and then alternate edge orientation, so early hubs do
//! not collect all of the out-degree.

use rand::Rng;

use crate::engine::errors::ModelError;
use crate::engine::graph::{Link, NodeId, NodeState, SocialGraph};

/// Regeneration ceiling for the connectivity loop.
///
/// Preferential generators are connected by construction for valid
/// parameters; the ceiling turns a pathological loop into an error.
const MAX_CONNECTIVITY_ATTEMPTS: usize = 10_000;

/// Supported generative models, selected by variant rather than by name.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum GeneratorKind {
    /// Directed G(n, p): every ordered pair is an arc with probability `p`.
    UniformRandom { p: f64 },
    /// Barabási-Albert growth attaching `m` edges per new node.
    PreferentialAttachment { m: usize },
    /// Holme-Kim growth: preferential attachment plus triad formation with probability `p`.
    PowerLawCluster { m: usize, p: f64 },
}

impl GeneratorKind {
    pub fn name(&self) -> &'static str {
        match self {
            GeneratorKind::UniformRandom { .. } => "uniform_random",
            GeneratorKind::PreferentialAttachment { .. } => "preferential_attachment",
            GeneratorKind::PowerLawCluster { .. } => "power_law_cluster",
        }
    }

    /// Short parameter tag used when naming output directories.
    pub fn parameter_label(&self) -> String {
        match self {
            GeneratorKind::UniformRandom { p } => format!("p{}", p),
            GeneratorKind::PreferentialAttachment { m } => format!("m{}", m),
            GeneratorKind::PowerLawCluster { m, p } => format!("m{}-p{}", m, p),
        }
    }

    /// Preferential models can in principle yield disconnected skeletons and
    /// bias out-degree towards early nodes.
    fn is_preferential(&self) -> bool {
        !matches!(self, GeneratorKind::UniformRandom { .. })
    }

    /// Checks the parameters against a component size of `n` nodes.
    pub fn validate(&self, n: usize) -> Result<(), ModelError> {
        if n == 0 {
            return Err(ModelError::Config("component size must be positive".into()));
        }
        let check_p = |p: f64| {
            if (0.0..=1.0).contains(&p) {
                Ok(())
            } else {
                Err(ModelError::Config(format!(
                    "probability p={} must lie in [0, 1]",
                    p
                )))
            }
        };
        let check_m = |m: usize| {
            if m == 0 || m >= n {
                Err(ModelError::Config(format!(
                    "attachment count m={} must satisfy 1 <= m < n={}",
                    m, n
                )))
            } else {
                Ok(())
            }
        };
        match *self {
            GeneratorKind::UniformRandom { p } => check_p(p),
            GeneratorKind::PreferentialAttachment { m } => check_m(m),
            GeneratorKind::PowerLawCluster { m, p } => {
                check_m(m)?;
                check_p(p)
            }
        }
    }
}

/// Builds base components for one attribute group.
#[derive(Debug, Clone, Copy)]
pub struct GraphBuilder {
    kind: GeneratorKind,
}

impl GraphBuilder {
    pub fn new(kind: GeneratorKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> GeneratorKind {
        self.kind
    }

    /// Generates an `n`-node component whose nodes all start at `value`.
    ///
    /// Node ids are `id_prefix .. id_prefix + n`, so components built with
    /// disjoint prefixes can be composed without collisions. Returns the graph
    /// together with the arcs created by this call, in insertion order.
    pub fn build<R: Rng + ?Sized>(
        &self,
        n: usize,
        value: f64,
        id_prefix: u32,
        rng: &mut R,
    ) -> Result<(SocialGraph, Vec<Link>), ModelError> {
        self.kind.validate(n)?;
        let n_u32 = u32::try_from(n)
            .ok()
            .filter(|count| id_prefix.checked_add(*count).is_some())
            .ok_or_else(|| {
                ModelError::Generation(format!(
                    "node ids {}..{}+{} overflow the id space",
                    id_prefix, id_prefix, n
                ))
            })?;

        for attempt in 0..MAX_CONNECTIVITY_ATTEMPTS {
            let arcs = match self.kind {
                GeneratorKind::UniformRandom { p } => uniform_random_arcs(n_u32, p, rng),
                GeneratorKind::PreferentialAttachment { m } => {
                    diffuse(preferential_attachment_pairs(n_u32, m, rng))
                }
                GeneratorKind::PowerLawCluster { m, p } => {
                    diffuse(power_law_cluster_pairs(n_u32, m, p, rng))
                }
            };

            let mut graph = SocialGraph::with_capacity(n);
            for i in 0..n_u32 {
                graph.add_node(NodeId(id_prefix + i), NodeState::uniform(value))?;
            }
            let mut links = Vec::with_capacity(arcs.len());
            for (a, b) in arcs {
                let link = (NodeId(id_prefix + a), NodeId(id_prefix + b));
                if graph.add_edge(link.0, link.1)? {
                    links.push(link);
                }
            }

            if self.kind.is_preferential() && !graph.is_weakly_connected() {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    generator = self.kind.name(),
                    attempt,
                    "skeleton disconnected, regenerating"
                );
                let _ = attempt;
                continue;
            }
            return Ok((graph, links));
        }

        Err(ModelError::Generation(format!(
            "{} generator produced no connected graph in {} attempts",
            self.kind.name(),
            MAX_CONNECTIVITY_ATTEMPTS
        )))
    }
}

/// Flips every odd-indexed edge so in/out degree is not tied to creation order.
fn diffuse(pairs: Vec<(u32, u32)>) -> Vec<(u32, u32)> {
    pairs
        .into_iter()
        .enumerate()
        .map(|(i, (a, b))| if i % 2 == 0 { (a, b) } else { (b, a) })
        .collect()
}

fn uniform_random_arcs<R: Rng + ?Sized>(n: u32, p: f64, rng: &mut R) -> Vec<(u32, u32)> {
    let mut arcs = Vec::new();
    for src in 0..n {
        for dst in 0..n {
            if src != dst && rng.gen::<f64>() < p {
                arcs.push((src, dst));
            }
        }
    }
    arcs
}

/// Draws `m` distinct values from `seq` (weighted by multiplicity).
///
/// `seq` must contain at least `m` distinct values.
fn random_subset<R: Rng + ?Sized>(seq: &[u32], m: usize, rng: &mut R) -> Vec<u32> {
    let mut picked = Vec::with_capacity(m);
    while picked.len() < m {
        let candidate = seq[rng.gen_range(0..seq.len())];
        if !picked.contains(&candidate) {
            picked.push(candidate);
        }
    }
    picked
}

/// Barabási-Albert undirected edges, grown from a star on `m + 1` nodes.
fn preferential_attachment_pairs<R: Rng + ?Sized>(
    n: u32,
    m: usize,
    rng: &mut R,
) -> Vec<(u32, u32)> {
    let m_u32 = m as u32;
    let mut pairs = Vec::with_capacity(m * n as usize);
    let mut repeated: Vec<u32> = Vec::with_capacity(2 * m * n as usize);

    for leaf in 1..=m_u32 {
        pairs.push((0, leaf));
        repeated.push(0);
        repeated.push(leaf);
    }

    for source in (m_u32 + 1)..n {
        let targets = random_subset(&repeated, m, rng);
        for &target in &targets {
            pairs.push((source, target));
        }
        repeated.extend_from_slice(&targets);
        repeated.extend(std::iter::repeat(source).take(m));
    }
    pairs
}

/// Holme-Kim undirected edges: each new node attaches preferentially, and
/// after each attachment closes a triangle through the last target with
/// probability `p`.
fn power_law_cluster_pairs<R: Rng + ?Sized>(
    n: u32,
    m: usize,
    p: f64,
    rng: &mut R,
) -> Vec<(u32, u32)> {
    let mut neighbors: Vec<Vec<u32>> = vec![Vec::new(); n as usize];
    let mut pairs = Vec::with_capacity(m * n as usize);
    let mut repeated: Vec<u32> = (0..m as u32).collect();

    let mut connect = |a: u32, b: u32, neighbors: &mut Vec<Vec<u32>>| {
        if !neighbors[a as usize].contains(&b) {
            neighbors[a as usize].push(b);
            neighbors[b as usize].push(a);
            pairs.push((a, b));
        }
    };

    for source in (m as u32)..n {
        let mut possible = random_subset(&repeated, m, rng);
        let Some(mut target) = possible.pop() else {
            break;
        };
        connect(source, target, &mut neighbors);
        repeated.push(target);

        let mut count = 1;
        while count < m {
            if rng.gen::<f64>() < p {
                let triad: Vec<u32> = neighbors[target as usize]
                    .iter()
                    .copied()
                    .filter(|&nbr| nbr != source && !neighbors[source as usize].contains(&nbr))
                    .collect();
                if !triad.is_empty() {
                    let nbr = triad[rng.gen_range(0..triad.len())];
                    connect(source, nbr, &mut neighbors);
                    repeated.push(nbr);
                    count += 1;
                    continue;
                }
            }
            let Some(next) = possible.pop() else {
                break;
            };
            target = next;
            connect(source, target, &mut neighbors);
            repeated.push(target);
            count += 1;
        }
        repeated.extend(std::iter::repeat(source).take(m));
    }
    pairs
}
