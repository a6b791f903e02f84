//! Fully assortative and fully disassortative compositions of group components.
//!
//! A fully assortative network is the disjoint union of one generated
//! component per attribute group, so every arc joins two nodes of the same
//! group. The fully disassortative network starts from that union and swaps
//! arc targets row by row between groups mirrored around the midpoint of the
//! group values, leaving only cross-group arcs.

use rand::Rng;

use super::component_links::{ComponentLinks, GroupKey};
use super::errors::ModelError;
use super::generators::GraphBuilder;
use super::graph::{Link, NodeId, SocialGraph};
use crate::metrics::{average_degree, pearson};

/// Attempts to find a fresh target when a paired swap is impossible.
const MAX_RETARGET_ATTEMPTS: usize = 32;

/// Relative tolerance when checking that group values mirror each other.
const SYMMETRY_TOLERANCE: f64 = 1e-9;

/// A composed graph with its provenance index and group membership.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedNetwork {
    pub graph: SocialGraph,
    pub links: ComponentLinks,
    /// Node ids generated into each group, aligned with the group list
    pub members: Vec<Vec<NodeId>>,
}

impl ComposedNetwork {
    pub fn groups(&self) -> &[f64] {
        self.links.groups()
    }
}

/// Checks group values and node count shared by every composition.
pub fn validate_groups(groups: &[f64], n_per_group: usize) -> Result<(), ModelError> {
    if groups.is_empty() {
        return Err(ModelError::Config("at least one group value is required".into()));
    }
    if n_per_group == 0 {
        return Err(ModelError::Config("n_per_group must be positive".into()));
    }
    if let Some(bad) = groups.iter().find(|g| !g.is_finite()) {
        return Err(ModelError::Config(format!("group value {} is not finite", bad)));
    }
    for (i, a) in groups.iter().enumerate() {
        if groups[i + 1..].contains(a) {
            return Err(ModelError::Config(format!("group value {} is duplicated", a)));
        }
    }
    Ok(())
}

/// Pairs of group keys mirrored around the midpoint of the group values.
///
/// With an odd number of groups the middle group mirrors itself and is left
/// out. Fails unless the sorted values satisfy `g[i] + g[n-1-i] == g[0] + g[n-1]`.
pub fn mirrored_pairs(groups: &[f64]) -> Result<Vec<(GroupKey, GroupKey)>, ModelError> {
    if groups.len() < 2 {
        return Err(ModelError::Config(
            "a disassortative network needs at least two groups".into(),
        ));
    }
    let mut order: Vec<GroupKey> = (0..groups.len()).collect();
    order.sort_by(|&a, &b| groups[a].total_cmp(&groups[b]));

    let n = order.len();
    let span = groups[order[0]] + groups[order[n - 1]];
    let scale = span.abs().max(1.0);
    let mut pairs = Vec::with_capacity(n / 2);
    for i in 0..n / 2 {
        let (lo, hi) = (order[i], order[n - 1 - i]);
        if ((groups[lo] + groups[hi]) - span).abs() > SYMMETRY_TOLERANCE * scale {
            return Err(ModelError::Config(format!(
                "group values {:?} are not symmetric around their midpoint",
                groups
            )));
        }
        pairs.push((lo, hi));
    }
    if n % 2 == 1 && (2.0 * groups[order[n / 2]] - span).abs() > SYMMETRY_TOLERANCE * scale {
        return Err(ModelError::Config(format!(
            "middle group value {} is not the midpoint of {:?}",
            groups[order[n / 2]],
            groups
        )));
    }
    Ok(pairs)
}

/// Union of one generated component per group, with no cross-group arcs.
///
/// Group `i` receives node ids `i * n_per_group ..`. The measured
/// assortativity must be exactly 1.
pub fn fully_assortative<R: Rng + ?Sized>(
    groups: &[f64],
    n_per_group: usize,
    builder: &GraphBuilder,
    rng: &mut R,
) -> Result<ComposedNetwork, ModelError> {
    validate_groups(groups, n_per_group)?;
    let stride = u32::try_from(n_per_group)
        .map_err(|_| ModelError::Config(format!("n_per_group {} is too large", n_per_group)))?;

    let mut graph = SocialGraph::with_capacity(n_per_group * groups.len());
    let mut links = ComponentLinks::new(groups);
    let mut members = Vec::with_capacity(groups.len());

    for (key, &value) in groups.iter().enumerate() {
        let prefix = u32::try_from(key)
            .ok()
            .and_then(|k| k.checked_mul(stride))
            .ok_or_else(|| ModelError::Config("too many nodes for the id space".into()))?;
        let (component, created) = builder.build(n_per_group, value, prefix, rng)?;
        members.push(component.ids().to_vec());
        graph.compose(&component)?;
        links.extend(key, created)?;
    }

    let measured = pearson(&graph)?;
    if measured != 1.0 {
        return Err(ModelError::InvariantViolation(format!(
            "fully assortative network measured {} instead of 1",
            measured
        )));
    }
    Ok(ComposedNetwork {
        graph,
        links,
        members,
    })
}

/// Fully assortative union rewired so every arc joins mirrored groups.
///
/// Row `r` of a group's link list is swapped with row `r` of its mirror. Arcs
/// without a partner row (or whose swap would duplicate an arc) are re-pointed
/// to a random node of the mirrored group. Measured assortativity must be
/// exactly -1 and the average degree must not change.
pub fn fully_disassortative<R: Rng + ?Sized>(
    groups: &[f64],
    n_per_group: usize,
    builder: &GraphBuilder,
    rng: &mut R,
) -> Result<ComposedNetwork, ModelError> {
    let pairs = mirrored_pairs(groups)?;
    let mut network = fully_assortative(groups, n_per_group, builder, rng)?;
    let initial_degree = average_degree(&network.graph);

    for (a, b) in pairs {
        let rows_a = network.links.links(a).to_vec();
        let rows_b = network.links.links(b).to_vec();
        let paired = rows_a.len().min(rows_b.len());

        for r in 0..paired {
            let (first, second) = (rows_a[r], rows_b[r]);
            if network.graph.swap_targets(first, second)? {
                network.links.record_swap(first, second)?;
            } else {
                retarget_into(&mut network, first, b, rng)?;
                retarget_into(&mut network, second, a, rng)?;
            }
        }
        for &link in &rows_a[paired..] {
            retarget_into(&mut network, link, b, rng)?;
        }
        for &link in &rows_b[paired..] {
            retarget_into(&mut network, link, a, rng)?;
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(
        swaps = network.links.stats().swaps,
        retargets = network.links.stats().retargets,
        "composed fully disassortative network"
    );

    let measured = pearson(&network.graph)?;
    if measured != -1.0 {
        return Err(ModelError::InvariantViolation(format!(
            "fully disassortative network measured {} instead of -1",
            measured
        )));
    }
    let degree = average_degree(&network.graph);
    if degree != initial_degree {
        return Err(ModelError::InvariantViolation(format!(
            "average degree changed from {} to {} during disassortative rewiring",
            initial_degree, degree
        )));
    }
    Ok(network)
}

/// Moves the target of `link` to a random member of `group`.
fn retarget_into<R: Rng + ?Sized>(
    network: &mut ComposedNetwork,
    link: Link,
    group: GroupKey,
    rng: &mut R,
) -> Result<(), ModelError> {
    let (src, old_dst) = link;
    let candidates = &network.members[group];
    if !candidates.is_empty() {
        for _ in 0..MAX_RETARGET_ATTEMPTS {
            let dst = candidates[rng.gen_range(0..candidates.len())];
            if dst == src || network.graph.has_edge(src, dst) {
                continue;
            }
            network.graph.remove_edge(src, old_dst);
            network.graph.add_edge(src, dst)?;
            network.links.retarget(link, (src, dst), group)?;
            return Ok(());
        }
    }
    Err(ModelError::InvariantViolation(format!(
        "no free target in group {} for arc {:?} after {} attempts",
        group, link, MAX_RETARGET_ATTEMPTS
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::generators::GeneratorKind;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn builder() -> GraphBuilder {
        GraphBuilder::new(GeneratorKind::PreferentialAttachment { m: 3 })
    }

    #[test]
    fn fully_assortative_has_no_cross_group_arcs() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let net = fully_assortative(&[0.2, 0.8], 30, &builder(), &mut rng).unwrap();

        assert_eq!(net.graph.node_count(), 60);
        assert_eq!(pearson(&net.graph).unwrap(), 1.0);
        assert_eq!(net.links.len(), net.graph.edge_count());
        for (src, dst) in net.graph.edges() {
            assert_eq!(src.0 / 30, dst.0 / 30);
        }
    }

    #[test]
    fn fully_disassortative_preserves_average_degree() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let assort = fully_assortative(&[0.2, 0.8], 30, &builder(), &mut rng).unwrap();

        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let disassort = fully_disassortative(&[0.2, 0.8], 30, &builder(), &mut rng).unwrap();

        assert_eq!(pearson(&disassort.graph).unwrap(), -1.0);
        assert_eq!(
            average_degree(&disassort.graph),
            average_degree(&assort.graph)
        );
        for (src, dst) in disassort.graph.edges() {
            assert_ne!(src.0 / 30, dst.0 / 30);
        }
    }

    #[test]
    fn provenance_follows_target_group() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let net = fully_disassortative(&[0.2, 0.8], 20, &builder(), &mut rng).unwrap();
        for key in 0..2 {
            for &(_, dst) in net.links.links(key) {
                assert_eq!((dst.0 / 20) as usize, key);
            }
        }
    }

    #[test]
    fn uneven_pools_fall_back_to_random_targets() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let uniform = GraphBuilder::new(GeneratorKind::UniformRandom { p: 0.3 });
        let net = fully_disassortative(&[0.1, 0.9], 15, &uniform, &mut rng).unwrap();
        assert_eq!(pearson(&net.graph).unwrap(), -1.0);
    }

    #[test]
    fn middle_group_mirrors_itself() {
        let pairs = mirrored_pairs(&[0.8, 0.5, 0.2]).unwrap();
        assert_eq!(pairs, vec![(2, 0)]);

        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let net = fully_disassortative(&[0.2, 0.5, 0.8], 20, &builder(), &mut rng).unwrap();
        assert_eq!(pearson(&net.graph).unwrap(), -1.0);
    }

    #[test]
    fn asymmetric_groups_are_rejected() {
        assert!(mirrored_pairs(&[0.1, 0.2, 0.9]).unwrap_err().is_config());
        assert!(mirrored_pairs(&[0.5]).unwrap_err().is_config());
    }

    #[test]
    fn invalid_groups_are_rejected() {
        assert!(validate_groups(&[], 10).unwrap_err().is_config());
        assert!(validate_groups(&[0.2, 0.2], 10).unwrap_err().is_config());
        assert!(validate_groups(&[0.2, f64::NAN], 10).unwrap_err().is_config());
        assert!(validate_groups(&[0.2], 0).unwrap_err().is_config());
    }
}
