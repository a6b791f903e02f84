//! Provenance index over the arcs of a composed graph.
//!
//! Every arc is filed under the attribute group its target endpoint was
//! originally generated into. The index is maintained incrementally: an
//! accepted swap moves exactly the two affected entries, so the tuner can
//! draw swap candidates per group without rescanning the graph.

use rustc_hash::FxHashMap;

use super::errors::ModelError;
use super::graph::Link;

/// Key of an attribute group: its position in the configured group list.
pub type GroupKey = usize;

/// Counters describing index maintenance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Links inserted directly
    pub inserted: usize,
    /// Swaps recorded
    pub swaps: usize,
    /// Links moved to another group by retargeting
    pub retargets: usize,
}

/// Group key -> ordered arc list, with a reverse position map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentLinks {
    /// Attribute value of each group
    groups: Vec<f64>,
    /// Arcs per group, in insertion order
    lists: Vec<Vec<Link>>,
    /// Reverse index: arc -> (group, position in list)
    position: FxHashMap<Link, (GroupKey, usize)>,
    stats: LinkStats,
}

impl ComponentLinks {
    /// Creates an empty index for the given group values.
    pub fn new(groups: &[f64]) -> Self {
        Self {
            groups: groups.to_vec(),
            lists: vec![Vec::new(); groups.len()],
            position: FxHashMap::default(),
            stats: LinkStats::default(),
        }
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn group_value(&self, key: GroupKey) -> Option<f64> {
        self.groups.get(key).copied()
    }

    pub fn groups(&self) -> &[f64] {
        &self.groups
    }

    /// Arcs filed under `key`, in order.
    pub fn links(&self, key: GroupKey) -> &[Link] {
        self.lists.get(key).map_or(&[], |list| list.as_slice())
    }

    /// Total number of indexed arcs.
    pub fn len(&self) -> usize {
        self.position.len()
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_empty()
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    /// Group an arc is currently filed under.
    pub fn key_of(&self, link: Link) -> Option<GroupKey> {
        self.position.get(&link).map(|&(key, _)| key)
    }

    /// Keys that still have at least one indexed arc.
    pub fn groups_with_edges(&self) -> Vec<GroupKey> {
        self.lists
            .iter()
            .enumerate()
            .filter(|(_, list)| !list.is_empty())
            .map(|(key, _)| key)
            .collect()
    }

    /// Appends an arc under `key`.
    pub fn insert(&mut self, key: GroupKey, link: Link) -> Result<(), ModelError> {
        self.require_key(key)?;
        if self.position.contains_key(&link) {
            return Err(ModelError::InvariantViolation(format!(
                "arc {:?} is already indexed",
                link
            )));
        }
        let list = &mut self.lists[key];
        self.position.insert(link, (key, list.len()));
        list.push(link);
        self.stats.inserted += 1;
        Ok(())
    }

    /// Appends every arc of `links` under `key`.
    pub fn extend<I>(&mut self, key: GroupKey, links: I) -> Result<(), ModelError>
    where
        I: IntoIterator<Item = Link>,
    {
        for link in links {
            self.insert(key, link)?;
        }
        Ok(())
    }

    /// Records an accepted target swap of `(u1 -> v1)` and `(u2 -> v2)`.
    ///
    /// `(u2 -> v1)` takes the slot of the first arc and `(u1 -> v2)` the slot
    /// of the second, so each entry stays with the group of its target.
    pub fn record_swap(&mut self, first: Link, second: Link) -> Result<(), ModelError> {
        let (key_a, pos_a) = self.require_link(first)?;
        let (key_b, pos_b) = self.require_link(second)?;
        let moved_a = (second.0, first.1);
        let moved_b = (first.0, second.1);

        self.position.remove(&first);
        self.position.remove(&second);
        self.lists[key_a][pos_a] = moved_a;
        self.lists[key_b][pos_b] = moved_b;
        self.position.insert(moved_a, (key_a, pos_a));
        self.position.insert(moved_b, (key_b, pos_b));
        self.stats.swaps += 1;
        Ok(())
    }

    /// Replaces `old` by `new`, filing `new` at the end of `key`'s list.
    ///
    /// Used when an arc's target is re-pointed into another group.
    pub fn retarget(&mut self, old: Link, new: Link, key: GroupKey) -> Result<(), ModelError> {
        self.require_key(key)?;
        let (old_key, old_pos) = self.require_link(old)?;
        self.position.remove(&old);
        self.lists[old_key].remove(old_pos);
        for (i, link) in self.lists[old_key].iter().enumerate().skip(old_pos) {
            self.position.insert(*link, (old_key, i));
        }
        self.stats.retargets += 1;
        self.insert(key, new)
    }

    /// Snapshot of the non-empty per-group lists, for swap sampling.
    pub fn candidate_pools(&self) -> Vec<(GroupKey, Vec<Link>)> {
        self.lists
            .iter()
            .enumerate()
            .filter(|(_, list)| !list.is_empty())
            .map(|(key, list)| (key, list.clone()))
            .collect()
    }

    fn require_key(&self, key: GroupKey) -> Result<(), ModelError> {
        if key < self.lists.len() {
            Ok(())
        } else {
            Err(ModelError::InvariantViolation(format!(
                "group key {} out of range ({} groups)",
                key,
                self.lists.len()
            )))
        }
    }

    fn require_link(&self, link: Link) -> Result<(GroupKey, usize), ModelError> {
        self.position.get(&link).copied().ok_or_else(|| {
            ModelError::InvariantViolation(format!("arc {:?} is not indexed", link))
        })
    }
}
