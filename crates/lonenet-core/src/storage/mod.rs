//! Persistence of tuned graphs and simulation results.
//!
//! Graphs are stored as JSON documents listing every node with its `k` and
//! `e` values and every arc (with its optional weight) in slot order, so a
//! loaded graph has the same ids, states and out-adjacency order as the saved
//! one. Result summaries hold the per-group energy series and the
//! assortativity series of one run.
//!
//! Output files inside a directory are numbered `0.json`, `1.json`, ...; the
//! caller partitions directories by target value so concurrent sweep units
//! never write to the same place.

use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::dynamics::{GroupSeries, SimulationRecord};
use crate::engine::errors::ModelError;
use crate::engine::graph::{NodeId, NodeState, SocialGraph};

/// Metadata written with every graph document.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DocumentMetadata {
    /// Crate version that wrote the document
    pub version: String,
    /// Feature flags enabled when the document was written
    pub features: Vec<String>,
}

impl DocumentMetadata {
    fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            features: enabled_features(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeRecord {
    pub id: NodeId,
    pub k: f64,
    pub e: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeRecord {
    pub source: NodeId,
    pub target: NodeId,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub weight: Option<f64>,
}

/// Serializable form of a [`SocialGraph`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GraphDocument {
    pub metadata: DocumentMetadata,
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

impl GraphDocument {
    pub fn from_graph(graph: &SocialGraph) -> Self {
        let nodes = graph
            .ids()
            .iter()
            .zip(graph.states())
            .map(|(&id, s)| NodeRecord { id, k: s.k, e: s.e })
            .collect();
        let edges = graph
            .edges()
            .map(|(source, target)| EdgeRecord {
                source,
                target,
                weight: graph.weight(source, target),
            })
            .collect();
        Self {
            metadata: DocumentMetadata::current(),
            nodes,
            edges,
        }
    }

    /// Rebuilds the graph; duplicate ids, self-loops, duplicate arcs and arcs
    /// to unknown nodes are rejected.
    pub fn into_graph(self) -> Result<SocialGraph, ModelError> {
        let mut graph = SocialGraph::with_capacity(self.nodes.len());
        for node in &self.nodes {
            graph.add_node(node.id, NodeState { k: node.k, e: node.e })?;
        }
        for edge in &self.edges {
            let inserted = match edge.weight {
                Some(w) => graph.add_weighted_edge(edge.source, edge.target, w)?,
                None => graph.add_edge(edge.source, edge.target)?,
            };
            if !inserted {
                return Err(ModelError::Storage(format!(
                    "duplicate arc {} -> {} in graph document",
                    edge.source, edge.target
                )));
            }
        }
        Ok(graph)
    }
}

/// Load/save contract for graph artifacts.
pub trait GraphStore {
    fn load(&self, path: &Path) -> Result<SocialGraph, ModelError>;
    fn save(&self, graph: &SocialGraph, path: &Path) -> Result<(), ModelError>;
}

/// Graph store writing pretty-printed JSON documents.
#[cfg(feature = "serde")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonGraphStore;

#[cfg(feature = "serde")]
impl GraphStore for JsonGraphStore {
    fn load(&self, path: &Path) -> Result<SocialGraph, ModelError> {
        let text = fs::read_to_string(path)
            .map_err(|e| ModelError::Storage(format!("failed to read {}: {}", path.display(), e)))?;
        let document: GraphDocument = serde_json::from_str(&text)?;
        document.into_graph()
    }

    fn save(&self, graph: &SocialGraph, path: &Path) -> Result<(), ModelError> {
        ensure_parent(path)?;
        let json = serde_json::to_string_pretty(&GraphDocument::from_graph(graph))?;
        fs::write(path, json)
            .map_err(|e| ModelError::Storage(format!("failed to write {}: {}", path.display(), e)))
    }
}

/// Next free numbered file in `dir` (`0.json` when none exist).
///
/// Creates `dir` if needed. Numbers are taken from the digits of existing
/// file names, so `3.json` and `3.gml` both count as 3.
pub fn next_graph_path(dir: &Path) -> Result<PathBuf, ModelError> {
    fs::create_dir_all(dir)?;
    let mut next = 0u64;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let digits: String = name.to_string_lossy().chars().filter(char::is_ascii_digit).collect();
        if let Ok(n) = digits.parse::<u64>() {
            next = next.max(n + 1);
        }
    }
    Ok(dir.join(format!("{}.json", next)))
}

/// Numbered graph files in `dir`, sorted by their number.
pub fn list_graph_files(dir: &Path) -> Result<Vec<PathBuf>, ModelError> {
    let mut files: Vec<(u64, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !entry.file_type()?.is_file() || path.extension().map_or(true, |ext| ext != "json") {
            continue;
        }
        let digits: String = entry
            .file_name()
            .to_string_lossy()
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        if let Ok(n) = digits.parse::<u64>() {
            files.push((n, path));
        }
    }
    files.sort();
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

/// Summary of one simulation run as written to disk.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SimulationSummary {
    pub groups: Vec<GroupSeries>,
    #[cfg_attr(feature = "serde", serde(deserialize_with = "nullable_series::deserialize"))]
    pub assortativity: Vec<f64>,
    pub converged_at: Option<usize>,
}

impl SimulationSummary {
    pub fn from_record(record: &SimulationRecord, groups: &[f64]) -> Self {
        Self {
            groups: record.group_summary(groups),
            assortativity: record.assortativity.clone(),
            converged_at: record.converged_at,
        }
    }
}

/// Writes and reads simulation summaries below a root directory.
#[cfg(feature = "serde")]
#[derive(Debug, Clone)]
pub struct ResultsStore {
    root: PathBuf,
}

#[cfg(feature = "serde")]
impl ResultsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the summary for `name` (relative to the root).
    pub fn path_for(&self, name: impl AsRef<Path>) -> PathBuf {
        self.root.join(name)
    }

    pub fn exists(&self, name: impl AsRef<Path>) -> bool {
        self.path_for(name).exists()
    }

    /// Writes `summary` as pretty JSON. Undefined (`NaN`) values become `null`.
    pub fn save(&self, name: impl AsRef<Path>, summary: &SimulationSummary) -> Result<PathBuf, ModelError> {
        let path = self.path_for(name);
        ensure_parent(&path)?;
        let json = serde_json::to_string_pretty(summary)?;
        fs::write(&path, json)?;
        Ok(path)
    }

    pub fn load(&self, name: impl AsRef<Path>) -> Result<SimulationSummary, ModelError> {
        let text = fs::read_to_string(self.path_for(name))?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Reads series written with `NaN` as `null` back into `NaN`.
#[cfg(feature = "serde")]
pub(crate) mod nullable_series {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let values: Vec<Option<f64>> = Vec::deserialize(deserializer)?;
        Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}

fn ensure_parent(path: &Path) -> Result<(), ModelError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => Ok(fs::create_dir_all(parent)?),
        _ => Ok(()),
    }
}

/// Returns a list of enabled feature flags.
fn enabled_features() -> Vec<String> {
    #[allow(unused_mut)]
    let mut features = Vec::new();

    #[cfg(feature = "parallel")]
    {
        features.push("parallel".to_string());
    }

    #[cfg(feature = "serde")]
    {
        features.push("serde".to_string());
    }

    #[cfg(feature = "tracing")]
    {
        features.push("tracing".to_string());
    }

    features
}
