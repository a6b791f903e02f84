//! Error types for graph construction, tuning and simulation.

use thiserror::Error;

/// Errors that can occur while building, tuning, simulating or persisting graphs.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in the future without breaking changes.
///
/// The variants map onto distinct failure classes so callers can tell a bad
/// configuration apart from an implementation defect or an exhausted search:
/// - `Config` is raised before any computation starts.
/// - `InvariantViolation` means a postcondition the algorithms guarantee did not
///   hold; the unit of work must be abandoned.
/// - `RetryBudgetExceeded` is fatal for one target value only.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ModelError {
    /// Invalid configuration (relative strengths, group values, generator parameters).
    #[error("configuration error: {0}")]
    Config(String),

    /// A structural guarantee was broken (degree sequence changed, fully
    /// (dis)assortative graph not at exactly +/-1).
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// The assortativity search exhausted its retry budget.
    #[error("exceeded retry budget: target assortativity {target} not reached after {retries} retries")]
    RetryBudgetExceeded { target: f64, retries: usize },

    /// Degenerate numeric input (zero-variance correlation, empty edge set).
    #[error("numerical error: {0}")]
    Numerical(String),

    /// A generator could not produce a graph for the given parameters.
    #[error("generation error: {0}")]
    Generation(String),

    /// Reading or writing graph and result artifacts failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<std::io::Error> for ModelError {
    fn from(err: std::io::Error) -> Self {
        ModelError::Storage(err.to_string())
    }
}

#[cfg(feature = "serde")]
impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Storage(format!("json: {}", err))
    }
}

impl ModelError {
    /// True for failures that indicate a bad configuration rather than a defect.
    pub fn is_config(&self) -> bool {
        matches!(self, ModelError::Config(_))
    }
}
