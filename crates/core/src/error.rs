use thiserror::Error;

use crate::game::Street;

/// Errors that can occur in the solver core.
#[derive(Debug, Error)]
pub enum SolverError {
    /// Malformed card or action text.
    #[error("parse error: {0}")]
    Parse(String),

    /// An action that is illegal for the current betting state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Postflop bucket lookup with no centroid table for the street.
    ///
    /// Recoverable at query time (the caller falls back to the equity
    /// heuristic); fatal for a postflop training run.
    #[error("no centroids loaded for {0:?}")]
    AbstractionMiss(Street),

    /// Missing, corrupt, or version-mismatched strategy artifact.
    #[error("artifact error: {0}")]
    Artifact(String),

    /// Artifact written by an incompatible version of the solver.
    #[error("artifact version mismatch: expected {expected}, got {actual}")]
    ArtifactVersion { expected: u32, actual: u32 },

    /// A broken internal invariant: action-list mismatch on an existing
    /// info set, NaN regrets, and the like. Aborts the training batch.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SolverError {
    /// Whether this error must abort the whole training batch rather than
    /// just the offending traversal.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }
}
