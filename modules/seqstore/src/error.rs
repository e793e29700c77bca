/// Result type alias for store operations.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Everything a store call can fail with, distinctly typed so the caller can
/// pick a retry policy. `ConcurrencyConflict` means "definitely not written,
/// somebody else holds that slot"; `Transport` means "outcome unknown" — the
/// two are never collapsed.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another item already occupies `(sequence_id, position)`. Recoverable:
    /// the caller reassigns a position and retries. Never retried internally.
    #[error("item already exists at ({sequence_id}, {position})")]
    ConcurrencyConflict { sequence_id: String, position: String },

    /// Point lookup miss. Range queries return empty instead.
    #[error("no item at ({sequence_id}, {position})")]
    ItemNotFound { sequence_id: String, position: String },

    /// Backend unreachable, timed out, or returned something malformed.
    /// Fatal to the current call.
    #[error("backend transport failure: {0}")]
    Transport(#[from] anyhow::Error),

    /// Malformed request, rejected before any backend call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl StoreError {
    pub fn conflict(sequence_id: &str, position: impl std::fmt::Display) -> Self {
        Self::ConcurrencyConflict {
            sequence_id: sequence_id.to_string(),
            position: position.to_string(),
        }
    }

    pub fn not_found(sequence_id: &str, position: impl std::fmt::Display) -> Self {
        Self::ItemNotFound {
            sequence_id: sequence_id.to_string(),
            position: position.to_string(),
        }
    }

    /// True if this is the recoverable lost-the-race outcome.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}
