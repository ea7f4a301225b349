//! Sync error types.

use thoughts_source::{SourceError, SourceErrorKind};

/// Semantic category of a failed sync attempt, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorKind {
    /// Network failure, timeout or non-success response.
    Unreachable,
    /// The pulled archive could not be decoded.
    MalformedArchive,
    /// The pulled tree has no index document.
    MissingIndex,
    /// Anything else.
    Other,
}

impl std::fmt::Display for SyncErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Unreachable => "source-unreachable",
            Self::MalformedArchive => "malformed-archive",
            Self::MissingIndex => "missing-index",
            Self::Other => "sync-error",
        })
    }
}

/// Error from one sync attempt. The slot being synced is left untouched.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The content source failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The pulled tree has no index document.
    #[error("no index document '{index_file}' found in repository")]
    MissingIndex {
        /// Index filename that was looked for.
        index_file: String,
    },

    /// The blocking worker running the source call panicked or was cancelled.
    #[error("sync task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl SyncError {
    /// Classify the error for logging.
    #[must_use]
    pub fn kind(&self) -> SyncErrorKind {
        match self {
            Self::Source(e) => match e.kind() {
                SourceErrorKind::Unreachable => SyncErrorKind::Unreachable,
                SourceErrorKind::MalformedArchive => SyncErrorKind::MalformedArchive,
                _ => SyncErrorKind::Other,
            },
            Self::MissingIndex { .. } => SyncErrorKind::MissingIndex,
            Self::Task(_) => SyncErrorKind::Other,
        }
    }
}
