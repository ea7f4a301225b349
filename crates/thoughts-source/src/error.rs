//! Error types for content sources.

use std::path::PathBuf;

/// Semantic error categories, used when logging failed syncs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SourceErrorKind {
    /// Network failure, timeout or non-success response. Retried at the next
    /// scheduled refresh.
    Unreachable,
    /// The pulled archive could not be decoded.
    MalformedArchive,
    /// Anything else (bad configuration, local I/O, empty history).
    Other,
}

impl std::fmt::Display for SourceErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Unreachable => "source-unreachable",
            Self::MalformedArchive => "malformed-archive",
            Self::Other => "source-error",
        })
    }
}

/// Error from a [`ContentSource`](crate::ContentSource) or [`FileTree`](crate::FileTree).
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed (connection refused, DNS, timeout, ...).
    #[error("HTTP request failed: {0}")]
    Http(#[from] ureq::Error),

    /// The remote answered with an unexpected status.
    #[error("unexpected status code: {status} - {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body (may contain error details).
        body: String,
    },

    /// The remote project has no recorded change yet.
    #[error("no activity found, commit to the repository before serving it")]
    NoHistory,

    /// The downloaded archive is not a readable zip file.
    #[error("malformed archive: {0}")]
    MalformedArchive(#[from] zip::result::ZipError),

    /// The repository URL is not of the form `https://github.com/{owner}/{name}`.
    #[error("invalid repository url '{0}', expected https://github.com/{{owner}}/{{name}}")]
    InvalidRepoUrl(String),

    /// The fingerprint response could not be decoded.
    #[error("failed to decode response: {0}")]
    Json(#[from] serde_json::Error),

    /// Local filesystem error.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A path was requested that the tree does not contain.
    #[error("file not found in tree: {0}")]
    NotFound(String),
}

impl SourceError {
    /// Attach a path to an I/O error.
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Classify the error for logging and retry decisions.
    #[must_use]
    pub fn kind(&self) -> SourceErrorKind {
        match self {
            Self::Http(_) | Self::Status { .. } => SourceErrorKind::Unreachable,
            Self::MalformedArchive(_) => SourceErrorKind::MalformedArchive,
            Self::NoHistory
            | Self::InvalidRepoUrl(_)
            | Self::Json(_)
            | Self::Io { .. }
            | Self::NotFound(_) => SourceErrorKind::Other,
        }
    }
}
