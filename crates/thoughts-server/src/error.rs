//! Error types for the HTTP server.

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use thoughts_site::{RenderError, SyncError};
use thoughts_source::SourceError;

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// No document is routed at the given path.
    #[error("Page not found: {0}")]
    PageNotFound(String),

    /// No snapshot has been built yet.
    #[error("Site is not ready")]
    NotReady,

    /// Rendering a document failed.
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// The content source could not be constructed.
    #[error("Invalid content source: {0}")]
    Source(#[from] SourceError),

    /// The initial sync failed.
    #[error("Initial sync failed ({kind}): {0}", kind = .0.kind())]
    Startup(#[source] SyncError),

    /// Binding the listening socket failed.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// I/O error while serving.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::PageNotFound(_) => StatusCode::NOT_FOUND,
            Self::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            Self::Render(e) => {
                tracing::error!(error = %e, "Failed to render document");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Source(_) | Self::Startup(_) | Self::Bind { .. } | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = match status {
            StatusCode::NOT_FOUND => "404 page not found".to_owned(),
            StatusCode::SERVICE_UNAVAILABLE => "503 site is not ready".to_owned(),
            _ => "500 failed to render document".to_owned(),
        };

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            body,
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_not_found_is_plain_text_404() {
        let response = ServerError::PageNotFound("missing".to_owned()).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
    }

    #[test]
    fn test_not_ready_is_503() {
        let response = ServerError::NotReady.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_startup_message_names_kind() {
        let err = ServerError::Startup(SyncError::MissingIndex {
            index_file: "README.md".to_owned(),
        });
        assert_eq!(
            err.to_string(),
            "Initial sync failed (missing-index): no index document 'README.md' found in repository"
        );
    }
}
