//! Document pages.
//!
//! `GET /` serves the index document, `GET /{path}` the document routed at
//! `path`. Both resolve against the snapshot that is active when the request
//! arrives and keep using it for the whole request.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use md5::{Digest, Md5};

use crate::error::ServerError;
use crate::state::AppState;
use crate::template::render_page;

/// Handle GET / (index document).
pub(crate) async fn get_index(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    get_page_impl("", &state, &headers)
}

/// Handle GET /{path}.
pub(crate) async fn get_page(
    Path(path): Path<String>,
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ServerError> {
    get_page_impl(&path, &state, &headers)
}

/// Shared implementation for page rendering.
fn get_page_impl(
    path: &str,
    state: &AppState,
    headers: &HeaderMap,
) -> Result<Response, ServerError> {
    let snapshot = state.engine.active().ok_or(ServerError::NotReady)?;

    let route = path.trim_matches('/');
    let document = if route.is_empty() {
        snapshot.index()
    } else {
        snapshot
            .get(route)
            .ok_or_else(|| ServerError::PageNotFound(route.to_owned()))?
    };

    let body = render_page(&state.site_title, &document.html()?);
    let etag = compute_etag(snapshot.fingerprint(), &body);

    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && if_none_match.as_bytes() == etag.as_bytes()
    {
        return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag)]).into_response());
    }

    Ok((
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8".to_owned()),
            (header::ETAG, etag),
            (header::CACHE_CONTROL, "public, max-age=60".to_owned()),
        ],
        body,
    )
        .into_response())
}

/// Compute `ETag` from snapshot fingerprint and page body.
///
/// Uses MD5 hash truncated to 64 bits (16 hex chars) - sufficient for
/// cache invalidation with negligible collision probability.
fn compute_etag(fingerprint: &str, body: &str) -> String {
    let hash = Md5::digest(format!("{fingerprint}:{body}").as_bytes());
    format!("\"{}\"", &hex::encode(hash)[..16])
}
