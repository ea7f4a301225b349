//! Application state.
//!
//! Shared state for all request handlers.

use std::sync::Arc;

use thoughts_site::SyncEngine;

/// Application state shared across all handlers.
pub(crate) struct AppState {
    /// Engine holding the active snapshot.
    pub(crate) engine: Arc<SyncEngine>,
    /// Site title placed in every page's `<title>`.
    pub(crate) site_title: String,
}
