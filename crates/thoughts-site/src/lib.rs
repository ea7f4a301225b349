//! Snapshots of a notes repository and the engine that keeps them current.
//!
//! # Architecture
//!
//! - [`Document`]: one Markdown file with lazily rendered, memoized HTML
//! - [`Snapshot`]: immutable route → document index built from one pull,
//!   with the `README.md` document promoted to index
//! - [`SyncEngine`]: two snapshot slots and an atomic active selector;
//!   refreshes rebuild the inactive slot and flip only on success
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use thoughts_site::{ExtractOptions, SyncEngine};
//!
//! let engine = SyncEngine::new(source, ExtractOptions::default());
//! engine.sync_active().await?;
//!
//! let snapshot = engine.active().expect("synced");
//! let html = snapshot.get("notes/today").unwrap().html()?;
//! ```

mod document;
mod error;
mod snapshot;
mod sync;

pub use document::Document;
pub use error::{SyncError, SyncErrorKind};
pub use snapshot::{ExtractOptions, Snapshot};
pub use sync::{RefreshOutcome, SlotId, SlotStatus, SyncEngine, SyncOutcome};
pub use thoughts_renderer::RenderError;
