//! Content sources for the thoughts site.
//!
//! A content source is a remote project that can answer two questions: "what
//! is your current fingerprint?" and "give me every file you hold". This crate
//! provides:
//!
//! - [`ContentSource`] trait with `last_hash()` and `contents()`
//! - [`FileTree`] trait for the read-only tree a pull returns, with
//!   [`MemoryTree`] (decoded archives) and [`DirTree`] (directories on disk)
//! - [`GitHubSource`], the live fetcher over the GitHub REST API
//! - [`CachedSource`], a decorator that persists the first pull to disk and
//!   answers every later call from it
//! - [`MockSource`] for testing (behind `mock` feature flag)
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use thoughts_source::{CachedSource, ContentSource, GitHubSource};
//!
//! let live = GitHubSource::new(
//!     "https://api.github.com",
//!     "https://github.com/owner/notes",
//!     "main",
//!     Duration::from_secs(5),
//! )?;
//! let source = CachedSource::new(live, "cache");
//! let tree = source.contents()?;
//! for path in tree.files()? {
//!     println!("{path}");
//! }
//! ```

mod cached;
mod error;
mod github;
#[cfg(feature = "mock")]
mod mock;
mod source;
mod tree;

pub use cached::{CACHED_FINGERPRINT, CachedSource};
pub use error::{SourceError, SourceErrorKind};
pub use github::GitHubSource;
#[cfg(feature = "mock")]
pub use mock::MockSource;
pub use source::ContentSource;
pub use tree::{DirTree, FileTree, MAX_UNPACKED_BYTES, MemoryTree};
