//! The content source contract.

use std::sync::Arc;

use crate::error::SourceError;
use crate::tree::FileTree;

/// A remote project that can report whether it changed and hand out a full
/// snapshot of its files.
///
/// Implementations block on I/O; async callers run them on a blocking pool.
/// Decorators such as [`CachedSource`](crate::CachedSource) wrap another
/// source and expose the same two operations.
pub trait ContentSource: Send + Sync {
    /// Return an opaque fingerprint of the remote state "as of now".
    ///
    /// Equal fingerprints mean nothing changed. Must not transfer content.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::NoHistory`] when the project has no recorded
    /// change, or a transport error.
    fn last_hash(&self) -> Result<String, SourceError>;

    /// Pull every file of the project at (approximately) the current state.
    ///
    /// Resources held by the pull are released when the returned tree is
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns a transport error, a non-success status, or
    /// [`SourceError::MalformedArchive`].
    fn contents(&self) -> Result<Box<dyn FileTree>, SourceError>;
}

impl<S: ContentSource + ?Sized> ContentSource for Arc<S> {
    fn last_hash(&self) -> Result<String, SourceError> {
        (**self).last_hash()
    }

    fn contents(&self) -> Result<Box<dyn FileTree>, SourceError> {
        (**self).contents()
    }
}

impl<S: ContentSource + ?Sized> ContentSource for Box<S> {
    fn last_hash(&self) -> Result<String, SourceError> {
        (**self).last_hash()
    }

    fn contents(&self) -> Result<Box<dyn FileTree>, SourceError> {
        (**self).contents()
    }
}
