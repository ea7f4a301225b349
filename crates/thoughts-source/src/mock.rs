//! Mock content source for testing.
//!
//! Provides [`MockSource`] for unit testing without network access.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::SourceError;
use crate::source::ContentSource;
use crate::tree::{FileTree, MemoryTree};

/// Scripted [`ContentSource`].
///
/// Returns a configurable fingerprint and tree, can be told to fail either
/// operation, and counts calls and tree releases.
///
/// # Example
///
/// ```ignore
/// use thoughts_source::{ContentSource, MockSource};
///
/// let source = MockSource::new("abc123")
///     .with_file("w/README.md", "Hello");
///
/// assert_eq!(source.last_hash().unwrap(), "abc123");
/// drop(source.contents().unwrap());
/// assert_eq!(source.released(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockSource {
    state: Mutex<MockState>,
    hash_calls: AtomicUsize,
    contents_calls: AtomicUsize,
    released: Arc<AtomicUsize>,
}

#[derive(Debug, Default)]
struct MockState {
    hash: String,
    tree: MemoryTree,
    fail_hash: bool,
    fail_contents: bool,
}

impl MockSource {
    /// Create a source reporting `hash` with an empty tree.
    #[must_use]
    pub fn new(hash: impl Into<String>) -> Self {
        let source = Self::default();
        source.set_hash(hash);
        source
    }

    /// Add a file to the tree.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_file(self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.state.lock().unwrap().tree.insert(path, content);
        self
    }

    /// Change the reported fingerprint.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn set_hash(&self, hash: impl Into<String>) {
        self.state.lock().unwrap().hash = hash.into();
    }

    /// Replace the whole tree.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn set_tree(&self, tree: MemoryTree) {
        self.state.lock().unwrap().tree = tree;
    }

    /// Make `last_hash` fail (or succeed again).
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn fail_hash(&self, fail: bool) {
        self.state.lock().unwrap().fail_hash = fail;
    }

    /// Make `contents` fail (or succeed again).
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn fail_contents(&self, fail: bool) {
        self.state.lock().unwrap().fail_contents = fail;
    }

    /// Number of `last_hash` calls so far.
    #[must_use]
    pub fn hash_calls(&self) -> usize {
        self.hash_calls.load(Ordering::SeqCst)
    }

    /// Number of `contents` calls so far.
    #[must_use]
    pub fn contents_calls(&self) -> usize {
        self.contents_calls.load(Ordering::SeqCst)
    }

    /// Number of trees handed out by `contents` that have been dropped.
    #[must_use]
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

fn unavailable() -> SourceError {
    SourceError::Status {
        status: 503,
        body: "mock".to_owned(),
    }
}

impl ContentSource for MockSource {
    fn last_hash(&self) -> Result<String, SourceError> {
        self.hash_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if state.fail_hash {
            return Err(unavailable());
        }
        Ok(state.hash.clone())
    }

    fn contents(&self) -> Result<Box<dyn FileTree>, SourceError> {
        self.contents_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        if state.fail_contents {
            return Err(unavailable());
        }
        Ok(Box::new(TrackedTree {
            tree: state.tree.clone(),
            released: Arc::clone(&self.released),
        }))
    }
}

/// Tree that bumps the owner's release counter when dropped.
struct TrackedTree {
    tree: MemoryTree,
    released: Arc<AtomicUsize>,
}

impl FileTree for TrackedTree {
    fn files(&self) -> Result<Vec<String>, SourceError> {
        self.tree.files()
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        self.tree.read(path)
    }
}

impl Drop for TrackedTree {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}
