//! Repository snapshot extraction and indexing.
//!
//! A [`Snapshot`] is built in one go from a pulled [`FileTree`] and never
//! changes afterwards. Extraction either produces a complete snapshot (index
//! resolved, every document routed) or fails; nothing partial escapes.
//!
//! Given the pulled tree
//! ```text
//! owner-notes-1a2b3c/README.md        -> index
//! owner-notes-1a2b3c/notes/today.md   -> route "notes/today"
//! owner-notes-1a2b3c/logo.png         -> ignored
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use thoughts_source::FileTree;
use tracing::debug;

use crate::document::Document;
use crate::error::SyncError;

/// How documents are recognized in a pulled tree.
#[derive(Clone, Debug)]
pub struct ExtractOptions {
    /// Logical path of the index document.
    pub index_file: String,
    /// Suffix a file must carry to be a document. Stripped for routing.
    pub suffix: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            index_file: "README.md".to_owned(),
            suffix: ".md".to_owned(),
        }
    }
}

/// Immutable index of the documents from one pull.
#[derive(Debug)]
pub struct Snapshot {
    fingerprint: String,
    index: Arc<Document>,
    documents: HashMap<String, Arc<Document>>,
}

impl Snapshot {
    /// Extract and index every document of `tree`.
    ///
    /// Files are visited in depth-first lexical order. The first path segment
    /// (the archive wrapper directory) is stripped to get the logical path;
    /// files directly at the root of the tree have no wrapper and are skipped.
    /// When two files map to the same route, the one visited last wins.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MissingIndex`] if no file has the index logical
    /// path, or [`SyncError::Source`] if the tree cannot be read.
    pub fn extract(
        fingerprint: impl Into<String>,
        tree: &dyn FileTree,
        options: &ExtractOptions,
    ) -> Result<Self, SyncError> {
        let mut index = None;
        let mut documents = HashMap::new();

        for file in tree.files()? {
            let Some((_wrapper, logical)) = file.split_once('/') else {
                debug!(file = %file, "Skipping file outside wrapper directory");
                continue;
            };

            let is_index = logical == options.index_file;
            let route = match logical.strip_suffix(options.suffix.as_str()) {
                Some(route) if !route.is_empty() && !route.ends_with('/') => route,
                _ if is_index => logical,
                _ => continue,
            };

            let raw = tree.read(&file)?;
            let document = Arc::new(Document::new(logical, raw));

            if is_index {
                if index.replace(document).is_some() {
                    debug!(file = %file, "Duplicate index document, keeping last");
                }
            } else if documents.insert(route.to_owned(), document).is_some() {
                debug!(route, file = %file, "Duplicate route, keeping last");
            }
        }

        let index = index.ok_or_else(|| SyncError::MissingIndex {
            index_file: options.index_file.clone(),
        })?;

        Ok(Self {
            fingerprint: fingerprint.into(),
            index,
            documents,
        })
    }

    /// Fingerprint of the remote state this snapshot was built from.
    #[must_use]
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// The index (home) document.
    #[must_use]
    pub fn index(&self) -> &Arc<Document> {
        &self.index
    }

    /// Look up a document by route (logical path without suffix).
    #[must_use]
    pub fn get(&self, route: &str) -> Option<&Arc<Document>> {
        self.documents.get(route)
    }

    /// Every route, sorted.
    #[must_use]
    pub fn routes(&self) -> Vec<&str> {
        let mut routes: Vec<&str> = self.documents.keys().map(String::as_str).collect();
        routes.sort_unstable();
        routes
    }

    /// Number of routed documents, not counting the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the snapshot holds nothing but the index.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
