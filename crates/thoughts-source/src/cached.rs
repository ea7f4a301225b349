//! Disk-backed cache decorator.
//!
//! [`CachedSource`] wraps another [`ContentSource`]. Once its cache directory
//! exists, both operations are answered locally and the wrapped source is
//! never consulted again. Until then every call is delegated, and the first
//! successful pull is copied to disk.
//!
//! Directory layout mirrors the pulled tree verbatim:
//! ```text
//! {dir}/
//! +-- owner-notes-1a2b3c/
//!     +-- README.md
//!     +-- notes/
//!         +-- today.md
//! ```
//!
//! The copy is staged in a sibling `.{name}.partial` directory and renamed
//! into place once complete, so the cache directory only ever appears with a
//! full pull inside it. Files are created with `create_new` and never
//! overwritten.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::source::ContentSource;
use crate::tree::{DirTree, FileTree};

/// Fingerprint reported while the cache directory exists.
pub const CACHED_FINGERPRINT: &str = "cached-hash";

/// [`ContentSource`] decorator that persists the first pull to disk and
/// short-circuits all later calls.
pub struct CachedSource<S> {
    inner: S,
    dir: PathBuf,
}

impl<S: ContentSource> CachedSource<S> {
    /// Wrap `inner`, caching under `dir`.
    pub fn new(inner: S, dir: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            dir: dir.into(),
        }
    }

    /// Cache directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Wrapped source.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Whether the cache directory is present. Its contents are not inspected.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.dir.is_dir()
    }

    fn staging_dir(&self) -> PathBuf {
        let name = self
            .dir
            .file_name()
            .map_or_else(|| "cache".into(), |n| n.to_string_lossy());
        self.dir.with_file_name(format!(".{name}.partial"))
    }

    /// Copy every file of `tree` to disk and publish the cache directory.
    fn persist(&self, tree: &dyn FileTree) -> Result<usize, SourceError> {
        let staging = self.staging_dir();
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(|e| SourceError::io(&staging, e))?;
        }
        fs::create_dir_all(&staging).map_err(|e| SourceError::io(&staging, e))?;

        let mut written = 0;
        for path in tree.files()? {
            if !is_relative_path(&path) {
                warn!(path = %path, "Skipping unsafe path while caching");
                continue;
            }

            let data = tree.read(&path)?;
            let target = staging.join(&path);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| SourceError::io(parent, e))?;
            }
            if write_new(&target, &data)? {
                written += 1;
            }
        }

        fs::rename(&staging, &self.dir).map_err(|e| SourceError::io(&self.dir, e))?;
        Ok(written)
    }
}

impl<S: ContentSource> ContentSource for CachedSource<S> {
    fn last_hash(&self) -> Result<String, SourceError> {
        if self.exists() {
            debug!(dir = %self.dir.display(), "Cache present, skipping fingerprint fetch");
            return Ok(CACHED_FINGERPRINT.to_owned());
        }
        self.inner.last_hash()
    }

    fn contents(&self) -> Result<Box<dyn FileTree>, SourceError> {
        if self.exists() {
            debug!(dir = %self.dir.display(), "Serving contents from cache");
            return Ok(Box::new(DirTree::new(&self.dir)));
        }

        let tree = self.inner.contents()?;
        match self.persist(tree.as_ref()) {
            Ok(files) => info!(dir = %self.dir.display(), files, "Cached pulled tree"),
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Failed to write cache");
                let staging = self.staging_dir();
                if staging.exists()
                    && let Err(e) = fs::remove_dir_all(&staging)
                {
                    warn!(dir = %staging.display(), error = %e, "Failed to remove partial cache");
                }
            }
        }
        Ok(tree)
    }
}

/// Create `path` and write `data`. Returns `false` if the file already existed.
fn write_new(path: &Path, data: &[u8]) -> Result<bool, SourceError> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(SourceError::io(path, e)),
    };
    file.write_all(data).map_err(|e| SourceError::io(path, e))?;
    Ok(true)
}

fn is_relative_path(path: &str) -> bool {
    !path.is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}
