//! Read-only views over a pulled file tree.
//!
//! A [`FileTree`] owns whatever resources back it (downloaded archive bytes,
//! a directory on disk). Dropping the tree releases them, so the caller
//! releases a pull exactly once simply by letting the tree go out of scope.

use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use crate::error::SourceError;

/// Read-only file tree returned by [`ContentSource::contents`](crate::ContentSource::contents).
///
/// Paths are relative and slash-separated (`"owner-notes-1a2b3c/notes/today.md"`).
pub trait FileTree: Send + Sync {
    /// List every regular file in depth-first lexical order.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the tree cannot be walked.
    fn files(&self) -> Result<Vec<String>, SourceError>;

    /// Read the full contents of a file.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::NotFound`] or [`SourceError::Io`] if the file
    /// cannot be read.
    fn read(&self, path: &str) -> Result<Vec<u8>, SourceError>;
}

/// Sort slash-separated paths the way a depth-first walk with lexically
/// sorted directory entries visits them.
pub(crate) fn sort_depth_first(paths: &mut [String]) {
    paths.sort_by(|a, b| a.split('/').cmp(b.split('/')));
}

/// In-memory file tree.
///
/// Used for downloaded archives and as a test fixture.
#[derive(Clone, Debug, Default)]
pub struct MemoryTree {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, replacing any previous content at `path`.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(path, content);
        self
    }

    /// Add a file, replacing any previous content at `path`.
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), content.into());
    }

    /// Number of files in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the tree has no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Decode a zip archive into memory, expanding at most
    /// [`MAX_UNPACKED_BYTES`].
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::MalformedArchive`] if the bytes are not a valid
    /// archive or an entry cannot be decompressed.
    pub fn from_zip(bytes: Vec<u8>) -> Result<Self, SourceError> {
        Self::from_zip_with_limit(bytes, MAX_UNPACKED_BYTES)
    }

    /// Decode a zip archive into memory.
    ///
    /// Directory entries are dropped. Entries whose names would escape the
    /// archive root (`../`, absolute paths) are rejected as malformed. Sizes
    /// declared by the archive are not trusted; the decompressed bytes
    /// actually read across all entries may not exceed `max_unpacked`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::MalformedArchive`] if the bytes are not a valid
    /// archive, an entry cannot be decompressed, or the archive expands
    /// beyond `max_unpacked`.
    pub fn from_zip_with_limit(bytes: Vec<u8>, max_unpacked: u64) -> Result<Self, SourceError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
        let mut tree = Self::new();
        let mut remaining = max_unpacked;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }

            let Some(name) = entry.enclosed_name().map(|p| to_slash_path(&p)) else {
                return Err(malformed("entry escapes archive root"));
            };

            // One byte past the budget tells an exact fit from an overflow.
            let mut data = Vec::new();
            (&mut entry)
                .take(remaining.saturating_add(1))
                .read_to_end(&mut data)
                .map_err(zip::result::ZipError::Io)?;
            let read = u64::try_from(data.len()).unwrap_or(u64::MAX);
            if read > remaining {
                return Err(malformed("archive expands beyond size limit"));
            }
            remaining -= read;

            tree.files.insert(name, data);
        }

        Ok(tree)
    }
}

/// Upper bound on the total decompressed size of an archive.
pub const MAX_UNPACKED_BYTES: u64 = 512 * 1024 * 1024;

fn malformed(reason: &'static str) -> SourceError {
    SourceError::MalformedArchive(zip::result::ZipError::InvalidArchive(reason.into()))
}

impl FileTree for MemoryTree {
    fn files(&self) -> Result<Vec<String>, SourceError> {
        let mut paths: Vec<String> = self.files.keys().cloned().collect();
        sort_depth_first(&mut paths);
        Ok(paths)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(path.to_owned()))
    }
}

/// File tree backed by a directory on disk.
#[derive(Clone, Debug)]
pub struct DirTree {
    root: PathBuf,
}

impl DirTree {
    /// Create a view over `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the view.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn walk(&self, dir: &Path, prefix: &str, out: &mut Vec<String>) -> Result<(), SourceError> {
        let entries = fs::read_dir(dir).map_err(|e| SourceError::io(dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| SourceError::io(dir, e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| SourceError::io(entry.path(), e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let rel = if prefix.is_empty() {
                name
            } else {
                format!("{prefix}/{name}")
            };

            if file_type.is_dir() {
                self.walk(&entry.path(), &rel, out)?;
            } else if file_type.is_file() {
                out.push(rel);
            }
        }
        Ok(())
    }
}

impl FileTree for DirTree {
    fn files(&self) -> Result<Vec<String>, SourceError> {
        let mut paths = Vec::new();
        self.walk(&self.root, "", &mut paths)?;
        sort_depth_first(&mut paths);
        Ok(paths)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, SourceError> {
        let full = self.root.join(path);
        fs::read(&full).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => SourceError::NotFound(path.to_owned()),
            _ => SourceError::io(full, e),
        })
    }
}

/// Join path components with `/` regardless of platform.
fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
