//! A single text file with memoized rendering.

use std::sync::{Arc, OnceLock};

use thoughts_renderer::RenderError;

/// One Markdown file of a snapshot.
///
/// Immutable after construction except for the rendered HTML, which is
/// computed on first access and kept for the document's lifetime.
#[derive(Debug)]
pub struct Document {
    path: String,
    raw: Vec<u8>,
    html: OnceLock<Arc<str>>,
}

impl Document {
    /// Create a document from its logical path and raw contents.
    pub fn new(path: impl Into<String>, raw: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            raw: raw.into(),
            html: OnceLock::new(),
        }
    }

    /// Logical path inside the repository (wrapper directory stripped).
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Raw contents as pulled.
    #[must_use]
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Whether [`html`](Self::html) has already produced a cached value.
    #[must_use]
    pub fn is_rendered(&self) -> bool {
        self.html.get().is_some()
    }

    /// Rendered HTML fragment.
    ///
    /// Renders on the first call and returns the cached value afterwards.
    /// Rendering runs without holding a lock: concurrent first calls may each
    /// render, and whichever result is stored first is kept. Rendering is
    /// pure, so every caller sees identical bytes.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the raw content cannot be rendered. Failures
    /// are not cached.
    pub fn html(&self) -> Result<Arc<str>, RenderError> {
        if let Some(html) = self.html.get() {
            return Ok(Arc::clone(html));
        }

        let rendered: Arc<str> = thoughts_renderer::render(&self.raw)?.into();
        Ok(Arc::clone(self.html.get_or_init(|| rendered)))
    }
}
