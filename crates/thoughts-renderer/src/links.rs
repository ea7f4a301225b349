//! Link target rewriting.

/// Source file suffix stripped from same-tree link targets.
const SOURCE_SUFFIX: &str = ".md";

/// Rewrite a link target that points at a sibling source file so it points
/// at the routed path instead.
///
/// - `./other.md` → `./other`
/// - `notes/today.md#intro` → `notes/today#intro`
///
/// External links, absolute paths, fragment-only links and links to anything
/// other than a source file return `None` (leave unchanged).
pub(crate) fn strip_source_suffix(url: &str) -> Option<String> {
    if url.starts_with("http://")
        || url.starts_with("https://")
        || url.starts_with("//")
        || url.starts_with("mailto:")
        || url.starts_with("tel:")
        || url.starts_with('#')
        || url.starts_with('/')
    {
        return None;
    }

    let (path, fragment) = match url.find('#') {
        Some(pos) => url.split_at(pos),
        None => (url, ""),
    };

    let stripped = path.strip_suffix(SOURCE_SUFFIX)?;
    if stripped.is_empty() || stripped.ends_with('/') {
        return None;
    }

    Some(format!("{stripped}{fragment}"))
}

/// Whether `url` leaves the site: an absolute or protocol-relative web link.
pub(crate) fn is_external(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://") || url.starts_with("//")
}
