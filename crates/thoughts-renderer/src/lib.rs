//! Markdown to HTML transform.
//!
//! [`render`] is a pure function: identical input bytes always produce
//! identical output. On top of the stock pulldown-cmark HTML output it
//!
//! - strips the `.md` suffix from links to sibling source files, so
//!   `[next](./other.md)` points at the routed page `./other`
//! - opens external `http(s)` links in a new tab (`target="_blank"`)
//! - gives every heading a slug `id` (`## Getting Started` → `id="getting-started"`)
//!
//! # Example
//!
//! ```
//! let html = thoughts_renderer::render(b"# Hello\n\nSee [more](./more.md)").unwrap();
//! assert!(html.contains(r#"<a href="./more">more</a>"#));
//! ```

mod links;
mod util;

use std::collections::HashMap;

use pulldown_cmark::{Event, LinkType, Options, Parser, Tag, TagEnd, html};

pub use util::{escape_html, slugify};

/// Error converting a document.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The raw content is not valid UTF-8 text.
    #[error("document is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

/// Markdown extensions enabled for every document.
fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
        | Options::ENABLE_GFM
}

/// Render raw Markdown bytes to an HTML fragment.
///
/// # Errors
///
/// Returns [`RenderError::InvalidUtf8`] if `raw` is not UTF-8.
pub fn render(raw: &[u8]) -> Result<String, RenderError> {
    let text = std::str::from_utf8(raw)?;
    let events = rewrite(Parser::new_ext(text, options()));

    let mut out = String::with_capacity(text.len() + text.len() / 2);
    html::push_html(&mut out, events.into_iter());
    Ok(out)
}

/// Apply link rewriting and heading ids to an event stream.
fn rewrite<'a>(parser: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
    let mut out = Vec::new();
    let mut ids = HeadingIds::default();
    // Index of the open heading's start event, and its text so far.
    let mut heading: Option<(usize, String)> = None;
    // One entry per open link: whether its tags are emitted as raw HTML.
    let mut open_links: Vec<bool> = Vec::new();

    for mut event in parser {
        match &mut event {
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            }) => {
                if *link_type != LinkType::Email && links::is_external(dest_url) {
                    open_links.push(true);
                    out.push(Event::InlineHtml(external_anchor(dest_url, title).into()));
                    continue;
                }
                open_links.push(false);
                if let Some(url) = links::strip_source_suffix(dest_url) {
                    *dest_url = url.into();
                }
            }
            Event::End(TagEnd::Link) => {
                if open_links.pop() == Some(true) {
                    out.push(Event::InlineHtml("</a>".into()));
                    continue;
                }
            }
            Event::Start(Tag::Heading { .. }) => heading = Some((out.len(), String::new())),
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, buf)) = heading.as_mut() {
                    buf.push_str(text);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((start, text)) = heading.take()
                    && let Some(Event::Start(Tag::Heading { id, .. })) = out.get_mut(start)
                    && id.is_none()
                {
                    *id = Some(ids.next(&text).into());
                }
            }
            _ => {}
        }
        out.push(event);
    }

    out
}

/// Opening tag for a link that leaves the site.
fn external_anchor(href: &str, title: &str) -> String {
    let mut tag = format!(r#"<a href="{}""#, escape_html(href));
    if !title.is_empty() {
        tag.push_str(&format!(r#" title="{}""#, escape_html(title)));
    }
    tag.push_str(r#" target="_blank">"#);
    tag
}

/// Hands out unique heading ids within one document.
#[derive(Default)]
struct HeadingIds {
    seen: HashMap<String, usize>,
}

impl HeadingIds {
    fn next(&mut self, text: &str) -> String {
        let mut slug = slugify(text);
        if slug.is_empty() {
            slug = "section".to_owned();
        }

        let count = self.seen.entry(slug.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            slug
        } else {
            format!("{slug}-{}", *count - 1)
        }
    }
}
