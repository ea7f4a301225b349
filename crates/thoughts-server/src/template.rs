//! HTML page template.
//!
//! Every served document is wrapped in the same minimal page: a titled head
//! with inline styles and a centered content column.

use std::fmt::Write;

use thoughts_renderer::escape_html;

/// Inline stylesheet shared by every page.
const STYLE: &str = "body {\n  font-family: monospace;\n}\n\
.content {\n  margin: 0 auto;\n  max-width: 800px;\n  border-left: 1px solid #eee;\n  \
border-right: 1px solid #eee;\n  padding: 20px;\n}\n";

/// Render a complete HTML page around an already rendered fragment.
///
/// `title` is escaped; `content` is inserted verbatim.
pub(crate) fn render_page(title: &str, content: &str) -> String {
    let mut html = String::with_capacity(content.len() + 512);

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    let _ = writeln!(html, "<title>{}</title>", escape_html(title));
    let _ = writeln!(html, "<style>\n{STYLE}</style>");
    html.push_str("</head>\n<body>\n<div class=\"content\">\n");
    html.push_str(content);
    html.push_str("</div>\n</body>\n</html>\n");

    html
}
