//! Documents handed to the offline full-text indexer.

use crate::model::Snippet;

/// One rendered page for the indexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchDocument {
    pub id: String,
    /// Site-relative URL the indexer should attribute hits to.
    pub url: String,
    pub html: String,
}

impl SearchDocument {
    /// File name to write this document under.
    pub fn file_name(&self) -> String {
        format!("{}.html", self.id)
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render a snippet's title, description and file contents as HTML.
pub fn render_document(snippet: &Snippet) -> SearchDocument {
    let title = escape_html(&snippet.title);
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    html.push_str(&format!("<title>{title}</title>\n"));
    html.push_str("</head>\n<body>\n");
    html.push_str(&format!("<h1>{title}</h1>\n"));
    if !snippet.description.is_empty() {
        html.push_str(&format!("<p>{}</p>\n", escape_html(&snippet.description)));
    }
    for file in &snippet.files {
        html.push_str(&format!(
            "<pre data-filename=\"{}\" data-language=\"{}\"><code>{}</code></pre>\n",
            escape_html(&file.filename),
            escape_html(&file.language),
            escape_html(&file.code)
        ));
    }
    html.push_str("</body>\n</html>\n");

    SearchDocument {
        id: snippet.id.to_string(),
        url: format!("/snippet/{}", snippet.id),
        html,
    }
}

/// Documents for every public snippet.
pub fn render_public(snippets: &[Snippet]) -> Vec<SearchDocument> {
    snippets
        .iter()
        .filter(|s| s.is_public)
        .map(render_document)
        .collect()
}
