//! Markdown to HTML for transcript entries.

use pulldown_cmark::{html, Options, Parser};

/// Renders assistant markdown to an HTML fragment.
pub fn render_markdown(content: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(content, options);
    let mut output = String::with_capacity(content.len() * 3 / 2);
    html::push_html(&mut output, parser);
    output
}

/// Escapes text for display without markdown interpretation.
pub fn escape_html(content: &str) -> String {
    let mut output = String::with_capacity(content.len());
    for ch in content.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#39;"),
            _ => output.push(ch),
        }
    }
    output
}

/// Renders either markdown or escaped plain text inside a paragraph.
pub fn render_text(content: &str, markdown: bool) -> String {
    if markdown {
        render_markdown(content)
    } else {
        format!("<p>{}</p>\n", escape_html(content))
    }
}
