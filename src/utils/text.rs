//! Small text helpers for HTML-bearing catalog fields.

/// Removes `<...>` tag runs. An unterminated `<` is kept as literal text.
pub fn strip_html_tags(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(open) = rest.find('<') {
        output.push_str(&rest[..open]);
        match rest[open..].find('>') {
            Some(close) => rest = &rest[open + close + 1..],
            None => {
                output.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    output.push_str(rest);
    output
}

/// Case-insensitive substring test.
pub fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Truncates to at most `max_chars` characters, appending `...` when cut.
pub fn truncate_with_ellipsis(input: &str, max_chars: usize) -> (String, bool) {
    match input.char_indices().nth(max_chars) {
        Some((cut, _)) => (format!("{}...", &input[..cut]), true),
        None => (input.to_string(), false),
    }
}
