/// Byte index of the char boundary after `max_chars` characters, or `s.len()`.
pub fn char_boundary_at(s: &str, max_chars: usize) -> usize {
    s.char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Shortens `s` to at most `max_chars` characters, marking the cut with an ellipsis.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    let end = char_boundary_at(s, max_chars);
    if end == s.len() {
        return s.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    let keep = char_boundary_at(s, max_chars - 1);
    format!("{}…", &s[..keep])
}

/// Collapses runs of whitespace (including newlines) into single spaces.
pub fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
