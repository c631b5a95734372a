/// Default number of lines in a snippet when no match is found.
pub const DEFAULT_SNIPPET_LINES: usize = 6;

/// Maximum number of characters in a snippet before truncation.
pub const DEFAULT_SNIPPET_MAX_CHARS: usize = 400;

/// Substring test that ignores ASCII case. Non-ASCII characters must match
/// exactly.
pub fn contains_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    let haystack = haystack.as_bytes();
    let needle = needle.as_bytes();
    haystack
        .windows(needle.len())
        .any(|window| window.eq_ignore_ascii_case(needle))
}

/// Prepend line numbers to each line of text.
///
/// `start_line` is the number to assign to the first line (1-indexed).
pub fn add_line_numbers(text: &str, start_line: usize) -> String {
    text.lines()
        .enumerate()
        .map(|(i, line)| format!("{}: {}", start_line + i, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cut `text` to at most `max_chars` characters, marking the cut with `...`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Extract a snippet around the first line containing `query`.
///
/// Returns `(snippet_text, start_line_number)` where start_line_number is
/// 1-indexed. If `query` is not found, returns the first few lines.
/// Returns `None` if the text is empty.
pub fn extract_snippet(text: &str, query: &str) -> Option<(String, usize)> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.is_empty() {
        return None;
    }

    let match_idx = lines
        .iter()
        .position(|line| contains_ignore_ascii_case(line, query));

    let (start, end) = if let Some(idx) = match_idx {
        (idx.saturating_sub(2), (idx + 3).min(lines.len()))
    } else {
        (0, DEFAULT_SNIPPET_LINES.min(lines.len()))
    };

    let snippet = lines[start..end].join("\n");
    Some((truncate_chars(&snippet, DEFAULT_SNIPPET_MAX_CHARS), start + 1))
}
