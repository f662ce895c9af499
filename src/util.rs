/// Result of a truncation operation
#[derive(Debug, Clone, PartialEq)]
pub struct TruncateResult {
    pub content: String,
    pub truncated: bool,
}

/// Default number of characters kept per file snapshot
pub const DEFAULT_NUM_CHARS: usize = 5000;

/// Keep the first `max_chars` characters of `content`.
///
/// Counts Unicode scalar values, so a multi-byte character is never split.
/// When anything is cut, a marker with the kept and total character counts
/// is appended after the kept prefix.
pub fn truncate_text_by_chars(content: &str, max_chars: usize) -> TruncateResult {
    let Some((cut, _)) = content.char_indices().nth(max_chars) else {
        return TruncateResult {
            content: content.to_string(),
            truncated: false,
        };
    };

    let total_chars = max_chars + content[cut..].chars().count();
    let mut result = content[..cut].to_string();
    result.push_str(&truncation_marker(max_chars, total_chars));

    TruncateResult {
        content: result,
        truncated: true,
    }
}

/// Marker appended to truncated content
pub fn truncation_marker(kept: usize, total: usize) -> String {
    format!("\n\n---\ntruncated [{}/{} chars]", kept, total)
}
