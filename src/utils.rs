//! Text-fitting helpers for post composition and log output.
//!
//! The platform counts any link as [`WRAPPED_LINK_CHARS`] characters
//! regardless of its real length, so the budget available to summary text
//! is fixed and can be computed up front.

/// Maximum characters for a whole post. Kept conservative (the platform
/// allows 280) because CJK summaries read poorly when they run long.
pub const MAX_POST_CHARS: usize = 200;

/// Characters the platform charges for a link after URL wrapping.
pub const WRAPPED_LINK_CHARS: usize = 23;

/// Characters that end a sentence; a cut directly after one of these is
/// always a clean boundary, which matters for Japanese text that carries
/// no inter-word spaces.
const SENTENCE_ENDS: &[char] = &['。', '！', '？', '.', '!', '?'];

/// Truncate `text` to at most `max_chars` characters without splitting a
/// word, appending an ellipsis when anything was dropped.
///
/// Boundaries are whitespace or a position directly after sentence-ending
/// punctuation. When the text is one unbroken run longer than the budget,
/// a hard cut is the only option left.
pub fn truncate_at_boundary(text: &str, max_chars: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return text.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }

    // Reserve one character for the ellipsis.
    let budget = max_chars - 1;
    let mut boundary = None;
    for i in 1..=budget.min(chars.len() - 1) {
        if chars[i].is_whitespace() || SENTENCE_ENDS.contains(&chars[i - 1]) {
            boundary = Some(i);
        }
    }

    let cut = boundary.unwrap_or(budget);
    let mut out: String = chars[..cut].iter().collect();
    out.truncate(out.trim_end().len());
    out.push('…');
    out
}

/// Compose the final post text: fitted summary, a space, then the link.
pub fn compose_post(summary: &str, url: &str) -> String {
    let available = MAX_POST_CHARS - WRAPPED_LINK_CHARS - 1;
    let fitted = truncate_at_boundary(summary, available);
    format!("{fitted} {url}")
}

/// Shorten a string for log lines, keeping the head and noting how much
/// was dropped. Cuts on a char boundary so CJK content never panics.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{}…(+{} bytes)", head, s.len() - head.len())
    }
}
