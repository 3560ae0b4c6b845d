use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};

/// Cut `text` down to at most `max_chars` characters, appending an ellipsis
/// when anything was dropped. Operates on characters, never mid-codepoint.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    let mut iter = text.char_indices();
    match iter.nth(max_chars) {
        None => text.to_string(),
        Some((byte_index, _)) => format!("{}…", &text[..byte_index]),
    }
}

/// First line of a message, for compact single-row labels.
pub fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or(text)
}

pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Deterministic pseudo-random unit-square point for a message id, used to
/// seed initial node directions so layouts are reproducible across runs.
pub fn stable_pair(id: i64) -> (f32, f32) {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let hash = hasher.finish();

    let x = ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    let y = (((hash >> 32) & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    ((x * 2.0) - 1.0, (y * 2.0) - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_text_untouched() {
        assert_eq!(truncate_text("hello", 120), "hello");
        assert_eq!(truncate_text("", 120), "");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "héllo wörld";
        let cut = truncate_text(text, 4);
        assert_eq!(cut, "héll…");
    }

    #[test]
    fn stable_pair_is_deterministic_and_bounded() {
        let (x1, y1) = stable_pair(42);
        let (x2, y2) = stable_pair(42);
        assert_eq!((x1, y1), (x2, y2));
        assert!((-1.0..=1.0).contains(&x1));
        assert!((-1.0..=1.0).contains(&y1));
    }
}
