use once_cell::sync::Lazy;
use regex::Regex;

use super::item::ItemId;

pub const TEXT_CHAR_LIMIT: usize = 240;
pub const TRUNCATION_MARKER: char = '…';

const HASH_SEED: u32 = 5381;

static LINE_BREAK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\r\n|\r|\n").expect("valid line break regex"));

/// Reverse DJB2 over the UTF-16 code units of `text`.
///
/// Ids stay stable across runs and match ids computed by browser-side
/// tooling that walks `charCodeAt`. Not collision-proof: two distinct texts
/// sharing an id are treated as one item by the ingestion gate.
pub fn hash_text(text: &str) -> ItemId {
    let units: Vec<u16> = text.encode_utf16().collect();
    let hash = units
        .iter()
        .rev()
        .fold(HASH_SEED, |h, unit| h.wrapping_mul(33) ^ u32::from(*unit));
    ItemId(hash)
}

/// Collapses line breaks, trims, and caps the text at [`TEXT_CHAR_LIMIT`]
/// characters followed by [`TRUNCATION_MARKER`].
pub fn normalize_text(raw: &str) -> String {
    let collapsed = LINE_BREAK_REGEX.replace_all(raw, " ");
    let trimmed = collapsed.trim();

    match trimmed.char_indices().nth(TEXT_CHAR_LIMIT) {
        Some((cut, _)) => {
            let mut truncated = String::with_capacity(cut + TRUNCATION_MARKER.len_utf8());
            truncated.push_str(&trimmed[..cut]);
            truncated.push(TRUNCATION_MARKER);
            truncated
        }
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_matches_known_values() {
        assert_eq!(hash_text(""), ItemId(5381));
        assert_eq!(hash_text("a"), ItemId(177_604));
        assert_eq!(hash_text("ab"), ItemId(5_861_062));
        assert_eq!(hash_text("hello world"), ItemId(2_616_892_229));
        assert_eq!(hash_text("Politics"), ItemId(762_083_186));
    }

    #[test]
    fn hash_is_deterministic() {
        let text = "Breaking: the same post observed twice 🚀";
        assert_eq!(hash_text(text), hash_text(text));
        assert_ne!(hash_text(text), hash_text("Breaking: a different post"));
    }

    #[test]
    fn normalize_collapses_line_breaks_and_trims() {
        assert_eq!(normalize_text("  first\nsecond\r\nthird\r "), "first second third");
        assert_eq!(normalize_text("\n\n"), "");
    }

    #[test]
    fn normalize_truncates_on_char_boundaries() {
        let raw = "é".repeat(TEXT_CHAR_LIMIT + 10);
        let normalized = normalize_text(&raw);
        assert_eq!(normalized.chars().count(), TEXT_CHAR_LIMIT + 1);
        assert!(normalized.ends_with(TRUNCATION_MARKER));

        let exact = "x".repeat(TEXT_CHAR_LIMIT);
        assert_eq!(normalize_text(&exact), exact);
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            String::new(),
            "  padded  ".to_string(),
            "line\nbreaks\r\neverywhere\n".to_string(),
            format!("{} tail", "word ".repeat(80)),
            format!("{}\n", "y".repeat(TEXT_CHAR_LIMIT + 1)),
        ];
        for sample in samples {
            let once = normalize_text(&sample);
            assert_eq!(normalize_text(&once), once, "sample {sample:?}");
        }
    }
}
