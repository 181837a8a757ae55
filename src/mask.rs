//! Two-phase extract/restore masking.
//!
//! Detectors hide regions they must not rewrite (existing tables, fenced
//! blocks, freshly emitted output) behind a placeholder token, run their
//! heuristics, then splice the originals back. A token is a sentinel
//! character, a decimal index into the side table, and the sentinel again.
//! The sentinel is a private-use code point chosen to be absent from the
//! input, so a token can never collide with text the user wrote.

use log::trace;

/// Private-use ranges searched for a sentinel, in order.
const SENTINEL_RANGES: &[(u32, u32)] = &[(0xE000, 0xF8FF), (0xF0000, 0xFFFFD)];

/// Side table of masked spans plus the sentinel that marks their tokens.
#[derive(Debug, Clone)]
pub struct MaskTable {
    sentinel: char,
    spans: Vec<String>,
}

impl MaskTable {
    /// Create an empty table whose sentinel does not occur in `text`.
    pub fn for_text(text: &str) -> Self {
        Self {
            sentinel: pick_sentinel(text),
            spans: Vec::new(),
        }
    }

    /// Store `span` and return the token that stands in for it.
    pub fn mask(&mut self, span: impl Into<String>) -> String {
        let index = self.spans.len();
        let span = span.into();
        trace!("masking span {} ({} bytes)", index, span.len());
        self.spans.push(span);
        format!("{0}{1}{0}", self.sentinel, index)
    }

    /// Check whether `s` contains any token from this table.
    pub fn contains_token(&self, s: &str) -> bool {
        s.contains(self.sentinel)
    }

    /// Number of masked spans.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// True if nothing has been masked.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Replace every token in `text` with its original span.
    pub fn restore(&self, text: &str) -> String {
        if self.spans.is_empty() {
            return text.to_string();
        }

        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(open) = rest.find(self.sentinel) {
            out.push_str(&rest[..open]);
            let after = &rest[open + self.sentinel.len_utf8()..];

            let span = after.find(self.sentinel).and_then(|close| {
                after[..close]
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| self.spans.get(index))
                    .map(|span| (span, close))
            });

            match span {
                Some((span, close)) => {
                    out.push_str(span);
                    rest = &after[close + self.sentinel.len_utf8()..];
                }
                None => {
                    // Not a token we issued; keep the character as-is
                    out.push(self.sentinel);
                    rest = after;
                }
            }
        }

        out.push_str(rest);
        out
    }
}

/// Choose the first private-use code point absent from `text`.
fn pick_sentinel(text: &str) -> char {
    SENTINEL_RANGES
        .iter()
        .flat_map(|&(lo, hi)| lo..=hi)
        .filter_map(char::from_u32)
        .find(|c| !text.contains(*c))
        .unwrap_or('\u{10FFFD}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_and_restore_roundtrip() {
        let text = "a\n| x | y |\n| 1 | 2 |\nb";
        let mut table = MaskTable::for_text(text);
        let span = "| x | y |\n| 1 | 2 |";
        let token = table.mask(span);
        let masked = text.replace(span, &token);

        assert!(!masked.contains('|'));
        assert!(table.contains_token(&masked));
        assert_eq!(table.restore(&masked), text);
    }

    #[test]
    fn test_sentinel_avoids_existing_private_use_chars() {
        let text = "\u{E000}\u{E001} literal";
        let mut table = MaskTable::for_text(text);
        let token = table.mask("X");
        assert!(!token.starts_with('\u{E000}'));
        assert!(!token.starts_with('\u{E001}'));

        let masked = format!("{} {}", text, token);
        assert_eq!(table.restore(&masked), format!("{} X", text));
    }

    #[test]
    fn test_restore_multiple_tokens_in_order() {
        let mut table = MaskTable::for_text("");
        let a = table.mask("first");
        let b = table.mask("second");
        assert_eq!(table.len(), 2);
        assert_eq!(table.restore(&format!("{}-{}", b, a)), "second-first");
    }

    #[test]
    fn test_restore_without_spans_is_identity() {
        let table = MaskTable::for_text("plain");
        assert!(table.is_empty());
        assert_eq!(table.restore("plain"), "plain");
    }

    #[test]
    fn test_restore_ignores_foreign_sentinel_runs() {
        let mut table = MaskTable::for_text("");
        let token = table.mask("ok");
        let sentinel = token.chars().next().unwrap();
        let text = format!("{}{}oops", token, sentinel);
        assert_eq!(table.restore(&text), format!("ok{}oops", sentinel));
    }
}
