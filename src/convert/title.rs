//! Title pass: a short leading line becomes the document's H1.

use super::shape::{LineShape, SHORT_LINE, char_len, classify, is_underline};

/// Promote the first non-empty line to `# Title` followed by a rule.
///
/// The line must be shorter than [`SHORT_LINE`] characters, must not end in
/// `:` or `?`, and must be ordinary text (not a heading, list item, quote,
/// table row, fence or rule). A line underlined Setext-style is left for the
/// heading pass.
pub(super) fn promote_title(lines: &[String]) -> Vec<String> {
    let Some(first) = lines.iter().position(|line| !line.trim().is_empty()) else {
        return lines.to_vec();
    };

    let title = lines[first].trim();
    let eligible = matches!(classify(title), LineShape::Text | LineShape::Spaced)
        && char_len(title) < SHORT_LINE
        && !title.ends_with(':')
        && !title.ends_with('?');
    let underlined = lines.get(first + 1).is_some_and(|next| is_underline(next));

    if !eligible || underlined {
        return lines.to_vec();
    }

    let mut out = Vec::with_capacity(lines.len() + 3);
    out.extend_from_slice(&lines[..first]);
    out.push(format!("# {}", title));
    out.push(String::new());
    out.push("---".to_string());
    out.push(String::new());
    out.extend_from_slice(&lines[first + 1..]);
    out
}
