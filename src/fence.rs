//! Fenced code block guard.
//!
//! Every rewriting pass asks the same question before touching a line: is
//! this line inside a triple-backtick fence? The answer is derived purely by
//! counting fence markers that appear strictly before the line. An odd count
//! means the line is inside a fence.
//!
//! An unpaired fence leaves every later line "inside", which suppresses all
//! further heuristics for the rest of the document. That is the accepted
//! fallback for unclosed code.

/// The marker that opens and closes a fenced code block.
pub const FENCE_MARKER: &str = "```";

/// Check whether a line is a fence marker (trimmed content starts with ```).
pub fn is_fence_marker(line: &str) -> bool {
    line.trim().starts_with(FENCE_MARKER)
}

/// Check whether `lines[index]` lies inside an already-opened fenced block.
///
/// Scans every line strictly before `index`; O(n) per call. Passes that ask
/// for many indices should build a [`FenceIndex`] once instead.
pub fn is_in_code_block<S: AsRef<str>>(lines: &[S], index: usize) -> bool {
    let markers = lines
        .iter()
        .take(index)
        .filter(|line| is_fence_marker(line.as_ref()))
        .count();
    markers % 2 == 1
}

/// Check whether a byte offset into `text` falls inside a fence, by counting
/// raw ``` occurrences in the text before it.
pub fn offset_in_code_block(text: &str, offset: usize) -> bool {
    let mut end = offset.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].matches(FENCE_MARKER).count() % 2 == 1
}

/// Prefix count of fence markers for one line array.
///
/// Built once per pass; answers the same question as [`is_in_code_block`]
/// for any index in O(1).
#[derive(Debug, Clone)]
pub struct FenceIndex {
    /// `before[i]` = number of fence markers in `lines[..i]`
    before: Vec<usize>,
    /// Whether `lines[i]` is itself a marker line
    marker: Vec<bool>,
}

impl FenceIndex {
    /// Build the prefix counts for a line array.
    pub fn new<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut before = Vec::with_capacity(lines.len() + 1);
        let mut marker = Vec::with_capacity(lines.len());
        let mut count = 0;

        for line in lines {
            before.push(count);
            let is_marker = is_fence_marker(line.as_ref());
            if is_marker {
                count += 1;
            }
            marker.push(is_marker);
        }
        before.push(count);

        Self { before, marker }
    }

    /// Same answer as [`is_in_code_block`] for the indexed lines.
    pub fn is_inside(&self, index: usize) -> bool {
        let idx = index.min(self.before.len() - 1);
        self.before[idx] % 2 == 1
    }

    /// Inside a fence, or a fence marker line itself.
    ///
    /// Heuristic passes skip protected lines so that neither fence content
    /// nor the info string on an opening marker is ever rewritten.
    pub fn is_protected(&self, index: usize) -> bool {
        self.is_inside(index) || self.marker.get(index).copied().unwrap_or(false)
    }

    /// Total number of fence markers seen.
    pub fn marker_count(&self) -> usize {
        self.before.last().copied().unwrap_or(0)
    }

    /// True when the markers are unbalanced (an unclosed fence remains).
    pub fn is_unbalanced(&self) -> bool {
        self.marker_count() % 2 == 1
    }
}
