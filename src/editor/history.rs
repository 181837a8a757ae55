//! Undo/redo over full-buffer snapshots.

/// Caller-owned history of buffer snapshots.
///
/// The formatting functions never see this; the caller records the buffer
/// after each edit and walks back and forth through the snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    snapshots: Vec<String>,
    cursor: usize,
}

impl History {
    /// Start a history whose only snapshot is `initial`.
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            snapshots: vec![initial.into()],
            cursor: 0,
        }
    }

    /// The snapshot currently shown.
    pub fn current(&self) -> &str {
        &self.snapshots[self.cursor]
    }

    /// Record a new snapshot after the current one.
    ///
    /// Identical text is ignored. Recording after an undo discards the
    /// snapshots that could have been redone.
    pub fn record(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text == self.current() {
            return;
        }
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(text);
        self.cursor += 1;
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// Step back one snapshot.
    pub fn undo(&mut self) -> Option<&str> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        Some(self.current())
    }

    /// Step forward one snapshot.
    pub fn redo(&mut self) -> Option<&str> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(self.current())
    }

    /// Number of snapshots held.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Always false: a history holds at least its initial snapshot.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
