use std::fmt;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use serde::{Deserialize, Serialize};

// ──────────────────────────────────────────────
// Identity
// ──────────────────────────────────────────────

/// Identity of a document: the path it was opened from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileId(PathBuf);

impl FileId {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl From<&str> for FileId {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<PathBuf> for FileId {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

impl From<&Path> for FileId {
    fn from(path: &Path) -> Self {
        Self::new(path)
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

// ──────────────────────────────────────────────
// Diff lines
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    Added,
    Removed,
    Unchanged,
}

/// One entry of a line-level edit script. `text` never includes the line terminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub kind: LineKind,
    pub text: String,
}

impl DiffLine {
    pub fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self { kind, text: text.into() }
    }

    pub fn added(text: impl Into<String>) -> Self {
        Self::new(LineKind::Added, text)
    }

    pub fn removed(text: impl Into<String>) -> Self {
        Self::new(LineKind::Removed, text)
    }

    pub fn unchanged(text: impl Into<String>) -> Self {
        Self::new(LineKind::Unchanged, text)
    }

    /// True for `Added` and `Removed` lines.
    pub fn is_change(&self) -> bool {
        self.kind != LineKind::Unchanged
    }
}

// ──────────────────────────────────────────────
// Hunks
// ──────────────────────────────────────────────

/// A contiguous block of changes, positioned by document line.
///
/// While pending, the document holds the hunk's added lines at
/// `start_line..start_line + added_count`. Removed lines are no longer in the
/// document; they are anchored at `start_line`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Hunk {
    pub start_line: usize,
    pub added_count: usize,
    pub removed_count: usize,
}

impl Hunk {
    pub fn new(start_line: usize, added_count: usize, removed_count: usize) -> Self {
        Self { start_line, added_count, removed_count }
    }

    /// First document line after the hunk's added lines.
    pub fn end_line(&self) -> usize {
        self.start_line + self.added_count
    }

    pub fn document_lines(&self) -> Range<usize> {
        self.start_line..self.end_line()
    }

    /// Whether the hunk replaces content that existed before the patch.
    pub fn replaces_content(&self) -> bool {
        self.removed_count > 0
    }

    /// Lines the document gains (or loses, when negative) if the hunk is rejected.
    pub fn reject_delta(&self) -> isize {
        self.removed_count as isize - self.added_count as isize
    }
}

// ──────────────────────────────────────────────
// Edits and decorations
// ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEdit {
    /// Insert `text` as a new line so that it becomes line `line`.
    Insert { line: usize, text: String },
    /// Delete line `line`.
    Delete { line: usize },
}

impl LineEdit {
    pub fn line(&self) -> usize {
        match self {
            LineEdit::Insert { line, .. } | LineEdit::Delete { line } => *line,
        }
    }

    pub fn line_delta(&self) -> isize {
        match self {
            LineEdit::Insert { .. } => 1,
            LineEdit::Delete { .. } => -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoration {
    /// Highlight document lines that the pending patch inserted.
    Added { lines: Range<usize> },
    /// Show lines the pending patch deleted, above document line `before_line`.
    Removed { before_line: usize, text: Vec<String> },
}

// ──────────────────────────────────────────────
// Change notifications
// ──────────────────────────────────────────────

/// A document mutation reported to subscribers, in lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentChange {
    pub start_line: usize,
    pub line_delta: isize,
}

/// Sending half of a change subscription, held by the editor surface.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    tx: mpsc::Sender<DocumentChange>,
}

impl ChangeNotifier {
    /// Deliver a change. Returns false once the subscription has been dropped,
    /// so the surface can forget this notifier.
    pub fn notify(&self, change: DocumentChange) -> bool {
        self.tx.send(change).is_ok()
    }
}

/// Receiving half of a change subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::Receiver<DocumentChange>,
}

impl Subscription {
    pub fn channel() -> (ChangeNotifier, Subscription) {
        let (tx, rx) = mpsc::channel();
        (ChangeNotifier { tx }, Subscription { rx })
    }

    /// Take every change queued since the last drain, oldest first.
    pub fn drain(&self) -> Vec<DocumentChange> {
        self.rx.try_iter().collect()
    }
}

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("no open document for {0}")]
    DocumentClosed(FileId),
    #[error("line {line} is out of range for {file} ({line_count} lines)")]
    LineOutOfRange {
        file: FileId,
        line: usize,
        line_count: usize,
    },
    #[error("failed to write {file}: {source}")]
    Io {
        file: FileId,
        #[source]
        source: io::Error,
    },
}

// ──────────────────────────────────────────────
// Trait: EditorSurface
// ──────────────────────────────────────────────

/// The host editing environment a patch is applied to.
/// The core reads and mutates documents only through this trait.
pub trait EditorSurface {
    /// Line count of the open document, or `None` when it is not open.
    fn line_count(&self, file: &FileId) -> Option<usize>;
    fn read_line(&self, file: &FileId, line: usize) -> Option<String>;
    fn apply_line_edit(&mut self, file: &FileId, edit: LineEdit) -> Result<(), SurfaceError>;
    /// Start receiving change notifications for `file`. `None` when it is not open.
    fn subscribe(&mut self, file: &FileId) -> Option<Subscription>;
    /// Replace every decoration shown for `file`.
    fn decorate(&mut self, file: &FileId, decorations: &[Decoration]);
    fn clear_decorations(&mut self, file: &FileId);
    /// Write the current document text to its backing store.
    fn persist(&mut self, file: &FileId) -> Result<(), SurfaceError>;

    fn is_open(&self, file: &FileId) -> bool {
        self.line_count(file).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hunk_spans_its_added_lines() {
        let hunk = Hunk::new(4, 3, 1);
        assert_eq!(hunk.document_lines(), 4..7);
        assert_eq!(hunk.reject_delta(), -2);
        assert!(hunk.replaces_content());
        assert!(!Hunk::new(0, 2, 0).replaces_content());
    }

    #[test]
    fn subscription_drains_in_order() {
        let (notifier, sub) = Subscription::channel();
        assert!(notifier.notify(DocumentChange { start_line: 1, line_delta: 2 }));
        assert!(notifier.notify(DocumentChange { start_line: 5, line_delta: -1 }));
        let changes = sub.drain();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].start_line, 1);
        assert_eq!(changes[1].line_delta, -1);
        assert!(sub.drain().is_empty());
    }

    #[test]
    fn dropped_subscription_rejects_notifications() {
        let (notifier, sub) = Subscription::channel();
        drop(sub);
        assert!(!notifier.notify(DocumentChange { start_line: 0, line_delta: 1 }));
    }

    #[test]
    fn line_edit_delta() {
        let insert = LineEdit::Insert { line: 3, text: "x".into() };
        assert_eq!(insert.line(), 3);
        assert_eq!(insert.line_delta(), 1);
        assert_eq!(LineEdit::Delete { line: 0 }.line_delta(), -1);
        assert!(DiffLine::removed("x").is_change());
        assert!(!DiffLine::unchanged("x").is_change());
    }
}
