// Document buffer: line-based text storage with whole-line editing operations.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use redraft_diff::split_lines;

pub struct Buffer {
    pub lines: Vec<String>,
    pub file_path: Option<PathBuf>,
    /// Snapshot of the content at the last save (or load) point.
    /// Used for content-based dirty tracking.
    saved_content: Vec<String>,
    /// Whether the loaded text ended with a newline; preserved on save.
    trailing_newline: bool,
}

impl Buffer {
    pub fn new() -> Self {
        Self {
            lines: Vec::new(),
            file_path: None,
            saved_content: Vec::new(),
            trailing_newline: false,
        }
    }

    pub fn from_text(text: &str) -> Self {
        let lines: Vec<String> = split_lines(text).into_iter().map(String::from).collect();
        Self {
            saved_content: lines.clone(),
            lines,
            file_path: None,
            trailing_newline: text.ends_with('\n'),
        }
    }

    pub fn from_file(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut buffer = Self::from_text(&content);
        buffer.file_path = Some(path.to_path_buf());
        Ok(buffer)
    }

    pub fn save(&mut self) -> io::Result<()> {
        let path = self
            .file_path
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "No file path set"))?;
        fs::write(path, self.text())?;
        self.mark_saved();
        Ok(())
    }

    /// Treat the current content as persisted without touching disk.
    pub fn mark_saved(&mut self) {
        self.saved_content = self.lines.clone();
    }

    /// Full document text, with the original trailing newline restored.
    pub fn text(&self) -> String {
        let mut text = self.lines.join("\n");
        if self.trailing_newline && !self.lines.is_empty() {
            text.push('\n');
        }
        text
    }

    pub fn line(&self, idx: usize) -> Option<&str> {
        self.lines.get(idx).map(|s| s.as_str())
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Insert `text` so it becomes line `idx`. `idx == line_count()` appends.
    /// Returns false when `idx` is past the end.
    pub fn insert_line(&mut self, idx: usize, text: &str) -> bool {
        if idx > self.lines.len() {
            return false;
        }
        self.lines.insert(idx, text.to_string());
        true
    }

    pub fn delete_line(&mut self, idx: usize) -> Option<String> {
        if idx >= self.lines.len() {
            return None;
        }
        let removed = self.lines.remove(idx);
        Some(removed)
    }

    /// Replace the content of line `idx`, returning the previous content.
    pub fn replace_line(&mut self, idx: usize, text: &str) -> Option<String> {
        let line = self.lines.get_mut(idx)?;
        let previous = std::mem::replace(line, text.to_string());
        Some(previous)
    }

    pub fn is_modified(&self) -> bool {
        self.lines != self.saved_content
    }

    /// Whether `text()` ends with a newline. Set explicitly when the buffer
    /// started empty and its first content comes from elsewhere.
    pub fn set_trailing_newline(&mut self, trailing_newline: bool) {
        self.trailing_newline = trailing_newline;
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_empty() {
        let buf = Buffer::new();
        assert_eq!(buf.line_count(), 0);
        assert_eq!(buf.line(0), None);
        assert_eq!(buf.text(), "");
    }

    #[test]
    fn from_text_splits_lines() {
        let buf = Buffer::from_text("a\nb\nc");
        assert_eq!(buf.line_count(), 3);
        assert_eq!(buf.line(1), Some("b"));
        assert!(!buf.is_modified());
    }

    #[test]
    fn text_keeps_trailing_newline() {
        let buf = Buffer::from_text("a\nb\n");
        assert_eq!(buf.line_count(), 2);
        assert_eq!(buf.text(), "a\nb\n");
    }

    #[test]
    fn insert_and_delete_lines() {
        let mut buf = Buffer::from_text("a\nc");
        assert!(buf.insert_line(1, "b"));
        assert!(buf.insert_line(3, "d"));
        assert!(!buf.insert_line(9, "z"));
        assert_eq!(buf.text(), "a\nb\nc\nd");
        assert_eq!(buf.delete_line(0), Some("a".to_string()));
        assert_eq!(buf.delete_line(7), None);
        assert_eq!(buf.text(), "b\nc\nd");
        assert!(buf.is_modified());
    }

    #[test]
    fn replace_line_returns_previous() {
        let mut buf = Buffer::from_text("a\nb");
        assert_eq!(buf.replace_line(1, "B"), Some("b".to_string()));
        assert_eq!(buf.replace_line(2, "C"), None);
        assert_eq!(buf.text(), "a\nB");
    }

    #[test]
    fn insert_then_delete_not_modified() {
        let mut buf = Buffer::from_text("a");
        buf.insert_line(0, "x");
        assert!(buf.is_modified());
        buf.delete_line(0);
        assert!(!buf.is_modified()); // content matches original
    }

    #[test]
    fn save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        std::fs::write(&path, "one\ntwo\n").unwrap();

        let mut buf = Buffer::from_file(&path).unwrap();
        assert_eq!(buf.line_count(), 2);
        buf.replace_line(1, "2");
        assert!(buf.is_modified());
        buf.save().unwrap();
        assert!(!buf.is_modified());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\n2\n");
    }

    #[test]
    fn trailing_newline_can_be_set() {
        let mut buf = Buffer::new();
        buf.set_trailing_newline(true);
        assert_eq!(buf.text(), "");
        buf.insert_line(0, "x");
        assert_eq!(buf.text(), "x\n");
    }

    #[test]
    fn save_without_path_fails() {
        let mut buf = Buffer::from_text("a");
        assert!(buf.save().is_err());
    }
}
