// Workspace: the set of open buffers, exposed to the patch engine as an EditorSurface.

use std::collections::HashMap;
use std::io;
use std::path::Path;

use redraft_core::{
    ChangeNotifier, Decoration, DocumentChange, EditorSurface, FileId, LineEdit, Subscription,
    SurfaceError,
};

use crate::buffer::Buffer;

struct Document {
    buffer: Buffer,
    notifiers: Vec<ChangeNotifier>,
    decorations: Vec<Decoration>,
}

impl Document {
    fn new(buffer: Buffer) -> Self {
        Self {
            buffer,
            notifiers: Vec::new(),
            decorations: Vec::new(),
        }
    }

    /// Deliver a change to every live subscriber, forgetting dropped ones.
    fn notify(&mut self, change: DocumentChange) {
        self.notifiers.retain(|n| n.notify(change));
    }
}

pub struct Workspace {
    documents: HashMap<FileId, Document>,
    active: Option<FileId>,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            documents: HashMap::new(),
            active: None,
        }
    }

    /// Open a file from disk and make it the active document.
    pub fn open_file(&mut self, path: &Path) -> io::Result<FileId> {
        let buffer = Buffer::from_file(path)?;
        let file = FileId::from(path);
        self.insert(file.clone(), buffer);
        Ok(file)
    }

    /// Open an empty document bound to `path`, which need not exist yet.
    /// Persisting it creates the file.
    pub fn open_new(&mut self, path: &Path) -> FileId {
        let mut buffer = Buffer::new();
        buffer.file_path = Some(path.to_path_buf());
        let file = FileId::from(path);
        self.insert(file.clone(), buffer);
        file
    }

    /// Open an in-memory document and make it the active document.
    pub fn open_text(&mut self, file: impl Into<FileId>, text: &str) -> FileId {
        let file = file.into();
        self.insert(file.clone(), Buffer::from_text(text));
        file
    }

    fn insert(&mut self, file: FileId, buffer: Buffer) {
        log::debug!("opened {} ({} lines)", file, buffer.line_count());
        self.documents.insert(file.clone(), Document::new(buffer));
        self.active = Some(file);
    }

    /// Close a document. Its subscribers stop receiving changes.
    pub fn close(&mut self, file: &FileId) -> Option<Buffer> {
        if self.active.as_ref() == Some(file) {
            self.active = None;
        }
        self.documents.remove(file).map(|doc| doc.buffer)
    }

    pub fn set_active(&mut self, file: &FileId) -> bool {
        if self.documents.contains_key(file) {
            self.active = Some(file.clone());
            true
        } else {
            false
        }
    }

    pub fn active(&self) -> Option<&FileId> {
        self.active.as_ref()
    }

    pub fn buffer(&self, file: &FileId) -> Option<&Buffer> {
        self.documents.get(file).map(|doc| &doc.buffer)
    }

    /// Choose whether `file` is written with a final newline. Returns false
    /// when it is not open.
    pub fn set_trailing_newline(&mut self, file: &FileId, trailing_newline: bool) -> bool {
        match self.documents.get_mut(file) {
            Some(doc) => {
                doc.buffer.set_trailing_newline(trailing_newline);
                true
            }
            None => false,
        }
    }

    pub fn text(&self, file: &FileId) -> Option<String> {
        self.buffer(file).map(Buffer::text)
    }

    /// Decorations currently shown for `file`.
    pub fn decorations(&self, file: &FileId) -> &[Decoration] {
        self.documents
            .get(file)
            .map(|doc| doc.decorations.as_slice())
            .unwrap_or(&[])
    }

    pub fn subscriber_count(&self, file: &FileId) -> usize {
        self.documents.get(file).map_or(0, |doc| doc.notifiers.len())
    }

    // ── User edits ──

    /// Insert lines at `line` as a user would, notifying subscribers.
    pub fn insert_lines(
        &mut self,
        file: &FileId,
        line: usize,
        lines: &[&str],
    ) -> Result<(), SurfaceError> {
        let doc = self.document_mut(file)?;
        let line_count = doc.buffer.line_count();
        if line > line_count {
            return Err(SurfaceError::LineOutOfRange { file: file.clone(), line, line_count });
        }
        for (i, text) in lines.iter().enumerate() {
            doc.buffer.insert_line(line + i, text);
        }
        doc.notify(DocumentChange { start_line: line, line_delta: lines.len() as isize });
        Ok(())
    }

    /// Delete `count` lines starting at `line` as a user would, notifying subscribers.
    pub fn delete_lines(
        &mut self,
        file: &FileId,
        line: usize,
        count: usize,
    ) -> Result<(), SurfaceError> {
        let doc = self.document_mut(file)?;
        let line_count = doc.buffer.line_count();
        if line + count > line_count {
            return Err(SurfaceError::LineOutOfRange {
                file: file.clone(),
                line: line + count,
                line_count,
            });
        }
        for _ in 0..count {
            doc.buffer.delete_line(line);
        }
        doc.notify(DocumentChange { start_line: line, line_delta: -(count as isize) });
        Ok(())
    }

    /// Rewrite one line in place as a user would, notifying subscribers.
    pub fn replace_line(
        &mut self,
        file: &FileId,
        line: usize,
        text: &str,
    ) -> Result<(), SurfaceError> {
        let doc = self.document_mut(file)?;
        let line_count = doc.buffer.line_count();
        if doc.buffer.replace_line(line, text).is_none() {
            return Err(SurfaceError::LineOutOfRange { file: file.clone(), line, line_count });
        }
        doc.notify(DocumentChange { start_line: line, line_delta: 0 });
        Ok(())
    }

    fn document_mut(&mut self, file: &FileId) -> Result<&mut Document, SurfaceError> {
        self.documents
            .get_mut(file)
            .ok_or_else(|| SurfaceError::DocumentClosed(file.clone()))
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorSurface for Workspace {
    fn line_count(&self, file: &FileId) -> Option<usize> {
        self.buffer(file).map(Buffer::line_count)
    }

    fn read_line(&self, file: &FileId, line: usize) -> Option<String> {
        self.buffer(file)?.line(line).map(String::from)
    }

    fn apply_line_edit(&mut self, file: &FileId, edit: LineEdit) -> Result<(), SurfaceError> {
        let doc = self.document_mut(file)?;
        let line_count = doc.buffer.line_count();
        let line = edit.line();
        let applied = match &edit {
            LineEdit::Insert { line, text } => doc.buffer.insert_line(*line, text),
            LineEdit::Delete { line } => doc.buffer.delete_line(*line).is_some(),
        };
        if !applied {
            return Err(SurfaceError::LineOutOfRange { file: file.clone(), line, line_count });
        }
        doc.notify(DocumentChange { start_line: line, line_delta: edit.line_delta() });
        Ok(())
    }

    fn subscribe(&mut self, file: &FileId) -> Option<Subscription> {
        let doc = self.documents.get_mut(file)?;
        let (notifier, subscription) = Subscription::channel();
        doc.notifiers.push(notifier);
        Some(subscription)
    }

    fn decorate(&mut self, file: &FileId, decorations: &[Decoration]) {
        if let Some(doc) = self.documents.get_mut(file) {
            doc.decorations = decorations.to_vec();
        }
    }

    fn clear_decorations(&mut self, file: &FileId) {
        if let Some(doc) = self.documents.get_mut(file) {
            doc.decorations.clear();
        }
    }

    fn persist(&mut self, file: &FileId) -> Result<(), SurfaceError> {
        let doc = self.document_mut(file)?;
        if doc.buffer.file_path.is_none() {
            // In-memory document: nothing on disk to write.
            doc.buffer.mark_saved();
            return Ok(());
        }
        doc.buffer.save().map_err(|source| SurfaceError::Io { file: file.clone(), source })?;
        log::info!("saved {}", file);
        Ok(())
    }
}
