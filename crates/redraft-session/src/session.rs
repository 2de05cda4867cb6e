// Diff session: streams one edit script into one document and tracks its hunks
// until every hunk is accepted or rejected.

use std::time::{Duration, Instant};

use redraft_core::{
    Decoration, DiffLine, DocumentChange, EditorSurface, FileId, Hunk, LineEdit, LineKind,
    Subscription, SurfaceError,
};
use redraft_diff::{segment_blocks, HunkBlock};
use serde::{Deserialize, Serialize};

use crate::error::PatchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// Lines are still being applied to the document.
    Streaming,
    /// Streaming finished; hunks wait for accept/reject.
    AwaitingReview,
    /// Nothing pending. A closed session never reopens.
    Closed,
}

#[derive(Debug, Clone, Copy)]
pub struct StreamOptions {
    /// Apply the whole script in one poll.
    pub instant: bool,
    /// Pause between two mutating lines when not instant.
    pub line_delay: Duration,
    /// Document line where the script begins.
    pub start_line: usize,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            instant: true,
            line_delay: Duration::ZERO,
            start_line: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPoll {
    /// More lines remain; poll again at `next_at`.
    Pending { next_at: Instant },
    /// Streaming is over and the session moved to this state.
    Finished(SessionState),
}

pub struct DiffSession {
    file: FileId,
    state: SessionState,
    options: StreamOptions,
    lines: Vec<DiffLine>,
    /// Number of script lines applied so far.
    applied: usize,
    /// Document line the next script line applies to.
    cursor: usize,
    next_at: Option<Instant>,
    /// Pending hunks, sorted by start line. Empty while streaming.
    blocks: Vec<HunkBlock>,
    /// Held only while awaiting review.
    subscription: Option<Subscription>,
    mismatches: usize,
}

impl std::fmt::Debug for DiffSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiffSession")
            .field("file", &self.file)
            .field("state", &self.state)
            .field("applied", &self.applied)
            .field("total", &self.lines.len())
            .field("hunks", &self.blocks.len())
            .field("subscribed", &self.subscription.is_some())
            .finish()
    }
}

impl DiffSession {
    /// Create a session in `Streaming` state. No line is applied until the first poll.
    pub fn start(
        surface: &dyn EditorSurface,
        file: FileId,
        lines: Vec<DiffLine>,
        options: StreamOptions,
    ) -> Result<Self, PatchError> {
        let line_count = surface
            .line_count(&file)
            .ok_or_else(|| PatchError::NoDocument(file.clone()))?;
        if options.start_line > line_count {
            return Err(SurfaceError::LineOutOfRange {
                file,
                line: options.start_line,
                line_count,
            }
            .into());
        }
        log::debug!(
            "session for {}: streaming {} lines from line {} (instant: {})",
            file,
            lines.len(),
            options.start_line,
            options.instant
        );
        Ok(Self {
            file,
            state: SessionState::Streaming,
            cursor: options.start_line,
            options,
            lines,
            applied: 0,
            next_at: None,
            blocks: Vec::new(),
            subscription: None,
            mismatches: 0,
        })
    }

    pub fn file(&self) -> &FileId {
        &self.file
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_instant(&self) -> bool {
        self.options.instant
    }

    /// The edit script as applied. Removed lines carry the text that was
    /// actually deleted from the document.
    pub fn diff_lines(&self) -> &[DiffLine] {
        &self.lines
    }

    pub fn into_diff_lines(self) -> Vec<DiffLine> {
        self.lines
    }

    pub fn applied_lines(&self) -> usize {
        self.applied
    }

    pub fn hunks(&self) -> Vec<Hunk> {
        self.blocks.iter().map(|b| b.hunk).collect()
    }

    pub fn blocks(&self) -> &[HunkBlock] {
        &self.blocks
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            SessionState::Streaming => self.next_at,
            _ => None,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    // ── Streaming ──

    /// Apply the lines that are due at `now`.
    ///
    /// Instant sessions apply everything. Paced sessions apply at most one
    /// mutating line per call and report when the next one is due. Unchanged
    /// lines are consumed without pacing.
    pub fn poll(
        &mut self,
        surface: &mut dyn EditorSurface,
        now: Instant,
    ) -> Result<StreamPoll, PatchError> {
        if self.state != SessionState::Streaming {
            return Ok(StreamPoll::Finished(self.state));
        }
        if !self.options.instant {
            if let Some(at) = self.next_at {
                if now < at {
                    return Ok(StreamPoll::Pending { next_at: at });
                }
            }
        }

        if let Err(e) = self.apply_due(surface, now) {
            log::warn!("aborting patch for {}: {}", self.file, e);
            self.abort(surface);
            return Err(e.into());
        }

        if self.applied == self.lines.len() {
            self.finish(surface);
            return Ok(StreamPoll::Finished(self.state));
        }
        self.render(surface);
        let next_at = self.next_at.unwrap_or(now);
        Ok(StreamPoll::Pending { next_at })
    }

    fn apply_due(
        &mut self,
        surface: &mut dyn EditorSurface,
        now: Instant,
    ) -> Result<(), SurfaceError> {
        while self.applied < self.lines.len() {
            let kind = self.lines[self.applied].kind;
            match kind {
                LineKind::Unchanged => {
                    self.check_line(surface);
                    self.cursor += 1;
                }
                LineKind::Removed => {
                    // Keep the text actually deleted; a reject puts that back.
                    if let Some(actual) = self.check_line(surface) {
                        self.lines[self.applied].text = actual;
                    }
                    surface.apply_line_edit(&self.file, LineEdit::Delete { line: self.cursor })?;
                }
                LineKind::Added => {
                    let text = self.lines[self.applied].text.clone();
                    surface.apply_line_edit(&self.file, LineEdit::Insert { line: self.cursor, text })?;
                    self.cursor += 1;
                }
            }
            self.applied += 1;
            if kind != LineKind::Unchanged && !self.options.instant {
                self.next_at = Some(now + self.options.line_delay);
                break;
            }
        }
        Ok(())
    }

    /// Compare the document line at the cursor with the script. On a mismatch,
    /// count it and return the document's text.
    fn check_line(&mut self, surface: &dyn EditorSurface) -> Option<String> {
        let actual = surface.read_line(&self.file, self.cursor);
        if actual.as_deref() == Some(self.lines[self.applied].text.as_str()) {
            return None;
        }
        self.mismatches += 1;
        actual
    }

    /// Stop applying new lines and settle on what has been applied so far.
    pub fn stop_streaming(&mut self, surface: &mut dyn EditorSurface) -> SessionState {
        if self.state == SessionState::Streaming {
            log::debug!(
                "stopping stream for {} after {}/{} lines",
                self.file,
                self.applied,
                self.lines.len()
            );
            self.lines.truncate(self.applied);
            self.finish(surface);
        }
        self.state
    }

    fn finish(&mut self, surface: &mut dyn EditorSurface) {
        if self.mismatches > 0 {
            log::warn!(
                "{}: {} lines did not match the document while streaming",
                self.file,
                self.mismatches
            );
        }
        self.next_at = None;
        self.blocks = segment_blocks(&self.lines, self.options.start_line);
        if self.blocks.iter().any(|b| b.hunk.replaces_content()) {
            self.state = SessionState::AwaitingReview;
            self.subscription = surface.subscribe(&self.file);
            self.render(surface);
            log::debug!("{} awaiting review of {} hunks", self.file, self.blocks.len());
        } else {
            log::debug!("{} closed: nothing replaced, no review needed", self.file);
            self.close(surface);
        }
    }

    /// Surface mutation failed: close without rolling back.
    fn abort(&mut self, surface: &mut dyn EditorSurface) {
        self.next_at = None;
        self.close(surface);
    }

    fn close(&mut self, surface: &mut dyn EditorSurface) {
        self.state = SessionState::Closed;
        self.blocks.clear();
        self.subscription = None;
        surface.clear_decorations(&self.file);
    }

    // ── Decorations ──

    fn render(&self, surface: &mut dyn EditorSurface) {
        let streaming;
        let blocks = if self.state == SessionState::Streaming {
            streaming = segment_blocks(&self.lines[..self.applied], self.options.start_line);
            &streaming
        } else {
            &self.blocks
        };
        let mut decorations = Vec::with_capacity(blocks.len() * 2);
        for block in blocks {
            if !block.removed.is_empty() {
                decorations.push(Decoration::Removed {
                    before_line: block.hunk.start_line,
                    text: block.removed.clone(),
                });
            }
            if block.hunk.added_count > 0 {
                decorations.push(Decoration::Added { lines: block.hunk.document_lines() });
            }
        }
        surface.decorate(&self.file, &decorations);
    }

    // ── Concurrent user edits ──

    /// Apply every queued document change to the hunk offsets.
    /// Returns how many changes were applied.
    pub fn sync_user_edits(&mut self) -> usize {
        let changes = match &self.subscription {
            Some(sub) => sub.drain(),
            None => return 0,
        };
        for change in &changes {
            self.shift(change.start_line, change.line_delta);
        }
        changes.len()
    }

    /// Apply a change the host reports directly. If the same change is still
    /// queued on the subscription it is consumed there, so the edit counts once.
    pub fn record_user_edit(&mut self, change: DocumentChange) {
        let mut reported = Some(change);
        let queued = match &self.subscription {
            Some(sub) => sub.drain(),
            None => Vec::new(),
        };
        for queued in queued {
            if reported == Some(queued) {
                reported = None;
            }
            self.shift(queued.start_line, queued.line_delta);
        }
        if let Some(change) = reported {
            self.shift(change.start_line, change.line_delta);
        }
    }

    /// Move every hunk starting at or after `changed_line_start` by `line_delta`.
    /// Edits inside a hunk are not detected.
    pub fn shift(&mut self, changed_line_start: usize, line_delta: isize) {
        if line_delta == 0 {
            return;
        }
        for block in &mut self.blocks {
            if block.hunk.start_line >= changed_line_start {
                block.hunk.start_line = block.hunk.start_line.saturating_add_signed(line_delta);
            }
        }
    }

    /// Re-render after offsets changed outside a resolve.
    pub fn refresh(&self, surface: &mut dyn EditorSurface) {
        if self.state != SessionState::Closed {
            self.render(surface);
        }
    }

    // ── Resolution ──

    /// Accept or reject one hunk. Returns false when there is nothing to resolve
    /// at `index`.
    pub fn resolve_hunk(
        &mut self,
        surface: &mut dyn EditorSurface,
        index: usize,
        accept: bool,
    ) -> Result<bool, PatchError> {
        if self.state != SessionState::AwaitingReview {
            return Ok(false);
        }
        self.sync_user_edits();
        if index >= self.blocks.len() {
            log::debug!("{}: no hunk at index {}", self.file, index);
            return Ok(false);
        }

        let block = self.blocks.remove(index);
        if !accept {
            // Our own edits must not come back as user edits.
            self.subscription = None;
            if let Err(e) = revert_block(surface, &self.file, &block) {
                log::error!("failed to reject hunk in {}: {}", self.file, e);
                self.close(surface);
                return Err(e.into());
            }
            let delta = block.hunk.reject_delta();
            for later in &mut self.blocks[index..] {
                later.hunk.start_line = later.hunk.start_line.saturating_add_signed(delta);
            }
        }

        if self.blocks.is_empty() {
            log::debug!("{}: last hunk resolved", self.file);
            self.close(surface);
        } else {
            if self.subscription.is_none() {
                self.subscription = surface.subscribe(&self.file);
            }
            self.render(surface);
        }
        Ok(true)
    }

    /// Accept or reject every remaining hunk, in document order.
    ///
    /// A session still streaming first applies the rest of its script, so
    /// accepting yields the full new text and rejecting the original text.
    pub fn resolve_all(
        &mut self,
        surface: &mut dyn EditorSurface,
        accept: bool,
    ) -> Result<bool, PatchError> {
        if self.state == SessionState::Streaming {
            self.options.instant = true;
            self.poll(surface, Instant::now())?;
        }
        if self.state != SessionState::AwaitingReview {
            return Ok(false);
        }
        while !self.blocks.is_empty() {
            self.resolve_hunk(surface, 0, accept)?;
        }
        Ok(true)
    }

    /// Close the session from any state.
    ///
    /// `accept = true` keeps the document as it is; `accept = false` strips every
    /// added line and restores every removed line that is still pending (or, while
    /// streaming, that has been applied so far). Safe to call on a closed session.
    pub fn clear(&mut self, surface: &mut dyn EditorSurface, accept: bool) {
        if self.state == SessionState::Closed {
            return;
        }
        self.sync_user_edits();
        self.subscription = None;

        let blocks = match self.state {
            SessionState::Streaming => {
                segment_blocks(&self.lines[..self.applied], self.options.start_line)
            }
            _ => std::mem::take(&mut self.blocks),
        };
        if !accept {
            // Later blocks first so earlier offsets stay valid.
            for block in blocks.iter().rev() {
                if let Err(e) = revert_block(surface, &self.file, block) {
                    log::error!("failed to revert {}: {}", self.file, e);
                    break;
                }
            }
        }
        log::debug!("{} cleared (accept: {})", self.file, accept);
        self.next_at = None;
        self.close(surface);
    }
}

/// Strip a block's added lines and put its removed lines back.
fn revert_block(
    surface: &mut dyn EditorSurface,
    file: &FileId,
    block: &HunkBlock,
) -> Result<(), SurfaceError> {
    let line_count = surface
        .line_count(file)
        .ok_or_else(|| SurfaceError::DocumentClosed(file.clone()))?;
    let start = block.hunk.start_line.min(line_count);
    let available = line_count - start;
    let strip = block.hunk.added_count.min(available);
    if strip < block.hunk.added_count || start < block.hunk.start_line {
        log::warn!(
            "{}: hunk at line {} extends past the document ({} lines); clamping",
            file,
            block.hunk.start_line,
            line_count
        );
    }

    for expected in block.added.iter().take(strip) {
        if surface.read_line(file, start).as_deref() != Some(expected.as_str()) {
            log::debug!("{}: line {} was edited since the patch was applied", file, start);
        }
        surface.apply_line_edit(file, LineEdit::Delete { line: start })?;
    }
    for (i, text) in block.removed.iter().enumerate() {
        surface.apply_line_edit(file, LineEdit::Insert { line: start + i, text: text.clone() })?;
    }
    Ok(())
}
