// Session registry: at most one diff session per file, and the entry points the
// command layer drives (request, tick, resolve, cancel).

use std::collections::HashMap;
use std::time::Instant;

use redraft_core::{DiffLine, DocumentChange, EditorSurface, FileId, Hunk};
use redraft_diff::diff_lines;

use crate::config::RegistryConfig;
use crate::error::PatchError;
use crate::session::{DiffSession, SessionState, StreamOptions, StreamPoll};

#[derive(Debug)]
pub enum SessionEvent {
    /// A session finished streaming and moved to `state`.
    StreamFinished { file: FileId, state: SessionState },
    /// The surface rejected an edit; the session was dropped without rollback.
    StreamFailed { file: FileId, error: PatchError },
}

#[derive(Debug, Default)]
pub struct TickOutcome {
    pub events: Vec<SessionEvent>,
    /// Earliest instant a paced session wants to be polled again.
    pub next_deadline: Option<Instant>,
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<FileId, DiffSession>,
    /// Edit scripts of sessions that ran to completion, by file.
    finished: HashMap<FileId, Vec<DiffLine>>,
    config: RegistryConfig,
}

impl SessionRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            finished: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // ── Creation ──

    /// Diff `old_text` against `new_text` and stream the result into `file`.
    ///
    /// Returns `Ok(false)` when `file` is not open; the request is then a no-op.
    /// Instant patches are fully applied before this returns; paced ones advance
    /// on [`tick`](Self::tick).
    pub fn request_patch(
        &mut self,
        surface: &mut dyn EditorSurface,
        file: &FileId,
        old_text: &str,
        new_text: &str,
        instant: bool,
    ) -> Result<bool, PatchError> {
        let lines = diff_lines(old_text, new_text);
        self.request_patch_lines(surface, file, lines, 0, instant)
    }

    /// Stream a precomputed edit script into `file`, starting at `start_line`.
    /// An existing session for `file` is discarded first.
    pub fn request_patch_lines(
        &mut self,
        surface: &mut dyn EditorSurface,
        file: &FileId,
        lines: Vec<DiffLine>,
        start_line: usize,
        instant: bool,
    ) -> Result<bool, PatchError> {
        if let Some(mut previous) = self.sessions.remove(file) {
            log::debug!("discarding pending patch for {}", file);
            previous.clear(surface, false);
        }

        let options = StreamOptions {
            instant,
            line_delay: self.config.line_delay(),
            start_line,
        };
        let session = match DiffSession::start(surface, file.clone(), lines, options) {
            Ok(session) => session,
            Err(PatchError::NoDocument(file)) => {
                log::warn!("cannot apply patch: {} is not open", file);
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        self.sessions.insert(file.clone(), session);

        if instant {
            self.poll_session(surface, file, Instant::now())?;
        }
        Ok(true)
    }

    // ── Streaming ──

    /// Advance every streaming session that is due at `now`.
    pub fn tick(&mut self, surface: &mut dyn EditorSurface, now: Instant) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        let streaming: Vec<FileId> = self
            .sessions
            .iter()
            .filter(|(_, s)| s.state() == SessionState::Streaming)
            .map(|(file, _)| file.clone())
            .collect();

        for file in streaming {
            match self.poll_session(surface, &file, now) {
                Ok(Some(StreamPoll::Pending { next_at })) => {
                    outcome.next_deadline =
                        Some(outcome.next_deadline.map_or(next_at, |d| d.min(next_at)));
                }
                Ok(Some(StreamPoll::Finished(state))) => {
                    outcome.events.push(SessionEvent::StreamFinished { file, state });
                }
                Ok(None) => {}
                Err(error) => {
                    outcome.events.push(SessionEvent::StreamFailed { file, error });
                }
            }
        }
        outcome
    }

    fn poll_session(
        &mut self,
        surface: &mut dyn EditorSurface,
        file: &FileId,
        now: Instant,
    ) -> Result<Option<StreamPoll>, PatchError> {
        let Some(session) = self.sessions.get_mut(file) else {
            return Ok(None);
        };
        match session.poll(surface, now) {
            Ok(poll) => {
                self.retire_if_closed(file);
                Ok(Some(poll))
            }
            Err(e) => {
                self.sessions.remove(file);
                Err(e)
            }
        }
    }

    /// Stop streaming new lines into `file` and keep what was applied.
    pub fn stop_streaming(
        &mut self,
        surface: &mut dyn EditorSurface,
        file: &FileId,
    ) -> Option<SessionState> {
        let state = self.sessions.get_mut(file)?.stop_streaming(surface);
        self.retire_if_closed(file);
        Some(state)
    }

    // ── Concurrent user edits ──

    /// Drain every session's change subscription and shift hunks accordingly.
    /// Returns the number of changes applied.
    pub fn poll_user_edits(&mut self, surface: &mut dyn EditorSurface) -> usize {
        let mut total = 0;
        for session in self.sessions.values_mut() {
            let applied = session.sync_user_edits();
            if applied > 0 {
                session.refresh(surface);
                total += applied;
            }
        }
        total
    }

    /// Report a user edit in `file`: hunks at or after `changed_line_start` move
    /// by `line_delta`. Returns false unless `file` has a session awaiting review.
    ///
    /// Surfaces that also deliver the edit through the session's subscription
    /// may call this as their change callback: the queued copy is consumed, so
    /// the edit is applied once. An edit already taken by
    /// [`poll_user_edits`](Self::poll_user_edits) must not be reported again.
    pub fn on_user_edit(
        &mut self,
        surface: &mut dyn EditorSurface,
        file: &FileId,
        changed_line_start: usize,
        line_delta: isize,
    ) -> bool {
        let Some(session) = self.sessions.get_mut(file) else {
            return false;
        };
        if session.state() != SessionState::AwaitingReview {
            return false;
        }
        session.record_user_edit(DocumentChange { start_line: changed_line_start, line_delta });
        session.refresh(surface);
        true
    }

    // ── Resolution ──

    /// Accept or reject hunk `index` of `file`. An invalid index is a no-op.
    pub fn resolve_hunk(
        &mut self,
        surface: &mut dyn EditorSurface,
        file: &FileId,
        index: usize,
        accept: bool,
    ) -> Result<bool, PatchError> {
        let Some(session) = self.sessions.get_mut(file) else {
            return Ok(false);
        };
        match session.resolve_hunk(surface, index, accept) {
            Ok(resolved) => {
                self.retire_if_closed(file);
                Ok(resolved)
            }
            Err(e) => {
                self.sessions.remove(file);
                Err(e)
            }
        }
    }

    /// Accept or reject every remaining hunk of `file`, close its session and
    /// persist the document.
    pub fn resolve_all(
        &mut self,
        surface: &mut dyn EditorSurface,
        file: &FileId,
        accept: bool,
    ) -> Result<bool, PatchError> {
        let Some(session) = self.sessions.get_mut(file) else {
            return Ok(false);
        };
        if let Err(e) = session.resolve_all(surface, accept) {
            self.sessions.remove(file);
            return Err(e);
        }
        // Auto-closed sessions have nothing left; either way the session ends here.
        session.clear(surface, true);
        self.retire_if_closed(file);

        if self.config.persist_on_resolve_all {
            surface
                .persist(file)
                .map_err(|source| PatchError::Persist { file: file.clone(), source })?;
        }
        Ok(true)
    }

    /// Discard the pending patch for `file`, restoring its original content.
    pub fn cancel(&mut self, surface: &mut dyn EditorSurface, file: &FileId) {
        self.clear(surface, file, false);
    }

    /// Close the session for `file` from any state. Returns false if there was none.
    pub fn clear(&mut self, surface: &mut dyn EditorSurface, file: &FileId, accept: bool) -> bool {
        match self.sessions.remove(file) {
            Some(mut session) => {
                session.clear(surface, accept);
                true
            }
            None => false,
        }
    }

    /// Move a closed session's script to the finished log.
    fn retire_if_closed(&mut self, file: &FileId) {
        let closed = self
            .sessions
            .get(file)
            .is_some_and(|s| s.state() == SessionState::Closed);
        if closed {
            if let Some(session) = self.sessions.remove(file) {
                self.finished.insert(file.clone(), session.into_diff_lines());
            }
        }
    }

    // ── Views ──

    /// Pending hunks of `file`, for rendering. Empty when there is no session.
    pub fn hunks(&self, file: &FileId) -> Vec<Hunk> {
        self.sessions.get(file).map(DiffSession::hunks).unwrap_or_default()
    }

    pub fn state(&self, file: &FileId) -> Option<SessionState> {
        self.sessions.get(file).map(DiffSession::state)
    }

    pub fn session(&self, file: &FileId) -> Option<&DiffSession> {
        self.sessions.get(file)
    }

    pub fn diff_lines(&self, file: &FileId) -> Option<&[DiffLine]> {
        self.sessions.get(file).map(DiffSession::diff_lines)
    }

    pub fn is_streaming(&self, file: &FileId) -> bool {
        self.state(file) == Some(SessionState::Streaming)
    }

    pub fn active_files(&self) -> Vec<FileId> {
        let mut files: Vec<FileId> = self.sessions.keys().cloned().collect();
        files.sort();
        files
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Script of the last session for `file` that ran to completion
    /// (auto-closed, or every hunk resolved).
    pub fn take_finished_diff(&mut self, file: &FileId) -> Option<Vec<DiffLine>> {
        self.finished.remove(file)
    }
}
