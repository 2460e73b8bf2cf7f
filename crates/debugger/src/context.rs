use backend::{BackendVariable, ContextKind, ResumeMode, ResumeState};

/// Local mirror of one script context of the debug server.
///
/// `running` is what makes pause detection edge-triggered: a `Paused` report
/// only counts while the context is believed to be running, and observing it
/// flips `running` off until the next resume.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    kind: ContextKind,
    pub resume_mode: ResumeMode,
    pub running: bool,
    pub file: String,
    pub line: i64,
    pub traceback: String,
    pub global_variables: Vec<BackendVariable>,
    pub local_variables: Vec<BackendVariable>,
    pub upvalue_variables: Vec<BackendVariable>,
    resume_epoch: u64,
}

impl ExecutionContext {
    pub fn new(kind: ContextKind) -> Self {
        Self {
            kind,
            resume_mode: ResumeMode::Resume,
            running: false,
            file: String::new(),
            line: 0,
            traceback: String::new(),
            global_variables: Vec::new(),
            local_variables: Vec::new(),
            upvalue_variables: Vec::new(),
            resume_epoch: 0,
        }
    }

    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    pub fn thread_id(&self) -> i64 {
        self.kind.thread_id()
    }

    /// Changes on every resume. A poll records it before querying the
    /// backend so a reply that raced a resume can be told apart.
    pub fn epoch(&self) -> u64 {
        self.resume_epoch
    }

    /// The backend acknowledged (or was asked for) a new resume mode.
    pub fn mark_running(&mut self, mode: ResumeMode) {
        self.resume_mode = mode;
        self.running = true;
        self.resume_epoch += 1;
    }

    /// Apply a polled state. Returns true exactly when this is a new pause
    /// that must be reported to the editor.
    pub fn observe(&mut self, state: ResumeState, polled_at_epoch: u64) -> bool {
        if polled_at_epoch != self.resume_epoch {
            tracing::trace!(context = %self.kind, "discarding state polled before a resume");
            return false;
        }

        self.resume_mode = state.resume_mode;
        if !state.paused() || !self.running {
            return false;
        }

        self.file = state.current_file;
        self.line = state.current_line;
        self.traceback = state.traceback;
        self.global_variables = state.global_variables;
        self.running = false;
        tracing::debug!(context = %self.kind, file = %self.file, line = self.line, "paused");
        true
    }
}
