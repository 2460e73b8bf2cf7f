//! Scripted in-process [`Backend`] for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::wire::{
    BackendMessage, BackendVariable, BreakpointLocation, CommandResult, Info, PendingCommand,
    ResumeMode, ResumeState,
};
use crate::{Backend, ContextKind};

/// A call the adapter made, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    GetInfo,
    SetBreakpoints(Vec<BreakpointLocation>),
    SetResumeMode(ContextKind, ResumeMode),
    GetResumeMode(ContextKind),
    GetMessages,
    PushCommand(ContextKind, PendingCommand),
}

#[derive(Default)]
struct FakeState {
    offline: bool,
    info_failures: usize,
    contexts: HashMap<ContextKind, ResumeState>,
    messages: VecDeque<BackendMessage>,
    variables: HashMap<String, Vec<BackendVariable>>,
    command_result: CommandResult,
    calls: Vec<BackendCall>,
}

/// Behaves like a debug server whose scripts never run on their own: a
/// context only reports `Paused` after [`FakeBackend::pause`], and any
/// `set_resume_mode` overwrites the reported mode.
#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every call fails while offline.
    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    /// Fail the next `count` readiness probes.
    pub fn fail_info(&self, count: usize) {
        self.state().info_failures = count;
    }

    /// Report `context` as paused at `file:line`.
    pub fn pause(
        &self,
        context: ContextKind,
        file: &str,
        line: i64,
        traceback: &str,
        globals: Vec<BackendVariable>,
    ) {
        self.state().contexts.insert(
            context,
            ResumeState {
                resume_mode: ResumeMode::Paused,
                current_file: file.to_string(),
                current_line: line,
                traceback: traceback.to_string(),
                global_variables: globals,
                ..Default::default()
            },
        );
    }

    pub fn push_message(&self, message: BackendMessage) {
        self.state().messages.push_back(message);
    }

    /// Answer for `request_variable` commands whose key argument is `key`.
    pub fn set_variables(&self, key: &str, variables: Vec<BackendVariable>) {
        self.state().variables.insert(key.to_string(), variables);
    }

    pub fn set_command_result(&self, result: CommandResult) {
        self.state().command_result = result;
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.state().calls.clone()
    }

    pub fn count_calls(&self, pred: impl Fn(&BackendCall) -> bool) -> usize {
        self.state().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Record the call and report whether the backend is reachable.
    fn record(&self, call: BackendCall) -> Option<MutexGuard<'_, FakeState>> {
        let mut state = self.state();
        state.calls.push(call);
        if state.offline { None } else { Some(state) }
    }
}

impl Backend for FakeBackend {
    async fn get_info(&self) -> Option<Info> {
        let mut state = self.record(BackendCall::GetInfo)?;
        if state.info_failures > 0 {
            state.info_failures -= 1;
            return None;
        }
        Some(Info {
            resource_name: "fake".to_string(),
            resource_path: "fake/".to_string(),
        })
    }

    async fn set_breakpoints(&self, breakpoints: &[BreakpointLocation]) -> bool {
        self.record(BackendCall::SetBreakpoints(breakpoints.to_vec()))
            .is_some()
    }

    async fn set_resume_mode(&self, context: ContextKind, mode: ResumeMode) -> bool {
        let Some(mut state) = self.record(BackendCall::SetResumeMode(context, mode)) else {
            return false;
        };
        state.contexts.entry(context).or_default().resume_mode = mode;
        true
    }

    async fn get_resume_mode(&self, context: ContextKind) -> Option<ResumeState> {
        let state = self.record(BackendCall::GetResumeMode(context))?;
        Some(state.contexts.get(&context).cloned().unwrap_or_default())
    }

    async fn get_messages(&self) -> Option<Vec<BackendMessage>> {
        let mut state = self.record(BackendCall::GetMessages)?;
        Some(state.messages.drain(..).collect())
    }

    async fn request_variables(
        &self,
        context: ContextKind,
        command: &PendingCommand,
    ) -> Option<Vec<BackendVariable>> {
        let state = self.record(BackendCall::PushCommand(context, command.clone()))?;
        let key = command.args.get(1)?;
        Some(state.variables.get(key).cloned().unwrap_or_default())
    }

    async fn run_command(
        &self,
        context: ContextKind,
        command: &PendingCommand,
    ) -> Option<CommandResult> {
        let state = self.record(BackendCall::PushCommand(context, command.clone()))?;
        Some(state.command_result.clone())
    }
}
