//! Client side of the MTADebug HTTP API.
//!
//! The debug server only exposes a polling API: every call is a single HTTP
//! round trip returning JSON. A failed call (connection refused, non-200
//! status, unparseable body) carries no information, so every [`Backend`]
//! method reports it as `None` or `false` and leaves retrying to the caller.

use std::future::Future;

mod http;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod wire;

pub use http::HttpBackend;
pub use wire::{
    BackendMessage, BackendVariable, BreakpointLocation, CommandResult, Info, MessageType,
    PendingCommand, ResumeMode, ResumeState, VarRef,
};

/// The port the debug server listens on unless told otherwise.
pub const DEFAULT_BACKEND_PORT: u16 = 51237;

/// One of the two script contexts of an MTA server.
///
/// Each context is exposed to the editor as a thread with a fixed id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContextKind {
    Server,
    Client,
}

impl ContextKind {
    pub const ALL: [ContextKind; 2] = [ContextKind::Server, ContextKind::Client];

    /// Endpoint discriminator, e.g. `get_resume_mode_server`.
    pub fn suffix(self) -> &'static str {
        match self {
            ContextKind::Server => "_server",
            ContextKind::Client => "_client",
        }
    }

    pub fn thread_id(self) -> i64 {
        match self {
            ContextKind::Server => 1,
            ContextKind::Client => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ContextKind::Server => "Server",
            ContextKind::Client => "Client",
        }
    }

    /// Unknown thread ids resolve to the server context.
    pub fn from_thread_id(thread_id: i64) -> Self {
        if thread_id == ContextKind::Client.thread_id() {
            ContextKind::Client
        } else {
            ContextKind::Server
        }
    }
}

impl std::fmt::Display for ContextKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The operations of the debug server.
pub trait Backend: Send + Sync + 'static {
    /// Readiness probe; `Some` once the server answers.
    fn get_info(&self) -> impl Future<Output = Option<Info>> + Send;

    /// Replace the complete breakpoint set.
    fn set_breakpoints(
        &self,
        breakpoints: &[BreakpointLocation],
    ) -> impl Future<Output = bool> + Send;

    fn set_resume_mode(
        &self,
        context: ContextKind,
        mode: ResumeMode,
    ) -> impl Future<Output = bool> + Send;

    fn get_resume_mode(
        &self,
        context: ContextKind,
    ) -> impl Future<Output = Option<ResumeState>> + Send;

    /// Messages queued since the last call. The server drains its queue on read.
    fn get_messages(&self) -> impl Future<Output = Option<Vec<BackendMessage>>> + Send;

    /// Push a `request_variable` command and parse the variable list it answers with.
    fn request_variables(
        &self,
        context: ContextKind,
        command: &PendingCommand,
    ) -> impl Future<Output = Option<Vec<BackendVariable>>> + Send;

    /// Push any other command (`run_code`, console commands).
    fn run_command(
        &self,
        context: ContextKind,
        command: &PendingCommand,
    ) -> impl Future<Output = Option<CommandResult>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_ids_map_back_to_contexts() {
        for kind in ContextKind::ALL {
            assert_eq!(ContextKind::from_thread_id(kind.thread_id()), kind);
        }
        assert_eq!(ContextKind::from_thread_id(42), ContextKind::Server);
    }
}
