//! Debug session for MTA:SA scripts
//!
//! Bridges an editor speaking the Debug Adapter Protocol to the polling HTTP
//! API of the MTA:SA debug server. The server and client script contexts are
//! exposed as two threads.
mod breakpoints;
mod client;
mod commands;
mod context;
mod handles;
mod paths;
mod runner;
mod session;
mod stack;

pub use breakpoints::{BreakpointRegistry, RegisteredBreakpoint, verify_line, verify_lines};
pub use client::ClientSender;
pub use commands::parse_expression;
pub use context::ExecutionContext;
pub use handles::{HandleKey, VariableHandles};
pub use paths::{ResourceRoot, basename, normalize, relative_resource_path};
pub use runner::run;
pub use session::{Session, SessionSettings};
pub use stack::{ParsedTraceback, TracebackFrame, parse_traceback};
