//! Arguments of the requests the adapter handles.
//!
//! Each struct deserializes the `arguments` member of the matching request.
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::{Source, SourceBreakpoint, StackFrameId, ThreadId, VariablesReference};

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeArguments {
    #[serde(default, rename = "adapterID")]
    pub adapter_id: Option<String>,
    #[serde(default, rename = "clientID")]
    pub client_id: Option<String>,
    #[serde(default)]
    pub lines_start_at1: Option<bool>,
}

/// Launch arguments of an `mtasa` launch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchArguments {
    /// Root directory of the MTA server installation.
    pub serverpath: PathBuf,
    #[serde(default)]
    pub stop_on_entry: Option<bool>,
    /// Log every protocol message.
    #[serde(default)]
    pub trace: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetBreakpointsArguments {
    pub source: Source,
    #[serde(default)]
    pub breakpoints: Option<Vec<SourceBreakpoint>>,
    /// Deprecated form of `breakpoints`, still sent by some editors.
    #[serde(default)]
    pub lines: Option<Vec<i64>>,
}

impl SetBreakpointsArguments {
    /// Requested lines, preferring `breakpoints` over the deprecated `lines`.
    pub fn requested_lines(&self) -> Vec<i64> {
        match (&self.breakpoints, &self.lines) {
            (Some(breakpoints), _) => breakpoints.iter().map(|b| b.line).collect(),
            (None, Some(lines)) => lines.clone(),
            (None, None) => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackTraceArguments {
    pub thread_id: ThreadId,
    #[serde(default)]
    pub start_frame: Option<i64>,
    #[serde(default)]
    pub levels: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopesArguments {
    pub frame_id: StackFrameId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariablesArguments {
    pub variables_reference: VariablesReference,
}

/// Shared by `continue`, `next`, `stepIn` and `stepOut`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadArguments {
    pub thread_id: ThreadId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateArguments {
    pub expression: String,
    #[serde(default)]
    pub frame_id: Option<StackFrameId>,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisconnectArguments {
    #[serde(default)]
    pub restart: Option<bool>,
    #[serde(default)]
    pub terminate_debuggee: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn launch_arguments_with_defaults() {
        let args: LaunchArguments =
            serde_json::from_value(json!({"serverpath": "C:/MTA Server", "request": "launch"}))
                .unwrap();

        assert_eq!(args.serverpath, PathBuf::from("C:/MTA Server"));
        assert_eq!(args.stop_on_entry, None);
        assert_eq!(args.trace, None);
    }

    #[test]
    fn requested_lines_fall_back_to_deprecated_field() {
        let args: SetBreakpointsArguments = serde_json::from_value(json!({
            "source": {"path": "/srv/a.lua"},
            "lines": [4, 9]
        }))
        .unwrap();
        assert_eq!(args.requested_lines(), vec![4, 9]);

        let args: SetBreakpointsArguments = serde_json::from_value(json!({
            "source": {"path": "/srv/a.lua"},
            "breakpoints": [{"line": 2, "condition": "x > 1"}],
            "lines": [4]
        }))
        .unwrap();
        assert_eq!(args.requested_lines(), vec![2]);
    }
}
