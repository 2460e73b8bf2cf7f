//! Events the adapter emits
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{Source, ThreadId, VariablesReference};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "body", rename_all = "camelCase")]
pub enum Event {
    Initialized,
    Output(OutputEventBody),
    Stopped(StoppedEventBody),
    Terminated,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::Initialized => "initialized",
            Event::Output(_) => "output",
            Event::Stopped(_) => "stopped",
            Event::Terminated => "terminated",
        }
    }

    /// Split into the wire-level event name and body.
    pub fn into_parts(self) -> serde_json::Result<(&'static str, Option<Value>)> {
        let name = self.name();
        let body = match self {
            Event::Initialized | Event::Terminated => None,
            Event::Output(body) => Some(serde_json::to_value(body)?),
            Event::Stopped(body) => Some(serde_json::to_value(body)?),
        };
        Ok((name, body))
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputCategory {
    #[default]
    Console,
    Stdout,
    Stderr,
    Telemetry,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutputEventBody {
    pub category: OutputCategory,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables_reference: Option<VariablesReference>,
}

impl OutputEventBody {
    pub fn new(category: OutputCategory, output: impl Into<String>) -> Self {
        Self {
            category,
            output: output.into(),
            source: None,
            line: None,
            variables_reference: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoppedReason {
    Breakpoint,
    Step,
    Entry,
    Pause,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoppedEventBody {
    pub reason: StoppedReason,
    pub thread_id: ThreadId,
}
