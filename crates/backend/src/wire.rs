//! JSON shapes of the MTADebug API.
//!
//! The debug server is lenient about what it emits: strings may be `null`,
//! variable lists may come as arrays or as objects, and references may be
//! numbers or strings. Deserialization here accepts all of those.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Answer of `get_info`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    #[serde(default, deserialize_with = "lenient_string")]
    pub resource_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub resource_path: String,
}

/// One entry of the `set_breakpoints` body. `file` is relative to the
/// resources directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakpointLocation {
    pub file: String,
    pub line: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ResumeMode {
    #[default]
    Resume,
    Paused,
    StepInto,
    StepOver,
    StepOut,
}

impl TryFrom<u8> for ResumeMode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => ResumeMode::Resume,
            1 => ResumeMode::Paused,
            2 => ResumeMode::StepInto,
            3 => ResumeMode::StepOver,
            4 => ResumeMode::StepOut,
            other => return Err(format!("unknown resume mode {other}")),
        })
    }
}

impl From<ResumeMode> for u8 {
    fn from(mode: ResumeMode) -> Self {
        match mode {
            ResumeMode::Resume => 0,
            ResumeMode::Paused => 1,
            ResumeMode::StepInto => 2,
            ResumeMode::StepOver => 3,
            ResumeMode::StepOut => 4,
        }
    }
}

/// Body of `set_resume_mode_*`.
#[derive(Debug, Clone, Copy, Serialize)]
pub(crate) struct ResumeModeBody {
    pub resume_mode: ResumeMode,
}

/// Answer of `get_resume_mode_*`: the context's mode plus, when paused, where
/// and with which variables.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResumeState {
    #[serde(default)]
    pub resume_mode: ResumeMode,
    #[serde(default, deserialize_with = "lenient_string")]
    pub current_file: String,
    #[serde(default, deserialize_with = "lenient_int")]
    pub current_line: i64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub traceback: String,
    #[serde(default, deserialize_with = "variable_list")]
    pub local_variables: Vec<BackendVariable>,
    #[serde(default, deserialize_with = "variable_list")]
    pub upvalue_variables: Vec<BackendVariable>,
    #[serde(default, deserialize_with = "variable_list")]
    pub global_variables: Vec<BackendVariable>,
}

impl ResumeState {
    pub fn paused(&self) -> bool {
        self.resume_mode == ResumeMode::Paused
    }
}

/// Output channel of a backend message. Unknown codes fall back to console.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "u8")]
pub enum MessageType {
    #[default]
    Console,
    Stdout,
    Stderr,
    Telemetry,
}

impl From<u8> for MessageType {
    fn from(value: u8) -> Self {
        match value {
            1 => MessageType::Stdout,
            2 => MessageType::Stderr,
            3 => MessageType::Telemetry,
            _ => MessageType::Console,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BackendMessage {
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: MessageType,
    /// Empty when the message has no source location.
    #[serde(default, deserialize_with = "lenient_string")]
    pub file: String,
    #[serde(default, deserialize_with = "lenient_int")]
    pub line: i64,
    #[serde(default, rename = "varRef")]
    pub var_ref: VarRef,
}

/// Reference to an expandable value (a Lua table) held by the debug server.
///
/// `0`, `""` and `null` all mean "nothing to expand".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct VarRef(Option<String>);

impl VarRef {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        if key.is_empty() || key == "0" {
            Self(None)
        } else {
            Self(Some(key))
        }
    }

    pub fn leaf() -> Self {
        Self(None)
    }

    pub fn key(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_leaf(&self) -> bool {
        self.0.is_none()
    }
}

impl<'de> Deserialize<'de> for VarRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => VarRef::new(s),
            Value::Number(n) => VarRef::new(n.to_string()),
            _ => VarRef::leaf(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BackendVariable {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, rename = "type", deserialize_with = "lenient_string")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub value: String,
    #[serde(default, rename = "varRef")]
    pub var_ref: VarRef,
}

impl BackendVariable {
    /// A `name -> value` entry of an object-shaped list. The value is either a
    /// variable object or a bare scalar.
    fn from_entry(name: String, value: Value) -> Option<Self> {
        match value {
            Value::Object(_) => {
                let mut variable: BackendVariable = serde_json::from_value(value).ok()?;
                if variable.name.is_empty() {
                    variable.name = name;
                }
                Some(variable)
            }
            scalar => Some(Self {
                name,
                kind: lua_type_name(&scalar).to_string(),
                value: render_scalar(scalar),
                var_ref: VarRef::leaf(),
            }),
        }
    }
}

/// Body of `push_command_*`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCommand {
    pub command: String,
    pub args: Vec<String>,
    pub answer_id: i64,
}

/// Answer to a pushed command other than `request_variable`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CommandResult {
    #[serde(default, deserialize_with = "lenient_string")]
    pub res: String,
    #[serde(default)]
    pub var: VarRef,
}

/// Parse a `request_variable` answer. Entries that are not objects are skipped.
pub fn parse_variables(value: Value) -> Vec<BackendVariable> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        Value::Object(map) => map
            .into_iter()
            .filter_map(|(name, value)| BackendVariable::from_entry(name, value))
            .collect(),
        _ => Vec::new(),
    }
}

fn variable_list<'de, D>(deserializer: D) -> Result<Vec<BackendVariable>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(parse_variables(Value::deserialize(deserializer)?))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        other => render_scalar(other),
    })
}

fn lenient_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or_default(),
        Value::String(s) => s.trim().parse().unwrap_or_default(),
        _ => 0,
    })
}

fn render_scalar(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => "nil".to_string(),
        other => other.to_string(),
    }
}

fn lua_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "nil",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) | Value::Object(_) => "table",
    }
}
