use std::{collections::HashMap, fmt};

use transport::types::{StackFrameId, VariablesReference};

const FIRST_HANDLE: VariablesReference = 1000;

/// What a `variablesReference` handed to the editor points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleKey {
    Local(StackFrameId),
    Upvalue(StackFrameId),
    Global(StackFrameId),
    /// A table reference owned by the debug server.
    Table(String),
}

impl fmt::Display for HandleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleKey::Local(frame) => write!(f, "local_{frame}"),
            HandleKey::Upvalue(frame) => write!(f, "upvalue_{frame}"),
            HandleKey::Global(frame) => write!(f, "global_{frame}"),
            HandleKey::Table(key) => f.write_str(key),
        }
    }
}

/// Handle table. Handles are never reused or released during a session.
#[derive(Debug)]
pub struct VariableHandles {
    next: VariablesReference,
    keys: HashMap<VariablesReference, HandleKey>,
}

impl Default for VariableHandles {
    fn default() -> Self {
        Self {
            next: FIRST_HANDLE,
            keys: HashMap::new(),
        }
    }
}

impl VariableHandles {
    pub fn create(&mut self, key: HandleKey) -> VariablesReference {
        let handle = self.next;
        self.next += 1;
        self.keys.insert(handle, key);
        handle
    }

    pub fn get(&self, handle: VariablesReference) -> Option<&HandleKey> {
        self.keys.get(&handle)
    }
}
