//! Protocol envelopes.
//!
//! Bodies stay as raw JSON here; the typed payloads live in
//! [`crate::requests`], [`crate::responses`] and [`crate::events`].

use serde::{Deserialize, Serialize};

/// Sequence number used for ordering and request/response correlation.
pub type Seq = i64;

/// A message received from the editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Message {
    Request(Request),
    /// Answer to a reverse request. The adapter never issues any, so these are
    /// only logged.
    Response(ClientResponse),
    Event(Event),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub seq: Seq,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientResponse {
    pub seq: Seq,
    pub request_seq: Seq,
    pub success: bool,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub seq: Seq,
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

/// Response to an editor request.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingResponse {
    pub seq: Seq,
    pub request_seq: Seq,
    pub success: bool,
    pub command: String,
    /// Short error description, only set when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutgoingEvent {
    pub seq: Seq,
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

/// A message the adapter writes to the editor.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutgoingMessage {
    Response(OutgoingResponse),
    Event(OutgoingEvent),
}

impl OutgoingMessage {
    pub fn seq(&self) -> Seq {
        match self {
            OutgoingMessage::Response(r) => r.seq,
            OutgoingMessage::Event(e) => e.seq,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_launch_request() {
        let json = r#"{
            "seq": 2,
            "type": "request",
            "command": "launch",
            "arguments": {"serverpath": "/opt/mta", "stopOnEntry": false}
        }"#;

        let msg: Message = serde_json::from_str(json).unwrap();
        let Message::Request(request) = msg else {
            panic!("expected request");
        };
        assert_eq!(request.command, "launch");
        assert_eq!(request.arguments.unwrap()["serverpath"], "/opt/mta");
    }

    #[test]
    fn deserialize_reverse_request_response() {
        let json = r#"{
            "seq": 9,
            "type": "response",
            "request_seq": 3,
            "success": false,
            "command": "runInTerminal",
            "message": "cancelled"
        }"#;

        let msg: Message = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, Message::Response(r) if !r.success && r.request_seq == 3));
    }

    #[test]
    fn serialize_error_response() {
        let msg = OutgoingMessage::Response(OutgoingResponse {
            seq: 10,
            request_seq: 4,
            success: false,
            command: "goto".to_string(),
            message: Some("unsupported command: goto".to_string()),
            body: None,
        });

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "response");
        assert_eq!(value["success"], false);
        assert_eq!(value["message"], "unsupported command: goto");
        assert!(value.get("body").is_none());
        assert_eq!(msg.seq(), 10);
    }
}
