//! Helpers for driving the adapter from tests.

mod memory;

pub use memory::MemoryTransport;

use std::time::Duration;

use futures::StreamExt;
use serde::Serialize;
use tokio::io::{AsyncWriteExt, DuplexStream};

use crate::message::{Message, Seq};
use crate::reader::DapReader;
use crate::transport::DapTransport;

/// Frame a JSON-serializable value the way the editor would send it.
pub fn frame_message(msg: &impl Serialize) -> Vec<u8> {
    let json = serde_json::to_string(msg).expect("failed to serialize message");
    format!("Content-Length: {}\r\n\r\n{}", json.len(), json).into_bytes()
}

pub fn frame_messages<T: Serialize>(msgs: &[T]) -> Vec<u8> {
    msgs.iter().flat_map(frame_message).collect()
}

/// The editor's end of a [`MemoryTransport`] pair.
///
/// Requests are written as raw frames and everything the adapter sends back
/// is decoded into [`Message`]s.
pub struct EditorConnection {
    reader: DapReader<DuplexStream>,
    writer: DuplexStream,
    seq: Seq,
}

impl EditorConnection {
    /// Returns the connection and the transport to hand to the adapter.
    pub fn pair() -> (Self, MemoryTransport) {
        let (editor, adapter) = MemoryTransport::pair();
        let (read, write) = editor.into_split();
        (
            Self {
                reader: DapReader::new(read),
                writer: write,
                seq: 0,
            },
            adapter,
        )
    }

    /// Send a request and return its sequence number.
    pub async fn request(&mut self, command: &str, arguments: serde_json::Value) -> Seq {
        self.seq += 1;
        let mut frame = serde_json::json!({
            "seq": self.seq,
            "type": "request",
            "command": command,
        });
        if !arguments.is_null() {
            frame["arguments"] = arguments;
        }
        self.writer
            .write_all(&frame_message(&frame))
            .await
            .expect("writing request");
        self.seq
    }

    /// Write bytes to the adapter as they are, framing included.
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.expect("writing raw bytes");
    }

    /// Next message from the adapter, panicking after five seconds.
    pub async fn next_message(&mut self) -> Message {
        tokio::time::timeout(Duration::from_secs(5), self.reader.next())
            .await
            .expect("timed out waiting for adapter message")
            .expect("adapter closed the connection")
            .expect("decoding adapter message")
    }

    /// `None` when the adapter closed its end.
    pub async fn try_next_message(&mut self) -> Option<Message> {
        tokio::time::timeout(Duration::from_secs(5), self.reader.next())
            .await
            .expect("timed out waiting for adapter message")
            .map(|m| m.expect("decoding adapter message"))
    }

    /// Close the editor's write half, as an editor exiting would.
    pub async fn close(&mut self) {
        let _ = self.writer.shutdown().await;
    }
}
