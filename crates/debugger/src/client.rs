use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use serde::Serialize;
use tokio::sync::mpsc;
use transport::{OutgoingEvent, OutgoingMessage, OutgoingResponse, Request, Seq, events::Event};

/// Handle for sending responses and events to the editor.
///
/// Messages go through an unbounded channel to the single writer task, which
/// keeps the output stream ordered. Every message gets the next adapter
/// sequence number, and messages enter the channel in sequence order.
#[derive(Clone)]
pub struct ClientSender {
    tx: mpsc::UnboundedSender<OutgoingMessage>,
    // next sequence number; held while the message is queued
    seq: Arc<Mutex<Seq>>,
    trace: Arc<AtomicBool>,
}

impl ClientSender {
    pub fn new(tx: mpsc::UnboundedSender<OutgoingMessage>) -> Self {
        Self {
            tx,
            seq: Arc::new(Mutex::new(1)),
            trace: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Log every protocol message at `info` level.
    pub fn set_trace(&self, trace: bool) {
        self.trace.store(trace, Ordering::Relaxed);
    }

    pub fn tracing(&self) -> bool {
        self.trace.load(Ordering::Relaxed)
    }

    pub fn send_event(&self, event: Event) {
        let (name, body) = match event.into_parts() {
            Ok(parts) => parts,
            Err(e) => {
                tracing::warn!(error = %e, "could not encode event");
                return;
            }
        };
        self.send(|seq| {
            OutgoingMessage::Event(OutgoingEvent {
                seq,
                event: name.to_string(),
                body,
            })
        });
    }

    pub fn respond(&self, request: &Request, body: &impl Serialize) {
        match serde_json::to_value(body) {
            Ok(body) => self.send_response(request, true, None, Some(body)),
            Err(e) => self.respond_error(request, format!("encoding response: {e}")),
        }
    }

    pub fn respond_empty(&self, request: &Request) {
        self.send_response(request, true, None, None);
    }

    pub fn respond_error(&self, request: &Request, message: impl Into<String>) {
        self.send_response(request, false, Some(message.into()), None);
    }

    fn send_response(
        &self,
        request: &Request,
        success: bool,
        message: Option<String>,
        body: Option<serde_json::Value>,
    ) {
        self.send(|seq| {
            OutgoingMessage::Response(OutgoingResponse {
                seq,
                request_seq: request.seq,
                success,
                command: request.command.clone(),
                message,
                body,
            })
        });
    }

    fn send(&self, build: impl FnOnce(Seq) -> OutgoingMessage) {
        // a poisoned counter is still a valid counter
        let mut next = self.seq.lock().unwrap_or_else(|e| e.into_inner());
        let msg = build(*next);
        *next += 1;

        if self.tracing() {
            tracing::info!(message = ?msg, "sending to editor");
        }
        if self.tx.send(msg).is_err() {
            tracing::debug!("editor connection closed, dropping message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use transport::events::{OutputCategory, OutputEventBody};

    fn request(seq: Seq, command: &str) -> Request {
        Request {
            seq,
            command: command.to_string(),
            arguments: None,
        }
    }

    #[test]
    fn sequence_numbers_increase_across_messages() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let client = ClientSender::new(tx);

        client.respond_empty(&request(3, "restart"));
        client.send_event(Event::Output(OutputEventBody::new(
            OutputCategory::Stdout,
            "hello\n",
        )));
        client.respond_error(&request(4, "goto"), "unsupported command: goto");

        let seqs: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|m| m.seq())
            .collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn concurrent_senders_queue_in_sequence_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let client = ClientSender::new(tx);

        let threads: Vec<_> = (0..8)
            .map(|i| {
                let client = client.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        client.respond_empty(&request(i, "threads"));
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        let seqs: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|m| m.seq())
            .collect();
        assert_eq!(seqs, (1..=800).collect::<Vec<_>>());
    }

    #[test]
    fn error_response_carries_message() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let client = ClientSender::new(tx);
        client.respond_error(&request(9, "launch"), "boom");

        let Ok(OutgoingMessage::Response(response)) = rx.try_recv() else {
            panic!("expected response");
        };
        assert!(!response.success);
        assert_eq!(response.request_seq, 9);
        assert_eq!(response.command, "launch");
        assert_eq!(response.message.as_deref(), Some("boom"));
    }

    #[test]
    fn closed_channel_is_not_an_error() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let client = ClientSender::new(tx);
        client.send_event(Event::Terminated);
    }
}
