use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Sink, SinkExt};
use pin_project_lite::pin_project;
use tokio::io::AsyncWrite;
use tokio_util::codec::FramedWrite;

use crate::codec::DapCodec;
use crate::error::CodecError;
use crate::message::OutgoingMessage;

pin_project! {
    /// Sink encoding responses and events for the editor.
    pub struct DapWriter<W> {
        #[pin]
        inner: FramedWrite<W, DapCodec>,
    }
}

impl<W> DapWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(writer: W) -> Self {
        Self {
            inner: FramedWrite::new(writer, DapCodec::new()),
        }
    }

    /// Encode, write and flush a single message.
    pub async fn send(&mut self, msg: OutgoingMessage) -> Result<(), CodecError> {
        SinkExt::send(&mut self.inner, msg).await
    }

    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }
}

impl<W> Sink<OutgoingMessage> for DapWriter<W>
where
    W: AsyncWrite + Unpin,
{
    type Error = CodecError;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().inner.poll_ready(cx)
    }

    fn start_send(self: Pin<&mut Self>, item: OutgoingMessage) -> Result<(), Self::Error> {
        self.project().inner.start_send(item)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().inner.poll_flush(cx)
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().inner.poll_close(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{OutgoingEvent, OutgoingResponse};
    use std::io::Cursor;

    #[tokio::test]
    async fn writes_frames_back_to_back() {
        let mut writer = DapWriter::new(Cursor::new(Vec::new()));

        writer
            .send(OutgoingMessage::Response(OutgoingResponse {
                seq: 1,
                request_seq: 1,
                success: true,
                command: "threads".to_string(),
                message: None,
                body: Some(serde_json::json!({"threads": []})),
            }))
            .await
            .unwrap();
        writer
            .send(OutgoingMessage::Event(OutgoingEvent {
                seq: 2,
                event: "stopped".to_string(),
                body: Some(serde_json::json!({"reason": "breakpoint", "threadId": 1})),
            }))
            .await
            .unwrap();

        let output = String::from_utf8(writer.into_inner().into_inner()).unwrap();
        assert_eq!(output.matches("Content-Length: ").count(), 2);
        let response_at = output.find(r#""command":"threads""#).unwrap();
        let event_at = output.find(r#""event":"stopped""#).unwrap();
        assert!(response_at < event_at);
    }
}
