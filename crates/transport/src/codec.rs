//! Content-Length framing for DAP messages.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::CodecError;
use crate::message::{Message, OutgoingMessage};

const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

const HEADER_SEPARATOR: &[u8] = b"\r\n\r\n";

/// Codec for the DAP wire format:
///
/// ```text
/// Content-Length: <length>\r\n
/// \r\n
/// <JSON body>
/// ```
///
/// Decoding yields whatever the editor sends (requests, plus responses to
/// reverse requests); encoding accepts responses and events.
///
/// A frame whose body is not a valid message is decoded into an `Err` item
/// rather than a decoder error, so the stream keeps going after it. Header
/// errors leave the stream out of sync and end it.
#[derive(Debug, Clone)]
pub struct DapCodec {
    max_message_size: usize,
}

impl DapCodec {
    pub fn new() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    /// Bodies declared larger than `max_message_size` fail with
    /// [`CodecError::MessageTooLarge`].
    pub fn with_max_size(max_message_size: usize) -> Self {
        Self { max_message_size }
    }
}

impl Default for DapCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for DapCodec {
    type Item = Result<Message, serde_json::Error>;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(header_end) = find_header_end(src) else {
            return Ok(None);
        };

        let content_length = parse_content_length(&src[..header_end])?;
        if content_length > self.max_message_size {
            return Err(CodecError::MessageTooLarge {
                size: content_length,
                max: self.max_message_size,
            });
        }

        let body_start = header_end + HEADER_SEPARATOR.len();
        let frame_end = body_start + content_length;
        if src.len() < frame_end {
            src.reserve(frame_end - src.len());
            return Ok(None);
        }

        let frame = src.split_to(frame_end);
        tracing::trace!(length = content_length, "decoded frame");
        Ok(Some(serde_json::from_slice(&frame[body_start..])))
    }
}

impl Encoder<OutgoingMessage> for DapCodec {
    type Error = CodecError;

    fn encode(&mut self, item: OutgoingMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body = serde_json::to_vec(&item).map_err(|source| CodecError::Encode {
            kind: match &item {
                OutgoingMessage::Response(_) => "response",
                OutgoingMessage::Event(_) => "event",
            },
            source,
        })?;
        let header = format!("Content-Length: {}\r\n\r\n", body.len());

        dst.reserve(header.len() + body.len());
        dst.put_slice(header.as_bytes());
        dst.put_slice(&body);
        Ok(())
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER_SEPARATOR.len())
        .position(|w| w == HEADER_SEPARATOR)
}

/// Header names are matched case-insensitively; other headers are ignored.
fn parse_content_length(header: &[u8]) -> Result<usize, CodecError> {
    let header =
        std::str::from_utf8(header).map_err(|_| CodecError::InvalidHeader("not UTF-8"))?;

    header
        .split("\r\n")
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .ok_or(CodecError::InvalidHeader("missing Content-Length"))
        .and_then(|(_, value)| {
            value
                .trim()
                .parse()
                .map_err(|_| CodecError::InvalidHeader("Content-Length is not a number"))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{OutgoingEvent, OutgoingResponse};

    fn frame(json: &str) -> BytesMut {
        BytesMut::from(format!("Content-Length: {}\r\n\r\n{}", json.len(), json).as_str())
    }

    #[test]
    fn decode_request() {
        let mut codec = DapCodec::new();
        let mut buf = frame(
            r#"{"seq":1,"type":"request","command":"initialize","arguments":{"adapterID":"mtasa"}}"#,
        );

        let msg = codec.decode(&mut buf).unwrap().unwrap().unwrap();
        assert!(matches!(msg, Message::Request(r) if r.command == "initialize"));
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_waits_for_header() {
        let mut codec = DapCodec::new();
        let mut buf = BytesMut::from("Content-Length: 10");

        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 18);
    }

    #[test]
    fn decode_waits_for_body() {
        let mut codec = DapCodec::new();
        let mut buf = BytesMut::from("Content-Length: 100\r\n\r\n{\"seq\":");

        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn decode_back_to_back_frames() {
        let mut codec = DapCodec::new();
        let mut buf = frame(r#"{"seq":1,"type":"request","command":"threads"}"#);
        buf.extend_from_slice(&frame(
            r#"{"seq":2,"type":"request","command":"continue","arguments":{"threadId":1}}"#,
        ));

        let first = codec.decode(&mut buf).unwrap().unwrap().unwrap();
        assert!(matches!(first, Message::Request(r) if r.seq == 1 && r.arguments.is_none()));
        let second = codec.decode(&mut buf).unwrap().unwrap().unwrap();
        assert!(matches!(second, Message::Request(r) if r.seq == 2));
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_header_name_is_case_insensitive() {
        let mut codec = DapCodec::new();
        let json = r#"{"seq":1,"type":"request","command":"threads"}"#;
        let mut buf = BytesMut::from(format!("content-length: {}\r\n\r\n{json}", json.len()).as_str());

        assert!(codec.decode(&mut buf).unwrap().is_some());
    }

    #[test]
    fn decode_rejects_oversized_frames() {
        let mut codec = DapCodec::with_max_size(10);
        let mut buf = BytesMut::from("Content-Length: 100\r\n\r\n");

        let result = codec.decode(&mut buf);
        assert!(matches!(
            result,
            Err(CodecError::MessageTooLarge { size: 100, max: 10 })
        ));
    }

    #[test]
    fn decode_missing_content_length() {
        let mut codec = DapCodec::new();
        let mut buf = BytesMut::from("Content-Type: json\r\n\r\n{}");

        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::InvalidHeader("missing Content-Length"))
        ));
    }

    #[test]
    fn decode_skips_frame_with_invalid_body() {
        let mut codec = DapCodec::new();
        let mut buf = BytesMut::from("Content-Length: 2\r\n\r\n{]");
        buf.extend_from_slice(&frame(r#"{"seq":2,"type":"request","command":"threads"}"#));

        assert!(matches!(codec.decode(&mut buf), Ok(Some(Err(_)))));
        let next = codec.decode(&mut buf).unwrap().unwrap().unwrap();
        assert!(matches!(next, Message::Request(r) if r.seq == 2));
    }

    #[test]
    fn encode_response() {
        let mut codec = DapCodec::new();
        let msg = OutgoingMessage::Response(OutgoingResponse {
            seq: 4,
            request_seq: 1,
            success: true,
            command: "initialize".to_string(),
            message: None,
            body: Some(serde_json::json!({"supportsRestartRequest": true})),
        });

        let mut buf = BytesMut::new();
        codec.encode(msg, &mut buf).unwrap();

        let s = std::str::from_utf8(&buf).unwrap();
        let (header, body) = s.split_once("\r\n\r\n").unwrap();
        assert_eq!(header, format!("Content-Length: {}", body.len()));
        assert!(body.contains(r#""type":"response""#));
        assert!(body.contains(r#""request_seq":1"#));
        assert!(!body.contains("message"));
    }

    #[test]
    fn encode_event_without_body() {
        let mut codec = DapCodec::new();
        let msg = OutgoingMessage::Event(OutgoingEvent {
            seq: 1,
            event: "initialized".to_string(),
            body: None,
        });

        let mut buf = BytesMut::new();
        codec.encode(msg, &mut buf).unwrap();

        let s = std::str::from_utf8(&buf).unwrap();
        assert!(s.ends_with(r#"{"type":"event","seq":1,"event":"initialized"}"#));
    }
}
