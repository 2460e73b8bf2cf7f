use std::io;

/// Failure to read or write a framed message.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The header block is not a usable `Content-Length` header.
    #[error("invalid header: {0}")]
    InvalidHeader(&'static str),

    #[error("message of {size} bytes is larger than the {max} byte limit")]
    MessageTooLarge { size: usize, max: usize },

    /// The frame was complete but its body is not a protocol message.
    #[error("invalid message body")]
    InvalidBody(#[source] serde_json::Error),

    #[error("encoding {kind} failed")]
    Encode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl CodecError {
    /// Whether the reader can go on with the next frame after this error.
    ///
    /// Only a bad body qualifies: its frame was already consumed. Anything
    /// else leaves the byte stream out of sync.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidBody(_))
    }
}
