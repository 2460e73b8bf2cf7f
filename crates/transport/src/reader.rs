use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use pin_project_lite::pin_project;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;

use crate::codec::DapCodec;
use crate::error::CodecError;
use crate::message::Message;

pin_project! {
    /// Stream of messages decoded from the editor's side of the connection.
    ///
    /// Ends with `None` when the editor closes its end or after an error
    /// that is not [recoverable](CodecError::is_recoverable).
    pub struct DapReader<R> {
        #[pin]
        inner: FramedRead<R, DapCodec>,
    }
}

impl<R> DapReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self::with_codec(reader, DapCodec::new())
    }

    pub fn with_codec(reader: R, codec: DapCodec) -> Self {
        Self {
            inner: FramedRead::new(reader, codec),
        }
    }

    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

impl<R> Stream for DapReader<R>
where
    R: AsyncRead + Unpin,
{
    type Item = Result<Message, CodecError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().inner.poll_next(cx).map(|item| {
            item.map(|frame| match frame {
                Ok(Ok(message)) => Ok(message),
                Ok(Err(e)) => Err(CodecError::InvalidBody(e)),
                Err(e) => Err(e),
            })
        })
    }
}
