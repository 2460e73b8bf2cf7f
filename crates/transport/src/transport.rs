use tokio::io::{AsyncRead, AsyncWrite, Stdin, Stdout};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::reader::DapReader;
use crate::writer::DapWriter;

/// A byte stream that can be split into independently owned halves.
///
/// Implemented for the stdio pair the editor launches the adapter with, for
/// TCP connections in server mode, and for in-memory pipes in tests.
pub trait DapTransport: Send + 'static {
    type Read: AsyncRead + Unpin + Send + 'static;
    type Write: AsyncWrite + Unpin + Send + 'static;

    fn into_split(self) -> (Self::Read, Self::Write);
}

impl DapTransport for TcpStream {
    type Read = OwnedReadHalf;
    type Write = OwnedWriteHalf;

    fn into_split(self) -> (Self::Read, Self::Write) {
        TcpStream::into_split(self)
    }
}

/// The process' own stdin/stdout.
///
/// Nothing else may write to stdout while this transport is in use.
pub struct StdioTransport {
    stdin: Stdin,
    stdout: Stdout,
}

impl StdioTransport {
    pub fn new() -> Self {
        Self {
            stdin: tokio::io::stdin(),
            stdout: tokio::io::stdout(),
        }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl DapTransport for StdioTransport {
    type Read = Stdin;
    type Write = Stdout;

    fn into_split(self) -> (Self::Read, Self::Write) {
        (self.stdin, self.stdout)
    }
}

/// Split a transport into a framed reader and writer.
pub fn split<T: DapTransport>(transport: T) -> (DapReader<T::Read>, DapWriter<T::Write>) {
    let (read, write) = transport.into_split();
    (DapReader::new(read), DapWriter::new(write))
}
