use tokio::io::{DuplexStream, duplex};

use crate::transport::DapTransport;

const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// One end of an in-memory, bidirectional pipe.
///
/// Bytes written to one end of a [`MemoryTransport::pair`] are read from the
/// other, which lets a test drive the adapter exactly like an editor would.
pub struct MemoryTransport {
    read: DuplexStream,
    write: DuplexStream,
}

impl MemoryTransport {
    pub fn pair() -> (Self, Self) {
        Self::pair_with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    pub fn pair_with_buffer_size(buffer_size: usize) -> (Self, Self) {
        let (left_write, right_read) = duplex(buffer_size);
        let (right_write, left_read) = duplex(buffer_size);

        (
            MemoryTransport {
                read: left_read,
                write: left_write,
            },
            MemoryTransport {
                read: right_read,
                write: right_write,
            },
        )
    }
}

impl DapTransport for MemoryTransport {
    type Read = DuplexStream;
    type Write = DuplexStream;

    fn into_split(self) -> (Self::Read, Self::Write) {
        (self.read, self.write)
    }
}
