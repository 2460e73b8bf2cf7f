//! Adapter side of the Debug Adapter Protocol.
//!
//! The editor is the DAP client and this adapter is the server, so the codec
//! decodes [`Message`]s (mostly requests) and encodes [`OutgoingMessage`]s
//! (responses and events).
//!
//! - [`DapCodec`] implements the Content-Length framing
//! - [`DapReader`] turns an `AsyncRead` into a `Stream` of [`Message`]s
//! - [`DapWriter`] turns an `AsyncWrite` into a `Sink` of [`OutgoingMessage`]s
//! - [`requests`], [`responses`], [`events`] and [`types`] hold the typed
//!   protocol payloads the adapter understands
//!
//! ```ignore
//! let (mut reader, mut writer) = transport::split(transport::StdioTransport::new());
//! while let Some(msg) = reader.next().await {
//!     if let Message::Request(request) = msg? {
//!         // dispatch
//!     }
//! }
//! ```

mod codec;
mod error;
mod message;
mod reader;
mod transport;
mod writer;

pub mod events;
pub mod requests;
pub mod responses;
pub mod testing;
pub mod types;

pub use codec::DapCodec;
pub use error::CodecError;
pub use message::{
    ClientResponse, Event, Message, OutgoingEvent, OutgoingMessage, OutgoingResponse, Request, Seq,
};
pub use reader::DapReader;
pub use transport::{DapTransport, StdioTransport, split};
pub use writer::DapWriter;
