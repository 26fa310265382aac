//! Client-facing carrier as a byte-chunk stream and sink.
//!
//! The client transport is message-oriented; message boundaries carry no
//! meaning, so each message is just the next chunk of a byte stream.

use bytes::Bytes;
use futures_util::{Sink, Stream};

/// Error raised by the client transport.
pub type ChannelError = Box<dyn std::error::Error + Send + Sync>;

/// Inbound half: chunks in arrival order, ending when the client closes.
pub trait ClientStream: Stream<Item = Result<Bytes, ChannelError>> + Unpin + Send {}

impl<T> ClientStream for T where T: Stream<Item = Result<Bytes, ChannelError>> + Unpin + Send {}

/// Outbound half: each item is delivered to the client as one opaque message.
pub trait ClientSink: Sink<Bytes, Error = ChannelError> + Unpin + Send {}

impl<T> ClientSink for T where T: Sink<Bytes, Error = ChannelError> + Unpin + Send {}
