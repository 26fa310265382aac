//! WebSocket carrier for tunnel sessions.
//!
//! # Responsibilities
//! - Present an upgraded WebSocket as a byte-chunk stream and sink
//! - Deliver outbound chunks as binary messages
//!
//! # Design Decisions
//! - Binary and text payloads are both treated as raw bytes
//! - Ping/pong is answered by the WebSocket layer and never reaches the session
//! - A close frame ends the stream like a transport EOF

use std::future::ready;

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};

use crate::tunnel::{ChannelError, ClientSink, ClientStream};

/// Split an upgraded socket into the session's sink and stream halves.
pub fn websocket_channel(socket: WebSocket) -> (impl ClientSink, impl ClientStream) {
    let (sink, stream) = socket.split();

    let sink = sink
        .sink_map_err(|e| Box::new(e) as ChannelError)
        .with(|chunk: Bytes| ready(Ok::<_, ChannelError>(Message::Binary(chunk))));

    let stream = stream
        .take_while(|message| ready(!matches!(message, Ok(Message::Close(_)))))
        .filter_map(|message| ready(into_chunk(message)));

    (sink, stream)
}

fn into_chunk(message: Result<Message, axum::Error>) -> Option<Result<Bytes, ChannelError>> {
    match message {
        Ok(Message::Binary(data)) => Some(Ok(data)),
        Ok(Message::Text(text)) => Some(Ok(Bytes::copy_from_slice(text.as_str().as_bytes()))),
        Ok(Message::Ping(_) | Message::Pong(_) | Message::Close(_)) => None,
        Err(e) => Some(Err(Box::new(e))),
    }
}
