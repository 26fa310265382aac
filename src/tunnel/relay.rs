//! Bidirectional relay between the client channel and the outbound stream.
//!
//! # Responsibilities
//! - Forward client chunks to the destination, verbatim and in order
//! - Forward destination reads to the client, one message per read
//! - Stop both directions as soon as either side ends or fails
//!
//! # Design Decisions
//! - One task, two copy loops joined with `select!`; the loser is dropped,
//!   which cancels its pending read or write
//! - At most one chunk in flight per direction: the next read only starts
//!   after the previous write completed
//! - Optional idle timeout shared by both directions

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use bytes::BytesMut;
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::observability::metrics;
use crate::tunnel::channel::{ChannelError, ClientSink, ClientStream};

/// Read size for the destination-to-client direction.
pub const RELAY_BUFFER_SIZE: usize = 16 * 1024;

/// Why a relay stopped.
#[derive(Debug)]
pub enum RelayEnd {
    ClientClosed,
    UpstreamClosed,
    ClientError(ChannelError),
    UpstreamError(io::Error),
    IdleTimeout(Duration),
}

impl RelayEnd {
    pub fn label(&self) -> &'static str {
        match self {
            RelayEnd::ClientClosed => "client_closed",
            RelayEnd::UpstreamClosed => "upstream_closed",
            RelayEnd::ClientError(_) => "client_error",
            RelayEnd::UpstreamError(_) => "upstream_error",
            RelayEnd::IdleTimeout(_) => "idle_timeout",
        }
    }
}

/// Bytes moved in each direction and how the relay ended.
#[derive(Debug)]
pub struct RelayReport {
    pub client_to_upstream: u64,
    pub upstream_to_client: u64,
    pub end: RelayEnd,
}

struct Traffic {
    origin: Instant,
    last_activity_ms: AtomicU64,
    uplink: AtomicU64,
    downlink: AtomicU64,
}

impl Traffic {
    fn new() -> Self {
        Self {
            origin: Instant::now(),
            last_activity_ms: AtomicU64::new(0),
            uplink: AtomicU64::new(0),
            downlink: AtomicU64::new(0),
        }
    }

    fn touch(&self) {
        let now = self.origin.elapsed().as_millis() as u64;
        self.last_activity_ms.store(now, Ordering::Relaxed);
    }

    fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_activity_ms.load(Ordering::Relaxed));
        self.origin.elapsed().saturating_sub(last)
    }
}

/// Pumps bytes both ways once a session is relaying.
#[derive(Debug, Clone, Copy)]
pub struct RelayEngine {
    idle_timeout: Option<Duration>,
}

impl RelayEngine {
    pub fn new(idle_timeout: Option<Duration>) -> Self {
        Self { idle_timeout }
    }

    /// Relay until either side closes, fails or goes idle.
    ///
    /// Neither endpoint is closed here; the caller tears both down.
    pub async fn run<K, S, U>(&self, sink: &mut K, stream: &mut S, upstream: &mut U) -> RelayReport
    where
        K: ClientSink,
        S: ClientStream,
        U: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let traffic = Traffic::new();
        let (mut up_read, mut up_write) = tokio::io::split(upstream);

        let end = tokio::select! {
            end = pump_client(stream, &mut up_write, &traffic) => end,
            end = pump_upstream(&mut up_read, sink, &traffic) => end,
            limit = idle_watch(self.idle_timeout, &traffic) => RelayEnd::IdleTimeout(limit),
        };

        let report = RelayReport {
            client_to_upstream: traffic.uplink.load(Ordering::Relaxed),
            upstream_to_client: traffic.downlink.load(Ordering::Relaxed),
            end,
        };
        metrics::record_relay_bytes("uplink", report.client_to_upstream);
        metrics::record_relay_bytes("downlink", report.upstream_to_client);
        report
    }
}

async fn pump_client<S, W>(stream: &mut S, upstream: &mut W, traffic: &Traffic) -> RelayEnd
where
    S: ClientStream,
    W: AsyncWrite + Unpin,
{
    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => return RelayEnd::ClientError(e),
        };
        if chunk.is_empty() {
            continue;
        }
        traffic.touch();
        if let Err(e) = upstream.write_all(&chunk).await {
            return RelayEnd::UpstreamError(e);
        }
        if let Err(e) = upstream.flush().await {
            return RelayEnd::UpstreamError(e);
        }
        traffic.uplink.fetch_add(chunk.len() as u64, Ordering::Relaxed);
        tracing::trace!(bytes = chunk.len(), "client -> upstream");
    }
    RelayEnd::ClientClosed
}

async fn pump_upstream<R, K>(upstream: &mut R, sink: &mut K, traffic: &Traffic) -> RelayEnd
where
    R: AsyncRead + Unpin,
    K: ClientSink,
{
    let mut buf = BytesMut::with_capacity(RELAY_BUFFER_SIZE);
    loop {
        buf.reserve(RELAY_BUFFER_SIZE);
        let n = match upstream.read_buf(&mut buf).await {
            Ok(0) => return RelayEnd::UpstreamClosed,
            Ok(n) => n,
            Err(e) => return RelayEnd::UpstreamError(e),
        };
        traffic.touch();
        if let Err(e) = sink.send(buf.split().freeze()).await {
            return RelayEnd::ClientError(e);
        }
        traffic.downlink.fetch_add(n as u64, Ordering::Relaxed);
        tracing::trace!(bytes = n, "upstream -> client");
    }
}

/// Resolves once neither direction has moved a byte for `limit`.
async fn idle_watch(limit: Option<Duration>, traffic: &Traffic) -> Duration {
    let Some(limit) = limit else {
        return std::future::pending().await;
    };
    loop {
        let idle = traffic.idle_for();
        if idle >= limit {
            return limit;
        }
        tokio::time::sleep(limit - idle).await;
    }
}
