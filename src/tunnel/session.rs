//! Per-connection session state machine.
//!
//! # States
//! ```text
//! Buffering ──parsed──▶ Connecting ──connected──▶ Relaying
//!     │                     │                        │
//!     └─────────────────────┴────────────────────────┴──▶ Closed
//! ```
//!
//! # Design Decisions
//! - Every failure ends in the same silent close; the client never learns
//!   whether its id, header or destination was the problem
//! - The header buffer lives only in `Buffering` and is bounded
//! - `close` is idempotent and releases the client channel and the
//!   outbound stream together

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use futures_util::stream::Peekable;
use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::config::TunnelSettings;
use crate::net::{ConnectionId, SessionGuard, SessionTracker};
use crate::observability::metrics;
use crate::protocol::{parse_header, ParseOutcome, ParsedHeader, RejectReason, RESPONSE_ACK};
use crate::tunnel::channel::{ChannelError, ClientSink, ClientStream};
use crate::tunnel::connector::Connector;
use crate::tunnel::relay::{RelayEngine, RelayReport};

/// Upper bound on each teardown step.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Buffering,
    Connecting,
    Relaying,
    Closed,
}

/// Why a session ended before or while establishing its tunnel.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("handshake rejected: {0}")]
    Protocol(#[from] RejectReason),

    #[error("client closed before the tunnel was established")]
    ClientClosed,

    #[error("client transport error: {0}")]
    Client(ChannelError),

    #[error("connect to {target}:{port} failed: {source}")]
    UpstreamConnect {
        target: String,
        port: u16,
        source: io::Error,
    },

    #[error("connect to {target}:{port} timed out after {limit:?}")]
    ConnectTimeout {
        target: String,
        port: u16,
        limit: Duration,
    },

    #[error("forwarding initial payload failed: {0}")]
    Upstream(io::Error),
}

impl SessionError {
    pub fn label(&self) -> &'static str {
        match self {
            SessionError::Protocol(_) => "rejected",
            SessionError::ClientClosed => "client_closed",
            SessionError::Client(_) => "client_error",
            SessionError::UpstreamConnect { .. } => "connect_failed",
            SessionError::ConnectTimeout { .. } => "connect_timeout",
            SessionError::Upstream(_) => "upstream_error",
        }
    }
}

/// Creates sessions that share settings, a connector and admission.
pub struct SessionFactory<C> {
    settings: Arc<TunnelSettings>,
    connector: Arc<C>,
    tracker: SessionTracker,
}

impl<C> Clone for SessionFactory<C> {
    fn clone(&self) -> Self {
        Self {
            settings: Arc::clone(&self.settings),
            connector: Arc::clone(&self.connector),
            tracker: self.tracker.clone(),
        }
    }
}

impl<C: Connector> SessionFactory<C> {
    pub fn new(settings: Arc<TunnelSettings>, connector: C, tracker: SessionTracker) -> Self {
        Self {
            settings,
            connector: Arc::new(connector),
            tracker,
        }
    }

    pub fn settings(&self) -> &TunnelSettings {
        &self.settings
    }

    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    /// Admit a new session, or `None` when the session limit is reached.
    pub fn open(&self) -> Option<Session<C>> {
        let Some(guard) = self.tracker.try_admit() else {
            metrics::record_session_refused();
            return None;
        };
        metrics::record_session_opened();
        Some(Session {
            id: guard.id(),
            state: SessionState::Buffering,
            buffer: BytesMut::with_capacity(self.settings.max_header_bytes),
            outbound: None,
            settings: Arc::clone(&self.settings),
            connector: Arc::clone(&self.connector),
            started: Instant::now(),
            _guard: guard,
        })
    }
}

/// One client connection, from its first byte to its close.
pub struct Session<C: Connector> {
    id: ConnectionId,
    state: SessionState,
    buffer: BytesMut,
    outbound: Option<C::Stream>,
    settings: Arc<TunnelSettings>,
    connector: Arc<C>,
    started: Instant,
    _guard: SessionGuard,
}

impl<C: Connector> Session<C> {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drive the session over the given client channel until it closes.
    pub async fn run<K, S>(mut self, mut sink: K, stream: S) -> Result<RelayReport, SessionError>
    where
        K: ClientSink,
        S: ClientStream,
    {
        let mut stream = stream.peekable();
        let result = self.drive(&mut sink, &mut stream).await;
        self.close(&mut sink).await;
        self.record(&result);
        result
    }

    async fn drive<K, S>(
        &mut self,
        sink: &mut K,
        stream: &mut Peekable<S>,
    ) -> Result<RelayReport, SessionError>
    where
        K: ClientSink,
        S: ClientStream,
    {
        let (header, payload) = self.read_header(stream).await?;
        tracing::debug!(
            connection_id = %self.id,
            target = %header.target,
            port = header.port,
            payload = payload.len(),
            "Header parsed, connecting"
        );

        let attempt = dial(
            Arc::clone(&self.connector),
            header.clone(),
            self.settings.connect_timeout,
        );
        let upstream = tokio::select! {
            result = attempt => result?,
            gone = client_gone(stream) => return Err(gone),
        };
        let Self {
            id,
            state,
            outbound,
            settings,
            ..
        } = self;
        let upstream = outbound.insert(upstream);

        sink.send(Bytes::from_static(&RESPONSE_ACK))
            .await
            .map_err(SessionError::Client)?;
        if !payload.is_empty() {
            upstream.write_all(&payload).await.map_err(SessionError::Upstream)?;
        }
        *state = SessionState::Relaying;
        tracing::debug!(connection_id = %id, "Relaying");

        let engine = RelayEngine::new(settings.idle_timeout);
        Ok(engine.run(sink, stream, upstream).await)
    }

    /// Accumulate chunks until the header parses, fails, or fills the bound.
    /// Returns the header and whatever payload followed it.
    ///
    /// At most `max_header_bytes` are ever buffered; the part of a chunk
    /// beyond the bound is only kept once the header has parsed.
    async fn read_header<S: ClientStream>(
        &mut self,
        stream: &mut S,
    ) -> Result<(ParsedHeader, Bytes), SessionError> {
        let limit = self.settings.max_header_bytes;
        loop {
            let mut chunk = match stream.next().await {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => return Err(SessionError::Client(e)),
                None => return Err(SessionError::ClientClosed),
            };
            let room = limit.saturating_sub(self.buffer.len());
            let overflow = if chunk.len() > room {
                chunk.split_off(room)
            } else {
                Bytes::new()
            };
            self.buffer.extend_from_slice(&chunk);

            let (header, consumed) = match parse_header(&self.buffer, &self.settings.secret) {
                ParseOutcome::Incomplete if self.buffer.len() >= limit => {
                    return Err(RejectReason::BufferLimitExceeded { limit }.into());
                }
                ParseOutcome::Incomplete => continue,
                ParseOutcome::Invalid(reason) => return Err(reason.into()),
                ParseOutcome::Parsed { header, remainder } => {
                    (header, self.buffer.len() - remainder.len())
                }
            };

            let mut payload = std::mem::take(&mut self.buffer).split_off(consumed);
            let payload = if payload.is_empty() {
                overflow
            } else {
                payload.extend_from_slice(&overflow);
                payload.freeze()
            };
            self.state = SessionState::Connecting;
            return Ok((header, payload));
        }
    }

    /// Enter `Closed`, releasing the buffer, the outbound stream and the
    /// client channel. Later calls do nothing.
    async fn close<K: ClientSink>(&mut self, sink: &mut K) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;
        self.buffer = BytesMut::new();

        if let Some(mut upstream) = self.outbound.take() {
            let _ = tokio::time::timeout(CLOSE_GRACE, upstream.shutdown()).await;
        }
        let _ = tokio::time::timeout(CLOSE_GRACE, sink.close()).await;
    }

    fn record(&self, result: &Result<RelayReport, SessionError>) {
        let lifetime = self.started.elapsed();
        let outcome = match result {
            Ok(report) => {
                tracing::info!(
                    connection_id = %self.id,
                    uplink_bytes = report.client_to_upstream,
                    downlink_bytes = report.upstream_to_client,
                    ended_by = report.end.label(),
                    duration_ms = lifetime.as_millis() as u64,
                    "Session closed"
                );
                report.end.label()
            }
            Err(SessionError::Protocol(reason)) => {
                tracing::warn!(connection_id = %self.id, reason = %reason, "Handshake rejected");
                metrics::record_handshake_rejected(reason.label());
                "rejected"
            }
            Err(e @ (SessionError::UpstreamConnect { .. } | SessionError::ConnectTimeout { .. })) => {
                tracing::warn!(connection_id = %self.id, error = %e, "Upstream connect failed");
                metrics::record_upstream_connect_failure();
                e.label()
            }
            Err(e) => {
                tracing::debug!(connection_id = %self.id, error = %e, "Session ended before relaying");
                e.label()
            }
        };
        metrics::record_session_closed(outcome, lifetime);
    }
}

async fn dial<C: Connector>(
    connector: Arc<C>,
    header: ParsedHeader,
    limit: Option<Duration>,
) -> Result<C::Stream, SessionError> {
    let attempt = connector.connect(&header.target, header.port);
    let result = match limit {
        Some(limit) => match tokio::time::timeout(limit, attempt).await {
            Ok(result) => result,
            Err(_) => {
                return Err(SessionError::ConnectTimeout {
                    target: header.target_host(),
                    port: header.port,
                    limit,
                })
            }
        },
        None => attempt.await,
    };
    result.map_err(|source| SessionError::UpstreamConnect {
        target: header.target_host(),
        port: header.port,
        source,
    })
}

/// Resolves when the client closes or fails. Data arriving early is left
/// queued for the relay and the future stays pending.
async fn client_gone<S: ClientStream>(stream: &mut Peekable<S>) -> SessionError {
    if let Some(Ok(_)) = Pin::new(&mut *stream).peek().await {
        return std::future::pending().await;
    }
    match stream.next().await {
        Some(Err(e)) => SessionError::Client(e),
        _ => SessionError::ClientClosed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{encode_header, Secret, TargetAddr, COMMAND_TCP, ID_LEN, MAX_HEADER_LEN};
    use crate::tunnel::channel::memory;
    use crate::tunnel::relay::RelayEnd;
    use std::future::Future;
    use std::net::Ipv4Addr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, DuplexStream};
    use tokio::sync::mpsc;

    type Accepted = mpsc::UnboundedReceiver<(TargetAddr, u16, DuplexStream)>;

    struct MockConnector {
        attempts: Arc<AtomicUsize>,
        refuse: bool,
        delay: Option<Duration>,
        accepted: mpsc::UnboundedSender<(TargetAddr, u16, DuplexStream)>,
    }

    impl Connector for MockConnector {
        type Stream = DuplexStream;

        fn connect(
            &self,
            target: &TargetAddr,
            port: u16,
        ) -> impl Future<Output = io::Result<DuplexStream>> + Send {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let result = if self.refuse {
                Err(io::Error::from(io::ErrorKind::ConnectionRefused))
            } else {
                let (near, far) = tokio::io::duplex(64 * 1024);
                let _ = self.accepted.send((target.clone(), port, far));
                Ok(near)
            };
            let delay = self.delay;
            async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                result
            }
        }
    }

    struct Harness {
        factory: SessionFactory<MockConnector>,
        attempts: Arc<AtomicUsize>,
        accepted: Accepted,
    }

    fn secret() -> Secret {
        Secret::from_bytes([0x5a; ID_LEN])
    }

    fn harness(refuse: bool, delay: Option<Duration>, tweak: impl FnOnce(&mut TunnelSettings)) -> Harness {
        let mut settings = TunnelSettings::with_secret(secret());
        tweak(&mut settings);
        let attempts = Arc::new(AtomicUsize::new(0));
        let (tx, accepted) = mpsc::unbounded_channel();
        let connector = MockConnector {
            attempts: Arc::clone(&attempts),
            refuse,
            delay,
            accepted: tx,
        };
        Harness {
            factory: SessionFactory::new(Arc::new(settings), connector, SessionTracker::new(8)),
            attempts,
            accepted,
        }
    }

    fn request(secret: &Secret, host: &str, port: u16, payload: &[u8]) -> Vec<u8> {
        let mut bytes =
            encode_header(secret, COMMAND_TCP, &TargetAddr::Domain(host.into()), port, &[]).unwrap();
        bytes.extend_from_slice(payload);
        bytes
    }

    #[tokio::test]
    async fn handshake_connects_acks_and_relays() {
        let mut h = harness(false, None, |_| {});
        let (mut client, sink, stream) = memory::channel(16);
        let session = h.factory.open().unwrap();
        assert_eq!(session.state(), SessionState::Buffering);
        let task = tokio::spawn(session.run(sink, stream));

        client.send(&request(&secret(), "localhost", 80, b"PING")).await;

        let (target, port, mut far) = h.accepted.recv().await.unwrap();
        assert_eq!(target, TargetAddr::Domain("localhost".into()));
        assert_eq!(port, 80);

        let mut leftover = [0u8; 4];
        far.read_exact(&mut leftover).await.unwrap();
        assert_eq!(&leftover, b"PING");
        assert_eq!(client.read_exact(2).await, RESPONSE_ACK);

        far.write_all(b"PONG").await.unwrap();
        assert_eq!(client.read_exact(4).await, b"PONG");

        client.send(b"more").await;
        let mut more = [0u8; 4];
        far.read_exact(&mut more).await.unwrap();
        assert_eq!(&more, b"more");

        drop(client);
        let report = task.await.unwrap().unwrap();
        assert!(matches!(report.end, RelayEnd::ClientClosed));
        assert_eq!(report.client_to_upstream, 4);
        assert_eq!(report.upstream_to_client, 4);

        // Closing the session shut the outbound stream down.
        let mut rest = Vec::new();
        far.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
        assert_eq!(h.factory.tracker().active_count(), 0);
    }

    #[tokio::test]
    async fn header_split_into_single_bytes() {
        let mut h = harness(false, None, |_| {});
        let (mut client, sink, stream) = memory::channel(1024);
        let task = tokio::spawn(h.factory.open().unwrap().run(sink, stream));

        let bytes = request(&secret(), "example.net", 443, b"hello");
        for byte in &bytes {
            client.send(std::slice::from_ref(byte)).await;
        }

        let (target, port, mut far) = h.accepted.recv().await.unwrap();
        assert_eq!(target.to_string(), "example.net");
        assert_eq!(port, 443);
        assert_eq!(client.read_exact(2).await, RESPONSE_ACK);

        // The payload trickled in after the header and flows through the relay.
        let mut payload = [0u8; 5];
        far.read_exact(&mut payload).await.unwrap();
        assert_eq!(&payload, b"hello");

        drop(far);
        let report = task.await.unwrap().unwrap();
        assert!(matches!(report.end, RelayEnd::UpstreamClosed));
    }

    #[tokio::test]
    async fn wrong_secret_closes_without_connecting_or_replying() {
        let h = harness(false, None, |_| {});
        let (mut client, sink, stream) = memory::channel(16);
        let task = tokio::spawn(h.factory.open().unwrap().run(sink, stream));

        let mut id = *secret().as_bytes();
        id[0] ^= 0x80;
        client
            .send(&request(&Secret::from_bytes(id), "localhost", 80, b"PING"))
            .await;

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, SessionError::Protocol(RejectReason::SecretMismatch)));
        assert!(client.read_to_end().await.is_empty());
        assert_eq!(h.attempts.load(Ordering::SeqCst), 0);
    }

    /// Longest legal header: 255 addon bytes and a 255-byte domain.
    fn longest_request(payload: &[u8]) -> Vec<u8> {
        let host = "h".repeat(255);
        let mut bytes = encode_header(
            &secret(),
            COMMAND_TCP,
            &TargetAddr::Domain(host),
            443,
            &[0xab; 255],
        )
        .unwrap();
        assert_eq!(bytes.len(), MAX_HEADER_LEN);
        bytes.extend_from_slice(payload);
        bytes
    }

    #[tokio::test]
    async fn longest_header_accepted_whole_or_byte_by_byte() {
        for byte_by_byte in [false, true] {
            let mut h = harness(false, None, |s| s.max_header_bytes = MAX_HEADER_LEN);
            let (mut client, sink, stream) = memory::channel(1024);
            let task = tokio::spawn(h.factory.open().unwrap().run(sink, stream));

            let bytes = longest_request(b"tail");
            if byte_by_byte {
                for byte in &bytes {
                    client.send(std::slice::from_ref(byte)).await;
                }
            } else {
                client.send(&bytes).await;
            }

            let (_, port, mut far) = h.accepted.recv().await.unwrap();
            assert_eq!(port, 443);
            assert_eq!(client.read_exact(2).await, RESPONSE_ACK);
            let mut tail = [0u8; 4];
            far.read_exact(&mut tail).await.unwrap();
            assert_eq!(&tail, b"tail");

            drop(client);
            assert!(task.await.unwrap().is_ok());
            assert_eq!(h.attempts.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn buffer_never_outgrows_bound() {
        let h = harness(false, None, |s| s.max_header_bytes = 64);
        let mut session = h.factory.open().unwrap();

        // Valid prefix announcing 255 addon bytes, then one huge message of junk.
        let mut bytes = vec![0u8];
        bytes.extend_from_slice(secret().as_bytes());
        bytes.push(255);
        bytes.extend_from_slice(&[0xee; 4096]);
        let mut stream = futures_util::stream::iter(vec![Ok::<_, ChannelError>(Bytes::from(bytes))]);

        let err = session.read_header(&mut stream).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Protocol(RejectReason::BufferLimitExceeded { limit: 64 })
        ));
        assert_eq!(session.buffer.len(), 64);
        assert!(session.buffer.capacity() < 4096);
        assert_eq!(h.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn large_payload_in_header_message_arrives_intact() {
        let mut h = harness(false, None, |_| {});
        let (mut client, sink, stream) = memory::channel(16);
        let task = tokio::spawn(h.factory.open().unwrap().run(sink, stream));

        let payload: Vec<u8> = (0..100_000).map(|i| (i % 251) as u8).collect();
        client.send(&request(&secret(), "localhost", 80, &payload)).await;

        let (_, _, mut far) = h.accepted.recv().await.unwrap();
        let mut received = vec![0u8; payload.len()];
        far.read_exact(&mut received).await.unwrap();
        assert_eq!(received, payload);
        assert_eq!(client.read_exact(2).await, RESPONSE_ACK);

        drop(client);
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn data_sent_while_connecting_is_relayed_in_order() {
        let mut h = harness(false, Some(Duration::from_millis(200)), |_| {});
        let (mut client, sink, stream) = memory::channel(16);
        let task = tokio::spawn(h.factory.open().unwrap().run(sink, stream));

        client.send(&request(&secret(), "localhost", 80, b"")).await;
        // The mock hands out the far end before its dial delay elapses.
        let (_, _, mut far) = h.accepted.recv().await.unwrap();
        client.send(b"early-1").await;
        client.send(b"early-2").await;

        assert_eq!(client.read_exact(2).await, RESPONSE_ACK);
        let mut early = [0u8; 14];
        far.read_exact(&mut early).await.unwrap();
        assert_eq!(&early, b"early-1early-2");

        drop(client);
        let report = task.await.unwrap().unwrap();
        assert_eq!(report.client_to_upstream, 14);
    }

    #[tokio::test]
    async fn transport_error_while_connecting_is_reported() {
        let h = harness(false, Some(Duration::from_secs(30)), |s| s.connect_timeout = None);
        let (client, sink, stream) = memory::channel(16);
        let task = tokio::spawn(h.factory.open().unwrap().run(sink, stream));

        client.send(&request(&secret(), "localhost", 80, b"")).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        client.to_session.send(Err("transport reset".into())).await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("session should end promptly")
            .unwrap();
        assert!(matches!(result, Err(SessionError::Client(_))));
    }

    #[tokio::test]
    async fn refused_connect_sends_no_ack() {
        let h = harness(true, None, |_| {});
        let (mut client, sink, stream) = memory::channel(16);
        let task = tokio::spawn(h.factory.open().unwrap().run(sink, stream));

        client.send(&request(&secret(), "localhost", 9, b"")).await;

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, SessionError::UpstreamConnect { port: 9, .. }));
        assert!(client.read_to_end().await.is_empty());
        assert_eq!(h.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn slow_connect_times_out() {
        let h = harness(false, Some(Duration::from_secs(10)), |s| {
            s.connect_timeout = Some(Duration::from_millis(50));
        });
        let (mut client, sink, stream) = memory::channel(16);
        let task = tokio::spawn(h.factory.open().unwrap().run(sink, stream));

        let bytes = encode_header(
            &secret(),
            COMMAND_TCP,
            &TargetAddr::Ipv4(Ipv4Addr::new(203, 0, 113, 7)),
            8443,
            &[],
        )
        .unwrap();
        client.send(&bytes).await;

        let err = task.await.unwrap().unwrap_err();
        match err {
            SessionError::ConnectTimeout { target, port, .. } => {
                assert_eq!(target, "203.0.113.7");
                assert_eq!(port, 8443);
            }
            other => panic!("expected connect timeout, got {:?}", other),
        }
        assert!(client.read_to_end().await.is_empty());
    }

    #[tokio::test]
    async fn client_leaving_during_connect_cancels_it() {
        let h = harness(false, Some(Duration::from_secs(30)), |s| s.connect_timeout = None);
        let (client, sink, stream) = memory::channel(16);
        let task = tokio::spawn(h.factory.open().unwrap().run(sink, stream));

        client.send(&request(&secret(), "localhost", 80, b"")).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(client);

        let result = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("session should end promptly")
            .unwrap();
        assert!(matches!(result, Err(SessionError::ClientClosed)));
    }

    #[tokio::test]
    async fn client_closing_while_buffering() {
        let h = harness(false, None, |_| {});
        let (client, sink, stream) = memory::channel(16);
        let task = tokio::spawn(h.factory.open().unwrap().run(sink, stream));

        client.send(&[0u8, 0x5a, 0x5a]).await;
        drop(client);

        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, SessionError::ClientClosed));
        assert_eq!(h.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let h = harness(false, None, |_| {});
        let (_client, mut sink, _stream) = memory::channel(4);
        let mut session = h.factory.open().unwrap();
        assert_eq!(h.factory.tracker().active_count(), 1);

        session.close(&mut sink).await;
        session.close(&mut sink).await;
        assert_eq!(session.state(), SessionState::Closed);

        drop(session);
        assert_eq!(h.factory.tracker().active_count(), 0);
    }

    #[tokio::test]
    async fn factory_refuses_beyond_limit() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let connector = MockConnector {
            attempts: Arc::new(AtomicUsize::new(0)),
            refuse: false,
            delay: None,
            accepted: tx,
        };
        let factory = SessionFactory::new(
            Arc::new(TunnelSettings::with_secret(secret())),
            connector,
            SessionTracker::new(1),
        );

        let first = factory.open().unwrap();
        assert!(factory.open().is_none());
        drop(first);
        assert!(factory.open().is_some());
    }
}
