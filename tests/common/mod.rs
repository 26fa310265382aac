//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use tunnel_relay::config::TunnelSettings;
use tunnel_relay::http::HttpServer;
use tunnel_relay::lifecycle::Shutdown;
use tunnel_relay::net::SessionTracker;
use tunnel_relay::protocol::{encode_header, Secret, TargetAddr, COMMAND_TCP};

pub type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long any single await in a test may take.
pub const STEP: Duration = Duration::from_secs(5);

/// A TCP destination and the number of connections it accepted.
pub struct Upstream {
    pub addr: SocketAddr,
    pub accepted: Arc<AtomicUsize>,
}

impl Upstream {
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

/// Start a destination that echoes every byte back.
pub async fn start_echo_upstream() -> Upstream {
    start_upstream(|mut socket| async move {
        let mut buf = vec![0u8; 8192];
        loop {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if socket.write_all(&buf[..n]).await.is_err() {
                        break;
                    }
                }
            }
        }
    })
    .await
}

/// Start a destination that writes `greeting` and closes the connection.
pub async fn start_greeting_upstream(greeting: &'static [u8]) -> Upstream {
    start_upstream(move |mut socket| async move {
        let _ = socket.write_all(greeting).await;
        let _ = socket.shutdown().await;
    })
    .await
}

async fn start_upstream<F, Fut>(handler: F) -> Upstream
where
    F: Fn(TcpStream) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&accepted);

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(handler(socket));
        }
    });

    Upstream { addr, accepted }
}

/// A relay running on an ephemeral port.
pub struct Relay {
    pub addr: SocketAddr,
    pub secret: Secret,
    pub ws_path: String,
    pub shutdown: Shutdown,
    pub tracker: SessionTracker,
    pub server: JoinHandle<std::io::Result<()>>,
}

impl Relay {
    pub fn url(&self) -> String {
        format!("ws://{}{}", self.addr, self.ws_path)
    }

    pub async fn connect(&self) -> Client {
        let (client, _) = tokio::time::timeout(STEP, connect_async(self.url()))
            .await
            .expect("connect timed out")
            .expect("WebSocket handshake failed");
        client
    }
}

/// Start a relay with default settings, adjusted by `tweak`.
pub async fn start_relay(max_sessions: usize, tweak: impl FnOnce(&mut TunnelSettings)) -> Relay {
    let secret = Secret::random();
    let mut settings = TunnelSettings::with_secret(secret.clone());
    tweak(&mut settings);
    let ws_path = settings.ws_path.clone();

    let tracker = SessionTracker::new(max_sessions);
    let shutdown = Shutdown::new();
    let server = HttpServer::new(Arc::new(settings), tracker.clone());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server_shutdown = shutdown.subscribe();
    let server = tokio::spawn(server.run(listener, server_shutdown));

    Relay {
        addr,
        secret,
        ws_path,
        shutdown,
        tracker,
        server,
    }
}

/// Request header for `addr`, followed by `payload`.
pub fn request(secret: &Secret, addr: SocketAddr, payload: &[u8]) -> Vec<u8> {
    let target = match addr {
        SocketAddr::V4(v4) => TargetAddr::Ipv4(*v4.ip()),
        SocketAddr::V6(v6) => TargetAddr::Ipv6(*v6.ip()),
    };
    let mut bytes = encode_header(secret, COMMAND_TCP, &target, addr.port(), &[]).unwrap();
    bytes.extend_from_slice(payload);
    bytes
}

pub async fn send(client: &mut Client, data: &[u8]) {
    client.send(Message::binary(data.to_vec())).await.unwrap();
}

/// Read binary messages until at least `n` bytes arrived.
pub async fn read_bytes(client: &mut Client, n: usize) -> Vec<u8> {
    let mut out = Vec::new();
    while out.len() < n {
        let message = tokio::time::timeout(STEP, client.next())
            .await
            .expect("read timed out")
            .expect("relay closed the connection")
            .expect("WebSocket error");
        match message {
            Message::Binary(data) => out.extend_from_slice(&data),
            Message::Close(_) => panic!("relay closed after {} of {} bytes", out.len(), n),
            _ => {}
        }
    }
    out
}

/// Collect binary payload until the relay closes the connection.
pub async fn read_until_closed(client: &mut Client) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let next = tokio::time::timeout(STEP, client.next())
            .await
            .expect("relay did not close the connection");
        match next {
            Some(Ok(Message::Binary(data))) => out.extend_from_slice(&data),
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return out,
            Some(Ok(_)) => {}
        }
    }
}
