//! Outbound connections to requested destinations.

use std::future::Future;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::protocol::TargetAddr;

/// Opens the destination-facing stream for a session.
///
/// Exactly one attempt is made per session; implementations do not retry.
pub trait Connector: Send + Sync + 'static {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn connect(
        &self,
        target: &TargetAddr,
        port: u16,
    ) -> impl Future<Output = io::Result<Self::Stream>> + Send;
}

/// Plain TCP dialer. Domains are resolved by the system resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn connect(
        &self,
        target: &TargetAddr,
        port: u16,
    ) -> impl Future<Output = io::Result<TcpStream>> + Send {
        let target = target.clone();
        async move {
            let stream = match target {
                TargetAddr::Ipv4(ip) => TcpStream::connect((ip, port)).await?,
                TargetAddr::Ipv6(ip) => TcpStream::connect((ip, port)).await?,
                TargetAddr::Domain(host) => TcpStream::connect((host.as_str(), port)).await?,
            };
            stream.set_nodelay(true)?;
            Ok(stream)
        }
    }
}
