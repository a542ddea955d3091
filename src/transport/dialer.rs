//! Transport-opening strategies.
//!
//! Establishment takes a [`Dialer`] explicitly. [`TcpDialer`] is the real
//! network dialer; tests hand in their own implementation to substitute
//! in-memory streams or to simulate dial failures.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use socket2::{SockRef, TcpKeepalive};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, instrument};

use crate::config::ConnectionConfig;
use crate::utils::timeout::{CONNECT_TIMEOUT, KEEPALIVE_INTERVAL};

/// Opens the duplex transport a replication connection runs over
#[async_trait]
pub trait Dialer: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Open a transport to `authority` (`host:port`)
    async fn dial(&self, authority: &str) -> io::Result<Self::Stream>;
}

/// Dials TCP with a bounded connect timeout and keep-alive probing
#[derive(Debug, Clone, Copy)]
pub struct TcpDialer {
    connect_timeout: Duration,
    keepalive_interval: Duration,
}

impl Default for TcpDialer {
    fn default() -> Self {
        Self {
            connect_timeout: CONNECT_TIMEOUT,
            keepalive_interval: KEEPALIVE_INTERVAL,
        }
    }
}

impl TcpDialer {
    pub fn new(connect_timeout: Duration, keepalive_interval: Duration) -> Self {
        Self {
            connect_timeout,
            keepalive_interval,
        }
    }

    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self::new(config.connect_timeout, config.keepalive_interval)
    }
}

#[async_trait]
impl Dialer for TcpDialer {
    type Stream = TcpStream;

    #[instrument(skip(self))]
    async fn dial(&self, authority: &str) -> io::Result<TcpStream> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(authority))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))??;

        let keepalive = TcpKeepalive::new()
            .with_time(self.keepalive_interval)
            .with_interval(self.keepalive_interval);
        SockRef::from(&stream).set_tcp_keepalive(&keepalive)?;
        stream.set_nodelay(true)?;

        debug!(peer = ?stream.peer_addr().ok(), "Transport open");
        Ok(stream)
    }
}
