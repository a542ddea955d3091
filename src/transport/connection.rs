//! Replication connection.
//!
//! A [`Connection`] owns one duplex transport behind a buffered reader/writer
//! pair and a sticky `disconnected` flag. It is produced by a successful
//! REPCONN handshake and driven by exactly one caller at a time: every I/O
//! method takes `&mut self`.
//!
//! Two kinds of traffic share the transport and its buffers:
//! - framed control messages ([`Connection::send`], [`Connection::recv`])
//! - raw bytes such as file content ([`Connection::write`], [`Connection::read`],
//!   [`Connection::flush`])
//!
//! Ordering between the two is up to the caller. Each operation gets a fresh
//! deadline: the output window for send/write/flush and the input window for
//! recv/read. Any failure closes the connection before the error is returned,
//! so an operation either fully succeeds or leaves the connection dead.
//!
//! ```ignore
//! let mut conn = Connection::connect("10.0.0.2", 6000, "sdb1", "42").await?;
//! conn.send(&BeginReplicationRequest { device: "sdb1".into(), partition: "42".into(), need_hashes: true }).await?;
//! let hashes: BeginReplicationResponse = conn.recv().await?;
//! ```

use std::fmt;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio_util::codec::Encoder;
use tracing::{debug, info, instrument, warn};

use crate::config::ConnectionConfig;
use crate::core::codec::{decode_payload, encode_payload, FrameCodec, HEADER_LEN};
use crate::error::{ProtocolError, Result};
use crate::protocol::handshake::{self, HandshakeTarget};
use crate::protocol::message::ReplicationMessage;
use crate::transport::dialer::{Dialer, TcpDialer};
use crate::utils::metrics::{global_metrics, Timer};
use crate::utils::timeout::with_timeout_error;

/// An established replication stream to one peer
pub struct Connection<S = TcpStream> {
    stream: Option<BufStream<S>>,
    disconnected: bool,
    codec: FrameCodec,
    read_timeout: Duration,
    write_timeout: Duration,
    peer: String,
}

impl Connection<TcpStream> {
    /// Dial `host:port` over TCP with the default windows and perform the
    /// REPCONN handshake for `/{device}/{partition}`.
    pub async fn connect(host: &str, port: u16, device: &str, partition: &str) -> Result<Self> {
        let config = ConnectionConfig::default();
        Self::connect_with(
            &TcpDialer::from_config(&config),
            &config,
            host,
            port,
            device,
            partition,
        )
        .await
    }
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Open a transport with `dialer` and perform the REPCONN handshake.
    ///
    /// A non-2xx answer yields [`ProtocolError::DeviceUnmounted`]; on any
    /// failure the transport is released and no connection exists.
    #[instrument(skip(dialer, config))]
    pub async fn connect_with<D>(
        dialer: &D,
        config: &ConnectionConfig,
        host: &str,
        port: u16,
        device: &str,
        partition: &str,
    ) -> Result<Self>
    where
        D: Dialer<Stream = S>,
    {
        let target = HandshakeTarget::new(host, port, device, partition)?;
        let metrics = global_metrics();
        let _timer = Timer::start("replication_connect");

        let raw = match dialer.dial(&target.authority()).await {
            Ok(raw) => raw,
            Err(e) => {
                metrics.connection_error();
                warn!(target = %target, error = %e, "Failed to open replication transport");
                return Err(ProtocolError::Io(e));
            }
        };

        metrics.handshake_attempt();
        let mut stream = BufStream::new(raw);
        let handshake = with_timeout_error(
            handshake::perform(&mut stream, &target, config.max_handshake_bytes),
            config.read_timeout,
        )
        .await;

        if let Err(e) = handshake {
            if e.is_unmounted() {
                metrics.handshake_rejected();
            }
            warn!(target = %target, error = %e, "Replication handshake failed");
            return Err(e);
        }

        metrics.handshake_success();
        info!(target = %target, "Replication connection established");
        Ok(Self::from_buffered(stream, config, target.to_string()))
    }

    /// Wrap a transport that has already been through the handshake,
    /// e.g. on the accepting side after it has answered 2xx.
    pub fn from_stream(stream: S, peer: impl Into<String>, config: &ConnectionConfig) -> Self {
        Self::from_buffered(BufStream::new(stream), config, peer.into())
    }

    fn from_buffered(stream: BufStream<S>, config: &ConnectionConfig, peer: String) -> Self {
        global_metrics().connection_established();
        Self {
            stream: Some(stream),
            disconnected: false,
            codec: FrameCodec::new(config.max_message_size),
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
            peer,
        }
    }

    /// Send one framed message and flush it to the transport.
    #[instrument(level = "debug", skip_all, fields(peer = %self.peer, kind = M::KIND))]
    pub async fn send<M: ReplicationMessage>(&mut self, msg: &M) -> Result<()> {
        let payload = match encode_payload(msg) {
            Ok(payload) => payload,
            Err(e) => return self.fail("send", e),
        };

        let Some(stream) = self.stream.as_mut() else {
            return Err(ProtocolError::closed());
        };
        let mut codec = self.codec;
        let result =
            with_timeout_error(write_frame(stream, &mut codec, &payload), self.write_timeout).await;

        match result {
            Ok(written) => {
                global_metrics().message_sent(written as u64);
                debug!(bytes = written, "Message sent");
                Ok(())
            }
            Err(e) => self.fail("send", e),
        }
    }

    /// Receive one framed message and decode it as `M`.
    #[instrument(level = "debug", skip_all, fields(peer = %self.peer, kind = M::KIND))]
    pub async fn recv<M: ReplicationMessage>(&mut self) -> Result<M> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(ProtocolError::closed());
        };
        let codec = self.codec;
        let result = with_timeout_error(
            async {
                let payload = read_frame(stream, &codec).await?;
                let msg = decode_payload::<M>(&payload)?;
                Ok::<_, ProtocolError>((msg, HEADER_LEN + payload.len()))
            },
            self.read_timeout,
        )
        .await;

        match result {
            Ok((msg, received)) => {
                global_metrics().message_received(received as u64);
                debug!(bytes = received, "Message received");
                Ok(msg)
            }
            Err(e) => self.fail("recv", e),
        }
    }

    /// Buffer raw bytes for the peer. Nothing reaches the transport until
    /// the buffer fills or [`Connection::flush`] is called.
    pub async fn write(&mut self, data: &[u8]) -> Result<usize> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(ProtocolError::closed());
        };
        let result = with_timeout_error(
            async {
                stream.write_all(data).await?;
                Ok::<_, ProtocolError>(data.len())
            },
            self.write_timeout,
        )
        .await;

        match result {
            Ok(n) => {
                global_metrics().raw_written(n as u64);
                Ok(n)
            }
            Err(e) => self.fail("write", e),
        }
    }

    /// Push buffered raw bytes to the transport.
    pub async fn flush(&mut self) -> Result<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(ProtocolError::closed());
        };
        let result = with_timeout_error(
            async {
                stream.flush().await?;
                Ok::<_, ProtocolError>(())
            },
            self.write_timeout,
        )
        .await;

        match result {
            Ok(()) => Ok(()),
            Err(e) => self.fail("flush", e),
        }
    }

    /// Fill `buf` entirely with raw bytes from the peer. A short read is an error.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(ProtocolError::closed());
        };
        let result = with_timeout_error(
            async {
                stream.read_exact(buf).await?;
                Ok::<_, ProtocolError>(buf.len())
            },
            self.read_timeout,
        )
        .await;

        match result {
            Ok(n) => {
                global_metrics().raw_read(n as u64);
                Ok(n)
            }
            Err(e) => self.fail("read", e),
        }
    }
}

impl<S> Connection<S> {
    /// Mark the connection disconnected and release the transport.
    ///
    /// Repeated calls are no-ops. Buffered but unflushed output is discarded.
    pub fn close(&mut self) {
        self.disconnected = true;
        if let Some(stream) = self.stream.take() {
            drop(stream);
            global_metrics().connection_closed();
            debug!(peer = %self.peer, "Replication connection closed");
        }
    }

    /// Whether the connection has been closed. Once true, stays true.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    /// Label of the remote end, for logs
    pub fn peer(&self) -> &str {
        &self.peer
    }

    fn fail<T>(&mut self, op: &'static str, err: ProtocolError) -> Result<T> {
        warn!(peer = %self.peer, op, error = %err, "Replication connection failed, closing");
        global_metrics().connection_failure();
        self.close();
        Err(err)
    }
}

impl<S> Drop for Connection<S> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<S> fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("peer", &self.peer)
            .field("disconnected", &self.disconnected)
            .field("max_message_size", &self.codec.max_frame_len())
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .finish()
    }
}

async fn write_frame<S>(
    stream: &mut BufStream<S>,
    codec: &mut FrameCodec,
    payload: &[u8],
) -> Result<usize>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut frame = BytesMut::with_capacity(HEADER_LEN + payload.len());
    codec.encode(payload, &mut frame)?;
    stream.write_all(&frame).await?;
    stream.flush().await?;
    Ok(frame.len())
}

async fn read_frame<S>(stream: &mut BufStream<S>, codec: &FrameCodec) -> Result<Vec<u8>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut header = [0u8; HEADER_LEN];
    stream.read_exact(&mut header).await?;
    let len = codec.decode_header(header)?;

    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await?;
    Ok(payload)
}
