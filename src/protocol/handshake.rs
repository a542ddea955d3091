//! REPCONN handshake.
//!
//! A replication connection starts life as an HTTP/1.1 exchange: the dialer
//! sends a request whose method is the `REPCONN` token and whose path names
//! the device and partition, and the peer answers with a status line. A 2xx
//! answer means the peer has taken the socket out of its HTTP machinery, and
//! from then on both sides speak the framed protocol over the raw stream.
//! Anything else means the device is not mounted on that peer.
//!
//! The response head is read from the same buffered stream the connection
//! keeps afterwards, so bytes the peer sends right behind the head are not lost.

use std::fmt;
use std::net::IpAddr;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, instrument};

use crate::config::HANDSHAKE_METHOD;
use crate::error::{constants, ProtocolError, Result};

/// Bytes escaped in a path segment: everything but unreserved, sub-delims,
/// `:` and `@`. `%` passes through since segments may carry escapes already.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b':')
    .remove(b'@')
    .remove(b'%');

/// Where a replication connection is dialed and which device/partition it serves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeTarget {
    host: String,
    port: u16,
    device: String,
    partition: String,
}

impl HandshakeTarget {
    /// Build a target, rejecting anything that cannot form a valid request line.
    pub fn new(host: &str, port: u16, device: &str, partition: &str) -> Result<Self> {
        if host.is_empty() {
            return Err(ProtocolError::InvalidAddress(constants::ERR_EMPTY_HOST.into()));
        }
        if host.chars().any(|c| c.is_whitespace() || c.is_control() || c == '/') {
            return Err(ProtocolError::InvalidAddress(format!("invalid host: {host:?}")));
        }
        validate_segment("device", device)?;
        validate_segment("partition", partition)?;

        Ok(Self {
            host: host.to_string(),
            port,
            device: device.to_string(),
            partition: partition.to_string(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn partition(&self) -> &str {
        &self.partition
    }

    /// `host:port`, with IPv6 literals bracketed
    pub fn authority(&self) -> String {
        match self.host.parse::<IpAddr>() {
            Ok(IpAddr::V6(_)) => format!("[{}]:{}", self.host, self.port),
            _ => format!("{}:{}", self.host, self.port),
        }
    }

    /// `/{device}/{partition}`, percent-encoded
    pub fn path(&self) -> String {
        format!(
            "/{}/{}",
            utf8_percent_encode(&self.device, SEGMENT),
            utf8_percent_encode(&self.partition, SEGMENT)
        )
    }

    pub fn url(&self) -> String {
        format!("http://{}{}", self.authority(), self.path())
    }

    /// The full request head, terminated by the blank line
    pub fn render_request(&self) -> String {
        format!(
            "{HANDSHAKE_METHOD} {} HTTP/1.1\r\nHost: {}\r\nUser-Agent: repconn/{}\r\n\r\n",
            self.path(),
            self.authority(),
            env!("CARGO_PKG_VERSION"),
        )
    }
}

impl fmt::Display for HandshakeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url())
    }
}

fn validate_segment(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ProtocolError::InvalidAddress(format!("{name} cannot be empty")));
    }
    if value
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '/' | '?' | '#'))
    {
        return Err(ProtocolError::InvalidAddress(format!(
            "{name} is not a single path segment: {value:?}"
        )));
    }

    let bytes = value.as_bytes();
    for (i, _) in value.match_indices('%') {
        let escape = bytes.get(i + 1..i + 3);
        if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
            return Err(ProtocolError::InvalidAddress(format!(
                "{name} has an invalid escape: {value:?}"
            )));
        }
    }
    Ok(())
}

/// Map a handshake status to the connection outcome. Only 2xx establishes.
pub fn classify_status(status: u16) -> Result<()> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(ProtocolError::DeviceUnmounted { status })
    }
}

/// Parse `HTTP/1.x NNN reason` into its status code
pub fn parse_status_line(line: &str) -> Result<u16> {
    let mut parts = line.trim_end().splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    let code = parts.next().unwrap_or_default();

    if !version.starts_with("HTTP/") || code.len() != 3 {
        return Err(ProtocolError::HandshakeError(format!(
            "{}: {line:?}",
            constants::ERR_MALFORMED_STATUS_LINE
        )));
    }

    code.parse::<u16>().map_err(|_| {
        ProtocolError::HandshakeError(format!(
            "{}: {line:?}",
            constants::ERR_MALFORMED_STATUS_LINE
        ))
    })
}

/// Read the response head (status line and headers) and return the status.
///
/// Consumes exactly up to and including the blank line; later bytes stay buffered.
pub async fn read_response_head<R>(reader: &mut R, max_bytes: usize) -> Result<u16>
where
    R: AsyncBufRead + Unpin,
{
    let mut limited = reader.take(max_bytes as u64);
    let mut head = Vec::new();
    let mut status_line_end = None;

    loop {
        let start = head.len();
        let n = limited.read_until(b'\n', &mut head).await?;
        if n == 0 {
            let msg = if limited.limit() == 0 {
                constants::ERR_HANDSHAKE_TOO_LARGE
            } else {
                constants::ERR_HANDSHAKE_EOF
            };
            return Err(ProtocolError::HandshakeError(msg.into()));
        }

        let line = &head[start..];
        if status_line_end.is_none() {
            status_line_end = Some(head.len());
            continue;
        }
        if line == b"\r\n" || line == b"\n" {
            break;
        }
    }

    let status_line = &head[..status_line_end.unwrap_or_default()];
    let status_line = std::str::from_utf8(status_line).map_err(|_| {
        ProtocolError::HandshakeError(constants::ERR_MALFORMED_STATUS_LINE.into())
    })?;
    parse_status_line(status_line)
}

/// Send the REPCONN request over `stream` and classify the peer's answer.
#[instrument(skip(stream, target), fields(target = %target))]
pub async fn perform<S>(stream: &mut S, target: &HandshakeTarget, max_bytes: usize) -> Result<()>
where
    S: AsyncBufRead + AsyncWrite + Unpin,
{
    stream.write_all(target.render_request().as_bytes()).await?;
    stream.flush().await?;

    let status = read_response_head(stream, max_bytes).await?;
    debug!(status, "Handshake response");
    classify_status(status)
}
