//! # Error Types
//!
//! Error handling for replication connections.
//!
//! This module defines every error variant that can surface while establishing
//! a replication connection or exchanging messages over one.
//!
//! ## Error Categories
//! - **Establishment**: the transport could not be opened (`Io`), or the target
//!   address could not be built (`InvalidAddress`)
//! - **Handshake rejection**: the peer answered outside 2xx (`DeviceUnmounted`)
//! - **Handshake protocol**: the peer's response head was unreadable (`HandshakeError`)
//! - **Codec**: payload encode/decode failures (`SerializeError`, `DeserializeError`)
//! - **Framing / I/O**: short reads, deadlines, closed transports (`Io`, `OversizedMessage`)
//!
//! Deadline expiry is reported as `Io` with `io::ErrorKind::TimedOut`; callers that
//! need to tell a slow peer from a gone peer inspect the kind themselves.
//!
//! ## Example Usage
//! ```rust
//! use repconn::error::{ProtocolError, Result};
//!
//! fn check(status: u16) -> Result<()> {
//!     if !(200..300).contains(&status) {
//!         return Err(ProtocolError::DeviceUnmounted { status });
//!     }
//!     Ok(())
//! }
//!
//! assert!(check(404).unwrap_err().is_unmounted());
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Connection errors
    pub const ERR_CONNECTION_CLOSED: &str = "Connection closed";
    pub const ERR_TIMEOUT: &str = "Operation timed out";

    /// Handshake errors
    pub const ERR_HANDSHAKE_EOF: &str = "Peer closed the connection during the handshake";
    pub const ERR_HANDSHAKE_TOO_LARGE: &str = "Handshake response head exceeds the size limit";
    pub const ERR_MALFORMED_STATUS_LINE: &str = "Malformed handshake status line";

    /// Address errors
    pub const ERR_EMPTY_HOST: &str = "Host cannot be empty";
}

// ProtocolError is the primary error type for all replication connection operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Deserialize error: {0}")]
    DeserializeError(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Device unmounted (peer replied with status {status})")]
    DeviceUnmounted { status: u16 },

    #[error("Handshake failed: {0}")]
    HandshakeError(String),

    #[error("Message too large: {0} bytes")]
    OversizedMessage(usize),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ProtocolError {
    /// Whether this is the "device unmounted" handshake rejection
    pub fn is_unmounted(&self) -> bool {
        matches!(self, ProtocolError::DeviceUnmounted { .. })
    }

    /// The underlying I/O error kind, if this is an I/O failure
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            ProtocolError::Io(e) => Some(e.kind()),
            _ => None,
        }
    }

    /// Error returned by operations on a connection that has already been closed
    pub(crate) fn closed() -> Self {
        ProtocolError::Io(io::Error::new(
            io::ErrorKind::NotConnected,
            constants::ERR_CONNECTION_CLOSED,
        ))
    }

    /// Error returned when a rolling deadline elapses
    pub(crate) fn timed_out() -> Self {
        ProtocolError::Io(io::Error::new(io::ErrorKind::TimedOut, constants::ERR_TIMEOUT))
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
