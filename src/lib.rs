//! # repconn
//!
//! Connection and wire-protocol layer that storage nodes use to replicate
//! data with one another.
//!
//! A replication connection is opened with an HTTP/1.1-style `REPCONN`
//! request to `/{device}/{partition}`. Once the peer answers 2xx, the socket
//! leaves HTTP behind and carries a private duplex protocol:
//!
//! ```text
//! [Length(4, big-endian)] [JSON payload(Length)]
//! ```
//!
//! interleaved with raw byte runs (file content) whenever the caller's
//! message sequence says they follow. A non-2xx answer means the device is
//! not mounted on the peer.
//!
//! ## Failure model
//! Every failure on an established connection closes it before the error is
//! returned. There is no retry inside this crate; callers own retry and
//! backoff.
//!
//! ## Modules
//! - [`config`]: timeouts, size limits and logging settings
//! - [`core`]: length-prefixed framing and payload encoding
//! - [`protocol`]: message schemas and the handshake
//! - [`transport`]: dialers and the [`Connection`] itself
//! - [`utils`]: deadlines, logging and metrics

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod utils;

pub use config::{ConnectionConfig, ReplicationConfig};
pub use error::{ProtocolError, Result};
pub use protocol::message::{
    BeginReplicationRequest, BeginReplicationResponse, FileUploadResponse, ReplicationMessage,
    SyncFileRequest, SyncFileResponse,
};
pub use transport::{Connection, Dialer, TcpDialer};
