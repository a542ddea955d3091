//! # Replication Protocol
//!
//! Message schemas and the REPCONN handshake that opens a replication stream.
//!
//! ## Components
//! - **Message**: the five schemas exchanged between peers and the sealed
//!   `ReplicationMessage` capability that closes the set
//! - **Handshake**: target address construction, request rendering and
//!   response status classification

pub mod handshake;
pub mod message;

#[cfg(test)]
mod tests;
