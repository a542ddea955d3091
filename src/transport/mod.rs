//! # Transport Layer
//!
//! Opening the replication transport and driving an established connection.
//!
//! ## Components
//! - **Dialer**: injectable transport-opening strategy (`TcpDialer` by default)
//! - **Connection**: lifecycle, framed messages and the raw byte channel
//!
//! ## State Machine
//! ```text
//! Connecting --(2xx handshake)--> Established --(any failure / close)--> Disconnected
//! ```
//! Disconnected is terminal.

pub mod connection;
pub mod dialer;

pub use connection::Connection;
pub use dialer::{Dialer, TcpDialer};
