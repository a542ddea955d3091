//! # Core Protocol Components
//!
//! Low-level framing and payload encoding for the replication wire protocol.
//!
//! ## Components
//! - **Codec**: length-prefixed framing plus the JSON payload encoding
//!
//! ## Wire Format
//! ```text
//! [Length(4, big-endian)] [Payload(N, JSON)]
//! ```
//!
//! There is no magic, version or type tag. The caller's message sequencing
//! decides which schema the next payload must match.
//!
//! ## Safety
//! - Declared length is validated against the configured maximum before allocation

pub mod codec;
