//! # Utility Modules
//!
//! Supporting utilities shared by the connection layer.
//!
//! ## Components
//! - **Timeout**: Fixed protocol windows and the rolling per-operation deadline wrapper
//! - **Logging**: Structured logging configuration
//! - **Metrics**: Thread-safe observability counters

pub mod logging;
pub mod metrics;
pub mod timeout;
