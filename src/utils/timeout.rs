//! Fixed protocol windows and the rolling deadline wrapper.
//!
//! Every connection operation computes its own deadline as "now + window"
//! when it starts. Nothing carries over between operations, so a steady
//! stream of small operations keeps a connection alive indefinitely.

use crate::error::{ProtocolError, Result};
use std::future::Future;
use std::time::Duration;

/// Dial timeout for opening the transport
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// TCP keep-alive probe interval on the dialed transport
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Input window: receiving may wait on peer-side work such as hashing a partition
pub const READ_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Output window: writes into a healthy peer's socket buffer are never slow
pub const WRITE_TIMEOUT: Duration = Duration::from_secs(60);

/// Run `fut` under a fresh deadline of `window` from now.
///
/// Expiry is reported as `ProtocolError::Io` with `io::ErrorKind::TimedOut`.
pub async fn with_timeout_error<F, T>(fut: F, window: Duration) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(window, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProtocolError::timed_out()),
    }
}
