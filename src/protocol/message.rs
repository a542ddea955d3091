//! Replication message schemas.
//!
//! Five plain records travel over a replication connection. The wire carries
//! no type tag, so the set is closed: only types implementing the sealed
//! [`ReplicationMessage`] trait can be sent or received, and the caller's
//! sequencing decides which one comes next.
//!
//! Field names on the wire are PascalCase (`Device`, `NeedHashes`, ...), as
//! existing peers expect.

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

mod sealed {
    pub trait Sealed {}
}

/// A message that may travel over a replication connection.
pub trait ReplicationMessage:
    sealed::Sealed + Serialize + DeserializeOwned + std::fmt::Debug + Send + Sync
{
    /// Name used in logs
    const KIND: &'static str;
}

/// Opens a replication session for one partition of one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BeginReplicationRequest {
    pub device: String,
    pub partition: String,
    pub need_hashes: bool,
}

/// Suffix hashes of the partition, when they were asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BeginReplicationResponse {
    #[serde(deserialize_with = "null_as_empty")]
    pub hashes: HashMap<String, String>,
}

/// Asks whether the peer needs a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SyncFileRequest {
    pub path: String,
    pub xattrs: String,
    pub size: i64,
}

/// The peer's answer to a [`SyncFileRequest`]. `go_ahead` means raw file bytes follow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SyncFileResponse {
    pub exists: bool,
    pub newer_exists: bool,
    pub go_ahead: bool,
    pub msg: String,
}

/// Outcome of a raw file upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileUploadResponse {
    pub success: bool,
    pub msg: String,
}

// Peers encode an empty mapping as `null`.
fn null_as_empty<'de, D>(deserializer: D) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<HashMap<String, String>>::deserialize(deserializer)?.unwrap_or_default())
}

macro_rules! replication_message {
    ($($ty:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}
            impl ReplicationMessage for $ty {
                const KIND: &'static str = stringify!($ty);
            }
        )*
    };
}

replication_message!(
    BeginReplicationRequest,
    BeginReplicationResponse,
    SyncFileRequest,
    SyncFileResponse,
    FileUploadResponse,
);
