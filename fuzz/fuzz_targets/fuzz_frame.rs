#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use repconn::core::codec::{decode_payload, FrameCodec};
use repconn::{
    BeginReplicationRequest, BeginReplicationResponse, FileUploadResponse, SyncFileRequest,
    SyncFileResponse,
};
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // Small bound so hostile length prefixes are exercised cheaply
    let mut codec = FrameCodec::new(64 * 1024);
    let mut buf = BytesMut::from(data);

    while let Ok(Some(frame)) = codec.decode(&mut buf) {
        let _ = decode_payload::<BeginReplicationRequest>(&frame);
        let _ = decode_payload::<BeginReplicationResponse>(&frame);
        let _ = decode_payload::<SyncFileRequest>(&frame);
        let _ = decode_payload::<SyncFileResponse>(&frame);
        let _ = decode_payload::<FileUploadResponse>(&frame);
    }
});
