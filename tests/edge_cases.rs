#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Edge-case tests for boundary conditions and error scenarios

use bytes::{BufMut, BytesMut};
use repconn::core::codec::{decode_payload, encode_payload, FrameCodec, HEADER_LEN};
use repconn::error::ProtocolError;
use repconn::protocol::handshake::{parse_status_line, read_response_head, HandshakeTarget};
use repconn::utils::timeout::with_timeout_error;
use repconn::{BeginReplicationResponse, FileUploadResponse, SyncFileResponse};
use std::collections::HashMap;
use std::time::Duration;
use tokio::io::BufReader;
use tokio_util::codec::{Decoder, Encoder};

// ============================================================================
// FRAME CODEC EDGE CASES
// ============================================================================

#[test]
fn test_frame_empty_buffer() {
    let mut codec = FrameCodec::default();
    let mut buf = BytesMut::new();
    assert!(codec.decode(&mut buf).expect("empty").is_none());
}

#[test]
fn test_frame_truncated_header() {
    let mut codec = FrameCodec::default();
    let mut buf = BytesMut::from(&[0u8, 0, 1][..]);
    assert!(codec.decode(&mut buf).expect("truncated").is_none());
    assert_eq!(buf.len(), 3, "partial header must not be consumed");
}

#[test]
fn test_frame_exactly_at_bound() {
    let mut codec = FrameCodec::new(2048);
    let payload = vec![b'x'; 2048];
    let mut buf = BytesMut::new();
    codec.encode(&payload[..], &mut buf).expect("at bound");
    assert_eq!(buf.len(), HEADER_LEN + 2048);

    let frame = codec.decode(&mut buf).expect("decode").expect("frame");
    assert_eq!(frame.len(), 2048);
}

#[test]
fn test_frame_bound_clamped_to_prefix_width() {
    let codec = FrameCodec::new(usize::MAX);
    assert_eq!(codec.max_frame_len(), u32::MAX as usize);
    assert_eq!(
        codec.decode_header(u32::MAX.to_be_bytes()).expect("max"),
        u32::MAX as usize
    );
}

#[test]
fn test_frame_declared_length_larger_than_data_waits() {
    let mut codec = FrameCodec::default();
    let mut buf = BytesMut::new();
    buf.put_u32(1_000);
    buf.put_slice(&[b'a'; 10]);
    assert!(codec.decode(&mut buf).expect("partial").is_none());
    assert!(buf.capacity() >= HEADER_LEN + 1_000);
}

// ============================================================================
// PAYLOAD EDGE CASES
// ============================================================================

#[test]
fn test_empty_hashes_encode_as_object() {
    let bytes = encode_payload(&BeginReplicationResponse::default()).unwrap();
    assert_eq!(bytes, br#"{"Hashes":{}}"#);
}

#[test]
fn test_unicode_message_text() {
    let resp = SyncFileResponse {
        msg: "файл уже существует \u{1F4C1}".into(),
        ..SyncFileResponse::default()
    };
    let back: SyncFileResponse = decode_payload(&encode_payload(&resp).unwrap()).unwrap();
    assert_eq!(back, resp);
}

#[test]
fn test_many_hashes() {
    let hashes: HashMap<String, String> = (0..4096)
        .map(|i| (format!("{i:03x}"), format!("{:032x}", i * 7919)))
        .collect();
    let resp = BeginReplicationResponse { hashes };
    let back: BeginReplicationResponse = decode_payload(&encode_payload(&resp).unwrap()).unwrap();
    assert_eq!(back, resp);
}

#[test]
fn test_wrong_field_type_rejected() {
    let err = decode_payload::<FileUploadResponse>(br#"{"Success":"yes","Msg":""}"#).unwrap_err();
    assert!(matches!(err, ProtocolError::DeserializeError(_)));
}

#[test]
fn test_truncated_json_rejected() {
    let err = decode_payload::<FileUploadResponse>(br#"{"Success":true,"Ms"#).unwrap_err();
    assert!(matches!(err, ProtocolError::DeserializeError(_)));
}

// ============================================================================
// HANDSHAKE EDGE CASES
// ============================================================================

#[tokio::test]
async fn test_head_with_bare_lf_line_endings() {
    let wire = b"HTTP/1.1 204 No Content\nX-Backend: a\n\nrest".to_vec();
    let mut reader = BufReader::new(&wire[..]);
    assert_eq!(read_response_head(&mut reader, 1024).await.unwrap(), 204);
}

#[tokio::test]
async fn test_head_without_headers() {
    let wire = b"HTTP/1.1 200 OK\r\n\r\n".to_vec();
    let mut reader = BufReader::new(&wire[..]);
    assert_eq!(read_response_head(&mut reader, 1024).await.unwrap(), 200);
}

#[tokio::test]
async fn test_head_garbage_status_line() {
    let wire = b"\x00\x00\x00\x02{}\r\n\r\n".to_vec();
    let mut reader = BufReader::new(&wire[..]);
    let err = read_response_head(&mut reader, 1024).await.unwrap_err();
    assert!(matches!(err, ProtocolError::HandshakeError(_)));
}

#[tokio::test]
async fn test_head_empty_stream() {
    let wire: Vec<u8> = Vec::new();
    let mut reader = BufReader::new(&wire[..]);
    let err = read_response_head(&mut reader, 1024).await.unwrap_err();
    assert!(matches!(err, ProtocolError::HandshakeError(_)));
}

#[test]
fn test_status_line_reason_with_spaces() {
    assert_eq!(
        parse_status_line("HTTP/1.1 507 Insufficient Storage Here\r\n").unwrap(),
        507
    );
}

#[test]
fn test_hostname_target() {
    let target = HandshakeTarget::new("storage-3.example", 6000, "sdb1", "1023").unwrap();
    assert_eq!(target.authority(), "storage-3.example:6000");
    assert_eq!(target.to_string(), "http://storage-3.example:6000/sdb1/1023");
}

// ============================================================================
// TIMEOUT EDGE CASES
// ============================================================================

#[tokio::test]
async fn test_timeout_zero_duration() {
    let result: repconn::Result<()> = with_timeout_error(
        async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(())
        },
        Duration::ZERO,
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_timeout_immediate_complete() {
    let result = with_timeout_error(async { Ok(42) }, Duration::from_secs(1)).await;
    assert_eq!(result.unwrap(), 42);
}

// ============================================================================
// ERROR PROPAGATION EDGE CASES
// ============================================================================

#[test]
fn test_error_display_formatting() {
    let errors = vec![
        ProtocolError::DeviceUnmounted { status: 404 },
        ProtocolError::OversizedMessage(20_000_000),
        ProtocolError::InvalidAddress("device cannot be empty".into()),
        ProtocolError::HandshakeError("eof".into()),
        ProtocolError::DeserializeError("bad".into()),
    ];

    for err in errors {
        let display = format!("{err}");
        assert!(!display.is_empty());
    }
}
