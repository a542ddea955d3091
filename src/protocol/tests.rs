// test-only module included via protocol/mod.rs
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use crate::core::codec::{decode_payload, encode_payload};
use crate::error::ProtocolError;
use crate::protocol::handshake::*;
use crate::protocol::message::*;
use std::collections::HashMap;
use tokio::io::{AsyncReadExt, BufReader};

// =================== Message schemas ===================

#[test]
fn test_wire_field_names_are_pascal_case() {
    let req = BeginReplicationRequest {
        device: "sdb1".into(),
        partition: "42".into(),
        need_hashes: true,
    };
    let json: serde_json::Value = serde_json::from_slice(&encode_payload(&req).unwrap()).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"Device": "sdb1", "Partition": "42", "NeedHashes": true})
    );

    let resp = SyncFileResponse {
        exists: false,
        newer_exists: true,
        go_ahead: false,
        msg: "newer".into(),
    };
    let json: serde_json::Value = serde_json::from_slice(&encode_payload(&resp).unwrap()).unwrap();
    assert_eq!(json["NewerExists"], true);
    assert_eq!(json["GoAhead"], false);
    assert_eq!(json["Msg"], "newer");
}

#[test]
fn test_decode_ignores_field_order_and_unknown_fields() {
    let raw = br#"{"Size": -1, "Extra": [1, 2], "Xattrs": "", "Path": "/objects/1/abc/d.data"}"#;
    let req: SyncFileRequest = decode_payload(raw).unwrap();
    assert_eq!(
        req,
        SyncFileRequest {
            path: "/objects/1/abc/d.data".into(),
            xattrs: String::new(),
            size: -1,
        }
    );
}

#[test]
fn test_missing_field_is_decode_error() {
    let err = decode_payload::<FileUploadResponse>(br#"{"Success": true}"#).unwrap_err();
    assert!(matches!(err, ProtocolError::DeserializeError(_)));
}

#[test]
fn test_null_hashes_decode_as_empty() {
    let resp: BeginReplicationResponse = decode_payload(br#"{"Hashes": null}"#).unwrap();
    assert!(resp.hashes.is_empty());

    let resp: BeginReplicationResponse =
        decode_payload(br#"{"Hashes": {"0": "abc123", "fff": "d41d8c"}}"#).unwrap();
    assert_eq!(resp.hashes.len(), 2);
    assert_eq!(resp.hashes["0"], "abc123");
}

#[test]
fn test_size_is_64_bit() {
    let big = SyncFileRequest {
        path: "p".into(),
        xattrs: "x".into(),
        size: i64::MAX,
    };
    let back: SyncFileRequest = decode_payload(&encode_payload(&big).unwrap()).unwrap();
    assert_eq!(back.size, i64::MAX);
}

#[test]
fn test_kind_names() {
    assert_eq!(BeginReplicationRequest::KIND, "BeginReplicationRequest");
    assert_eq!(FileUploadResponse::KIND, "FileUploadResponse");
}

#[test]
fn test_wrong_schema_is_decode_error() {
    let mut hashes = HashMap::new();
    hashes.insert("0".to_string(), "abc123".to_string());
    let bytes = encode_payload(&BeginReplicationResponse { hashes }).unwrap();
    assert!(decode_payload::<SyncFileResponse>(&bytes).is_err());
}

// =================== Handshake target ===================

#[test]
fn test_target_renders_request() {
    let target = HandshakeTarget::new("10.1.2.3", 6000, "sdb1", "42").unwrap();
    assert_eq!(target.authority(), "10.1.2.3:6000");
    assert_eq!(target.path(), "/sdb1/42");
    assert_eq!(target.url(), "http://10.1.2.3:6000/sdb1/42");

    let request = target.render_request();
    assert!(request.starts_with("REPCONN /sdb1/42 HTTP/1.1\r\nHost: 10.1.2.3:6000\r\n"));
    assert!(request.ends_with("\r\n\r\n"));
}

#[test]
fn test_target_escapes_path_segments() {
    let target = HandshakeTarget::new("10.1.2.3", 6000, "dév", "a%2Fb").unwrap();
    assert_eq!(target.device(), "dév");
    assert_eq!(target.path(), "/d%C3%A9v/a%2Fb");
    assert!(target
        .render_request()
        .starts_with("REPCONN /d%C3%A9v/a%2Fb HTTP/1.1\r\n"));

    let target = HandshakeTarget::new("h", 6000, "sd-b.1_~", "x:y@z!$&'()*+,;=").unwrap();
    assert_eq!(target.path(), "/sd-b.1_~/x:y@z!$&'()*+,;=");

    let target = HandshakeTarget::new("h", 6000, "a\"b<c>", "[42]").unwrap();
    assert_eq!(target.path(), "/a%22b%3Cc%3E/%5B42%5D");
}

#[test]
fn test_target_brackets_ipv6() {
    let target = HandshakeTarget::new("::1", 6000, "sdb1", "42").unwrap();
    assert_eq!(target.authority(), "[::1]:6000");
}

#[test]
fn test_target_rejects_bad_segments() {
    for (host, device, partition) in [
        ("", "sdb1", "42"),
        ("host with space", "sdb1", "42"),
        ("h", "", "42"),
        ("h", "sdb1", ""),
        ("h", "sd/b1", "42"),
        ("h", "sdb1", "4 2"),
        ("h", "sdb1", "42?x"),
        ("h", "sdb1\r\n", "42"),
        ("127.0.0.1", "dév%", "42"),
        ("h", "sdb1", "42%4"),
        ("h", "%zz", "42"),
        ("h", "sdb1", "%"),
    ] {
        let err = HandshakeTarget::new(host, 6000, device, partition).unwrap_err();
        assert!(
            matches!(err, ProtocolError::InvalidAddress(_)),
            "{host:?} {device:?} {partition:?}"
        );
    }
}

// =================== Status handling ===================

#[test]
fn test_classify_status() {
    for status in [200, 201, 204, 299] {
        assert!(classify_status(status).is_ok());
    }
    for status in [100, 199, 300, 404, 500, 507] {
        match classify_status(status) {
            Err(ProtocolError::DeviceUnmounted { status: s }) => assert_eq!(s, status),
            other => panic!("unexpected {other:?}"),
        }
    }
}

#[test]
fn test_parse_status_line() {
    assert_eq!(parse_status_line("HTTP/1.1 200 OK\r\n").unwrap(), 200);
    assert_eq!(parse_status_line("HTTP/1.0 507 Insufficient Storage").unwrap(), 507);
    assert_eq!(parse_status_line("HTTP/1.1 404").unwrap(), 404);

    for bad in ["", "garbage", "HTTP/1.1 20 OK", "HTTP/1.1 abc OK", "SIP/2.0 200 OK"] {
        assert!(
            matches!(parse_status_line(bad), Err(ProtocolError::HandshakeError(_))),
            "{bad:?}"
        );
    }
}

#[tokio::test]
async fn test_read_head_keeps_trailing_bytes() {
    let wire = b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n\x00\x00\x00\x02{}".to_vec();
    let mut reader = BufReader::new(&wire[..]);

    let status = read_response_head(&mut reader, 1024).await.unwrap();
    assert_eq!(status, 200);

    let mut rest = Vec::new();
    reader.read_to_end(&mut rest).await.unwrap();
    assert_eq!(rest, b"\x00\x00\x00\x02{}");
}

#[tokio::test]
async fn test_read_head_eof() {
    let wire = b"HTTP/1.1 200 OK\r\nServer: x\r\n".to_vec();
    let mut reader = BufReader::new(&wire[..]);
    let err = read_response_head(&mut reader, 1024).await.unwrap_err();
    assert!(matches!(err, ProtocolError::HandshakeError(_)));
}

#[tokio::test]
async fn test_read_head_too_large() {
    let mut wire = b"HTTP/1.1 200 OK\r\nX-Pad: ".to_vec();
    wire.extend(std::iter::repeat(b'a').take(4096));
    wire.extend_from_slice(b"\r\n\r\n");
    let mut reader = BufReader::new(&wire[..]);

    match read_response_head(&mut reader, 512).await {
        Err(ProtocolError::HandshakeError(msg)) => assert!(msg.contains("size limit")),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn test_perform_writes_request_and_classifies() {
    let target = HandshakeTarget::new("127.0.0.1", 6000, "sdb1", "42").unwrap();
    let (client, server) = tokio::io::duplex(4096);
    let mut client = tokio::io::BufStream::new(client);

    let peer = tokio::spawn(async move {
        let mut server = tokio::io::BufStream::new(server);
        let mut buf = vec![0u8; target_request_len()];
        server.read_exact(&mut buf).await.unwrap();
        tokio::io::AsyncWriteExt::write_all(&mut server, b"HTTP/1.1 404 Not Found\r\n\r\n")
            .await
            .unwrap();
        tokio::io::AsyncWriteExt::flush(&mut server).await.unwrap();
        String::from_utf8(buf).unwrap()
    });

    let err = perform(&mut client, &target, 1024).await.unwrap_err();
    assert!(err.is_unmounted());
    assert!(peer.await.unwrap().starts_with("REPCONN /sdb1/42 HTTP/1.1\r\n"));
}

fn target_request_len() -> usize {
    HandshakeTarget::new("127.0.0.1", 6000, "sdb1", "42")
        .unwrap()
        .render_request()
        .len()
}
