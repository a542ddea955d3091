#![no_main]

use libfuzzer_sys::fuzz_target;
use repconn::protocol::handshake::{classify_status, parse_status_line, HandshakeTarget};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(status) = parse_status_line(text) {
        let _ = classify_status(status);
    }

    // Any accepted target must render a single request line
    let mut parts = text.splitn(3, '\u{0}');
    let host = parts.next().unwrap_or_default();
    let device = parts.next().unwrap_or_default();
    let partition = parts.next().unwrap_or_default();
    if let Ok(target) = HandshakeTarget::new(host, 6000, device, partition) {
        let request = target.render_request();
        let request_line = request.split("\r\n").next().unwrap_or_default();
        assert_eq!(request_line.split(' ').count(), 3);
        assert!(request_line.is_ascii());
    }
});
