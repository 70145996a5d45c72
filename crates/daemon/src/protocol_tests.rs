// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol unit tests

use super::*;
use ab_core::CallbackAction;

#[test]
fn requests_are_tagged_by_type() {
    let request = Request::Callback {
        callback: Callback {
            request_id: "r1".to_string(),
            action: CallbackAction::Deny,
            reviewer: "bob".to_string(),
            reason: Some("not on call".to_string()),
        },
    };

    let value = serde_json::to_value(&request).expect("encode failed");
    assert_eq!(value["type"], "Callback");
    assert_eq!(value["callback"]["action"], "deny");

    let decoded: Request = decode(&encode(&request).expect("encode failed")).expect("decode failed");
    assert_eq!(decoded, request);
}

#[test]
fn unit_variants_carry_only_the_tag() {
    let encoded = encode(&Request::Ping).expect("encode failed");
    assert_eq!(std::str::from_utf8(&encoded).unwrap(), r#"{"type":"Ping"}"#);
}

#[test]
fn status_response_decodes() {
    let json = br#"{"type":"Status","uptime_secs":90,"live_tasks":2,"watcher":"Ready"}"#;
    let response: Response = decode(json).expect("decode failed");
    assert_eq!(
        response,
        Response::Status {
            uptime_secs: 90,
            live_tasks: 2,
            watcher: "Ready".to_string(),
            tasks: Vec::new(),
        }
    );
}

#[test]
fn unknown_request_is_rejected() {
    assert!(decode::<Request>(br#"{"type":"Reboot"}"#).is_err());
}

#[tokio::test]
async fn read_request_from_framed_buffer() {
    let mut buffer = Vec::new();
    write_message(&mut buffer, &encode(&Request::Status).unwrap())
        .await
        .expect("write failed");

    let mut cursor = std::io::Cursor::new(buffer);
    let request = read_request(&mut cursor, DEFAULT_TIMEOUT).await.expect("read failed");
    assert_eq!(request, Request::Status);
}

#[tokio::test]
async fn closed_connection_is_reported() {
    let mut cursor = std::io::Cursor::new(Vec::new());
    let err = read_request(&mut cursor, DEFAULT_TIMEOUT).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed));
}

#[tokio::test(start_paused = true)]
async fn silent_client_times_out() {
    let (_client, mut server) = tokio::io::duplex(64);
    let err = read_request(&mut server, Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Timeout));
}

#[tokio::test]
async fn response_is_length_prefixed() {
    let mut buffer = Vec::new();
    write_response(&mut buffer, &Response::Pong, DEFAULT_TIMEOUT)
        .await
        .expect("write failed");

    let len = u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;
    assert_eq!(len, buffer.len() - 4);
    assert_eq!(&buffer[4..], br#"{"type":"Pong"}"#);
}
