// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Haukka - TLS Probe and Raw Send Tests
 * Probe disambiguation against local listeners
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use haukka_engine::protocol::probe::probe_tls;
use haukka_engine::protocol::wire::send_raw;
use haukka_engine::protocol::Requester;

/// Plaintext HTTP server: answers every connection with a canned 200 and
/// closes. A TLS ClientHello gets the same plaintext answer, which is
/// exactly what makes the probe classify it as not-TLS.
async fn spawn_plaintext_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = tokio::time::timeout(Duration::from_millis(200), socket.read(&mut buf))
                    .await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok")
                    .await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

#[tokio::test]
async fn plaintext_server_is_not_tls() {
    let addr = spawn_plaintext_server().await;
    let result = probe_tls(
        "127.0.0.1",
        addr.port(),
        false,
        None,
        Duration::from_secs(5),
    )
    .await;
    assert_eq!(result.is_tls, Some(false), "probe result: {result:?}");
    assert!(result.error.is_some());
}

#[tokio::test]
async fn unreachable_port_is_unknown() {
    // Nothing listens on port 1
    let result = probe_tls("127.0.0.1", 1, false, None, Duration::from_secs(2)).await;
    assert_eq!(result.is_tls, None, "probe result: {result:?}");
    assert!(result.error.is_some());
}

#[tokio::test]
async fn probe_results_are_not_cached_between_probes() {
    let addr = spawn_plaintext_server().await;
    let first = probe_tls("127.0.0.1", addr.port(), false, None, Duration::from_secs(5)).await;
    let second = probe_tls("127.0.0.1", addr.port(), false, None, Duration::from_secs(5)).await;
    // Fresh connections, same classification
    assert_eq!(first.is_tls, second.is_tls);
}

#[tokio::test]
async fn send_raw_plaintext_round_trip() {
    let addr = spawn_plaintext_server().await;
    let request = b"GET / HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: close\r\n\r\n";
    let response = send_raw(
        "127.0.0.1",
        addr.port(),
        &format!("127.0.0.1:{}", addr.port()),
        request,
        false,
        false,
        false,
        Duration::from_secs(5),
        Duration::from_secs(2),
    )
    .await
    .expect("send_raw should reach the listener");
    let text = String::from_utf8_lossy(&response);
    assert!(text.contains("200 OK"), "response was: {text}");
}

#[tokio::test]
async fn send_raw_connection_failure_is_a_string_not_a_panic() {
    let result = send_raw(
        "127.0.0.1",
        1,
        "127.0.0.1:1",
        b"GET / HTTP/1.1\r\nHost: a\r\n\r\n",
        false,
        false,
        false,
        Duration::from_secs(2),
        Duration::from_secs(1),
    )
    .await;
    let error = result.expect_err("port 1 must refuse");
    assert!(error.contains("127.0.0.1:1"));
}

#[tokio::test]
async fn send_payload_detects_plaintext_and_delivers() {
    let addr = spawn_plaintext_server().await;
    let requester = Requester::new(false);
    let response = requester
        .send_payload(
            &format!("127.0.0.1:{}", addr.port()),
            "GET / HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: close\r\n\r\n",
            false,
        )
        .await;
    assert!(response.contains("200 OK"), "response was: {response}");
}
