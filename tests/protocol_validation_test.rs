// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Haukka - Raw HTTP Validation Tests
 * Grammar parsing, additive issue reporting, determinism
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use haukka_engine::protocol::{validate_raw_request, Requester};

#[test]
fn minimal_get_is_valid() {
    let report = validate_raw_request("GET / HTTP/1.1\r\nHost: a\r\n\r\n");
    assert!(report.ok, "issues: {:?}", report.issues);
    assert!(report.issues.is_empty());
    assert_eq!(report.method.as_deref(), Some("GET"));
    assert_eq!(report.path.as_deref(), Some("/"));
}

#[test]
fn missing_host_header_is_reported() {
    let report = validate_raw_request("GET / HTTP/1.1\r\nAccept: */*\r\n\r\n");
    assert!(!report.ok);
    assert!(report.issues.iter().any(|issue| issue.contains("Host")));
}

#[test]
fn path_must_start_with_slash() {
    let report = validate_raw_request("GET example.com HTTP/1.1\r\nHost: a\r\n\r\n");
    assert!(!report.ok);
    assert!(report
        .issues
        .iter()
        .any(|issue| issue.contains("must start with '/'")));
}

#[test]
fn content_length_and_chunked_conflict() {
    let raw = "POST /upload HTTP/1.1\r\nHost: a\r\nContent-Length: 4\r\nTransfer-Encoding: chunked\r\n\r\nbody";
    let report = validate_raw_request(raw);
    assert!(!report.ok);
    assert!(report
        .issues
        .iter()
        .any(|issue| issue.contains("Content-Length") && issue.contains("chunked")));
}

#[test]
fn bodyless_post_warns() {
    let report = validate_raw_request("POST /login HTTP/1.1\r\nHost: a\r\n\r\n");
    assert!(!report.ok);
    assert!(report
        .issues
        .iter()
        .any(|issue| issue.contains("usually carries a body")));
}

#[test]
fn post_with_body_is_valid() {
    let raw = "POST /login HTTP/1.1\r\nHost: a\r\nContent-Length: 7\r\n\r\nu=admin";
    let report = validate_raw_request(raw);
    assert!(report.ok, "issues: {:?}", report.issues);
}

#[test]
fn empty_request_is_invalid() {
    let report = validate_raw_request("");
    assert!(!report.ok);
    assert_eq!(report.issues, vec!["Empty request".to_string()]);

    let report = validate_raw_request("   \r\n  ");
    assert!(!report.ok);
}

#[test]
fn issues_are_additive() {
    // Missing Host AND bodyless POST: both must be reported
    let report = validate_raw_request("POST /x HTTP/1.1\r\nAccept: */*\r\n\r\n");
    assert!(!report.ok);
    assert_eq!(report.issues.len(), 2);
}

#[test]
fn validation_is_deterministic() {
    let inputs = [
        "GET / HTTP/1.1\r\nHost: a\r\n\r\n",
        "POST /x HTTP/1.1\r\n\r\n",
        "garbage",
        "",
    ];
    for input in inputs {
        let first = serde_json::to_value(validate_raw_request(input)).unwrap();
        let second = serde_json::to_value(validate_raw_request(input)).unwrap();
        assert_eq!(first, second, "non-deterministic report for {input:?}");
    }
}

#[tokio::test]
async fn invalid_payload_is_refused_before_sending() {
    let requester = Requester::new(false);
    let response = requester
        .send_raw_data(
            "127.0.0.1",
            1,
            "127.0.0.1:1",
            "GET nopath HTTP/1.1\r\n\r\n",
            false,
            false,
        )
        .await;
    assert!(response.contains("Invalid HTTP request"));
    assert!(response.contains("--- Raw Request ---"));
}
