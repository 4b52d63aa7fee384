// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Haukka - Target Liveness Tests
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use haukka_engine::network::check_target_alive;

#[tokio::test]
async fn responding_target_is_alive() {
    let mock_server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let liveness = check_target_alive(&mock_server.uri(), Duration::from_secs(5)).await;
    assert!(liveness.alive);
    assert_eq!(liveness.status_code, Some(200));
    assert!(liveness.error.is_none());
}

#[tokio::test]
async fn error_status_still_counts_as_alive() {
    let mock_server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let liveness = check_target_alive(&mock_server.uri(), Duration::from_secs(5)).await;
    // A 503 means something is listening; that's what the check is for
    assert!(liveness.alive);
    assert_eq!(liveness.status_code, Some(503));
}

#[tokio::test]
async fn dead_target_reports_the_error() {
    let liveness = check_target_alive("http://127.0.0.1:1", Duration::from_secs(2)).await;
    assert!(!liveness.alive);
    assert!(liveness.error.is_some());
}

#[tokio::test]
async fn bare_host_port_spec_is_accepted() {
    let mock_server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let bare = mock_server.uri().trim_start_matches("http://").to_string();
    let liveness = check_target_alive(&bare, Duration::from_secs(5)).await;
    assert!(liveness.alive);
}
