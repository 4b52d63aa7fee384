// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Target reachability checks run before a session starts.

use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// Outcome of a liveness probe.
#[derive(Debug, Clone, Serialize)]
pub struct TargetLiveness {
    pub alive: bool,
    pub status_code: Option<u16>,
    pub error: Option<String>,
}

/// Check whether a web target responds to HTTP at all. Tries HEAD first,
/// then GET; any response status counts as alive, since a 403 or 500 still
/// means something is listening.
pub async fn check_target_alive(target: &str, timeout: Duration) -> TargetLiveness {
    let client = match reqwest::Client::builder()
        .timeout(timeout)
        .danger_accept_invalid_certs(true)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            return TargetLiveness {
                alive: false,
                status_code: None,
                error: Some(e.to_string()),
            }
        }
    };

    let url = normalize_target_url(target);
    let mut last_status = None;
    let mut last_error = None;

    for method in [reqwest::Method::HEAD, reqwest::Method::GET] {
        match client.request(method.clone(), &url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                debug!("{} {} -> {}", method, url, status);
                last_status = Some(status);
                return TargetLiveness {
                    alive: true,
                    status_code: last_status,
                    error: None,
                };
            }
            Err(e) => last_error = Some(e.to_string()),
        }
    }

    TargetLiveness {
        alive: false,
        status_code: last_status,
        error: last_error,
    }
}

/// Ensure the target has a protocol scheme; bare `host[:port]` becomes
/// `http://host[:port]`.
pub fn normalize_target_url(target: &str) -> String {
    let trimmed = target.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_bare_hosts() {
        assert_eq!(normalize_target_url("example.test"), "http://example.test");
        assert_eq!(normalize_target_url("example.test:8080/"), "http://example.test:8080");
        assert_eq!(normalize_target_url("https://example.test"), "https://example.test");
    }
}
