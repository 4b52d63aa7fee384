// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! High-level payload delivery: validate, probe, then transmit.

use std::time::Duration;
use tracing::{debug, info};

use crate::config::ProtocolConfig;
use crate::protocol::probe::probe_tls;
use crate::protocol::request::validate_raw_request;
use crate::protocol::wire::send_raw;
use crate::protocol::DEFAULT_PROXY_ADDR;

/// Sends raw HTTP requests against a target, with TLS auto-detection and
/// optional delivery through an intercepting proxy.
pub struct Requester {
    verify_tls: bool,
    proxy_addr: String,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl Requester {
    pub fn new(verify_tls: bool) -> Self {
        Self {
            verify_tls,
            proxy_addr: DEFAULT_PROXY_ADDR.to_string(),
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(5),
        }
    }

    pub fn from_config(config: &ProtocolConfig, verify_tls: bool) -> Self {
        Self {
            verify_tls,
            proxy_addr: config.proxy_addr.clone(),
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            read_timeout: Duration::from_secs(config.read_timeout_secs),
        }
    }

    /// Validate and transmit raw request text. Validation issues and
    /// transport failures come back as the response string: the agent
    /// reads them and adapts, nothing is raised.
    pub async fn send_raw_data(
        &self,
        host: &str,
        port: u16,
        target_host: &str,
        request_text: &str,
        is_tls: bool,
        via_proxy: bool,
    ) -> String {
        let report = validate_raw_request(request_text);
        if !report.ok {
            let reasons: Vec<String> =
                report.issues.iter().map(|issue| format!("- {issue}")).collect();
            return format!(
                "Invalid HTTP request. The following issues were found:\n{}\n\n--- Raw Request ---\n{}",
                reasons.join("\n"),
                request_text
            );
        }

        debug!(
            "Sending raw request to {}:{} (target {}, tls={}, proxy={})",
            host, port, target_host, is_tls, via_proxy
        );
        match send_raw(
            host,
            port,
            target_host,
            request_text.as_bytes(),
            is_tls,
            via_proxy,
            self.verify_tls,
            self.connect_timeout,
            self.read_timeout,
        )
        .await
        {
            Ok(response) => String::from_utf8_lossy(&response).into_owned(),
            Err(reason) => format!("Request not sent. Please retry. The error is: {reason}"),
        }
    }

    /// Convenience composition: parse the target spec, probe for TLS,
    /// then deliver. With `proxy` set the first hop is always the
    /// configured proxy address, regardless of detected TLS.
    pub async fn send_payload(&self, target_spec: &str, raw_request: &str, proxy: bool) -> String {
        let (host, port) = parse_target_spec(target_spec);
        let target_host = format!("{host}:{port}");

        let detection = probe_tls(
            &host,
            port,
            proxy,
            proxy.then_some(self.proxy_addr.as_str()),
            self.connect_timeout,
        )
        .await;
        let is_tls = detection.is_tls == Some(true);
        info!(
            "Payload delivery to {} (tls={:?}, verification={:?})",
            target_host, detection.is_tls, detection.verification_ok
        );

        if proxy {
            let (proxy_host, proxy_port) = match self.proxy_addr.rsplit_once(':') {
                Some((h, p)) => (h.to_string(), p.parse().unwrap_or(8080)),
                None => (self.proxy_addr.clone(), 8080),
            };
            self.send_raw_data(&proxy_host, proxy_port, &target_host, raw_request, is_tls, true)
                .await
        } else {
            self.send_raw_data(&host, port, &target_host, raw_request, is_tls, false)
                .await
        }
    }
}

/// Parse a target spec into host and port. Accepts `http://`/`https://`
/// prefixes (defaulting ports 80/443), bare `host:port`, and bare
/// hostnames (port 80). Any path suffix is dropped.
pub fn parse_target_spec(spec: &str) -> (String, u16) {
    let trimmed = spec.trim();

    let (rest, default_port) = if let Some(rest) = trimmed.strip_prefix("https://") {
        (rest, 443)
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        (rest, 80)
    } else {
        (trimmed, 80)
    };

    let authority = rest.split('/').next().unwrap_or(rest);

    match authority.rsplit_once(':') {
        Some((host, port)) => {
            let port = port.parse().unwrap_or(default_port);
            (host.to_string(), port)
        }
        None => (authority.to_string(), default_port),
    }
}
