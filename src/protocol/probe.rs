// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! TLS capability probing.
//!
//! A single handshake attempt cannot distinguish "not TLS" from "TLS with
//! broken trust", so the probe deliberately spends a second, fresh
//! connection: strict verification first, then (when the failure looks
//! like a certificate problem) an unverified retry to confirm TLS is
//! present but untrusted. A client-certificate alert is reported without
//! retry.

use std::time::Duration;
use tracing::debug;

use crate::protocol::wire::{connect_tunnel, open_tcp, tls_wrap};
use crate::protocol::DEFAULT_PROXY_ADDR;

/// Probe outcome. All three findings are tri-state: `None` means the
/// probe could not determine the answer (e.g. the TCP connect failed).
/// Results are produced fresh per probe and never cached across hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsProbeResult {
    pub is_tls: Option<bool>,
    pub verification_ok: Option<bool>,
    pub client_cert_required: Option<bool>,
    pub error: Option<String>,
}

impl TlsProbeResult {
    fn unknown(error: String) -> Self {
        Self {
            is_tls: None,
            verification_ok: None,
            client_cert_required: None,
            error: Some(error),
        }
    }

    fn plaintext(error: Option<String>) -> Self {
        Self {
            is_tls: Some(false),
            verification_ok: None,
            client_cert_required: None,
            error,
        }
    }
}

/// What a failed handshake most likely means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeIndication {
    /// The peer is not speaking TLS at all
    NotTls,
    /// TLS is present but the certificate failed verification
    UntrustedCert,
    /// The server demands a client certificate
    ClientCertRequired,
    /// TLS is present but the handshake failed for another reason
    TlsGenericFailure,
}

/// Classify handshake error text by known TLS alert substrings.
///
/// Heuristic, not a portable contract: the substrings are OpenSSL's
/// wording, which native-tls surfaces on Linux. Unknown errors default to
/// not-TLS, matching the retry logic's conservative stance.
pub fn classify_handshake_error(message: &str) -> HandshakeIndication {
    let msg = message.to_lowercase();

    if msg.contains("certificate required") {
        return HandshakeIndication::ClientCertRequired;
    }
    if msg.contains("certificate")
        && (msg.contains("verify")
            || msg.contains("self signed")
            || msg.contains("self-signed")
            || msg.contains("unknown ca")
            || msg.contains("hostname"))
    {
        return HandshakeIndication::UntrustedCert;
    }
    if msg.contains("handshake failure")
        || msg.contains("protocol version")
        || msg.contains("wrong signature type")
    {
        return HandshakeIndication::TlsGenericFailure;
    }
    if msg.contains("wrong version number")
        || msg.contains("unknown protocol")
        || msg.contains("http request")
        || msg.contains("packet length too long")
    {
        return HandshakeIndication::NotTls;
    }
    HandshakeIndication::NotTls
}

/// One TCP connection, optionally tunneled, with a TLS handshake on top.
/// Returns the handshake error text on failure.
async fn attempt_handshake(
    host: &str,
    port: u16,
    via_proxy: bool,
    proxy_addr: Option<&str>,
    verify: bool,
    timeout: Duration,
) -> Result<(), String> {
    let tcp = if via_proxy {
        let proxy = proxy_addr.unwrap_or(DEFAULT_PROXY_ADDR);
        let (proxy_host, proxy_port) = split_host_port(proxy, 8080);
        let mut stream = open_tcp(&proxy_host, proxy_port, timeout).await?;
        connect_tunnel(&mut stream, &format!("{host}:{port}"), timeout).await?;
        stream
    } else {
        open_tcp(host, port, timeout).await?
    };

    tls_wrap(tcp, host, verify).await.map(|_| ())
}

fn split_host_port(spec: &str, default_port: u16) -> (String, u16) {
    match spec.rsplit_once(':') {
        Some((host, port)) => (
            host.to_string(),
            port.parse().unwrap_or(default_port),
        ),
        None => (spec.to_string(), default_port),
    }
}

/// Probe whether `host:port` speaks TLS, whether strict verification
/// passes, and whether a client certificate is demanded.
pub async fn probe_tls(
    host: &str,
    port: u16,
    via_proxy: bool,
    proxy_addr: Option<&str>,
    timeout: Duration,
) -> TlsProbeResult {
    // First attempt: strict verification
    let strict = attempt_handshake(host, port, via_proxy, proxy_addr, true, timeout).await;
    let strict_err = match strict {
        Ok(()) => {
            debug!("TLS probe {}:{} verified cleanly", host, port);
            return TlsProbeResult {
                is_tls: Some(true),
                verification_ok: Some(true),
                client_cert_required: Some(false),
                error: None,
            };
        }
        Err(e) => e,
    };

    // TCP/tunnel-level failures never reached a handshake
    if strict_err.starts_with("Connection") || strict_err.starts_with("Proxy CONNECT") {
        return if strict_err.starts_with("Proxy CONNECT") {
            TlsProbeResult::plaintext(Some(strict_err))
        } else {
            TlsProbeResult::unknown(strict_err)
        };
    }

    match classify_handshake_error(&strict_err) {
        HandshakeIndication::ClientCertRequired => TlsProbeResult {
            is_tls: Some(true),
            verification_ok: Some(true),
            client_cert_required: Some(true),
            error: Some(strict_err),
        },
        HandshakeIndication::NotTls => TlsProbeResult::plaintext(Some(strict_err)),
        HandshakeIndication::UntrustedCert | HandshakeIndication::TlsGenericFailure => {
            // Fresh connection without verification to confirm TLS is
            // present but untrusted
            let relaxed =
                attempt_handshake(host, port, via_proxy, proxy_addr, false, timeout).await;
            match relaxed {
                Ok(()) => TlsProbeResult {
                    is_tls: Some(true),
                    verification_ok: Some(false),
                    client_cert_required: Some(false),
                    error: Some(strict_err),
                },
                Err(relaxed_err) => match classify_handshake_error(&relaxed_err) {
                    HandshakeIndication::NotTls => TlsProbeResult::plaintext(Some(relaxed_err)),
                    HandshakeIndication::ClientCertRequired => TlsProbeResult {
                        is_tls: Some(true),
                        verification_ok: Some(false),
                        client_cert_required: Some(true),
                        error: Some(relaxed_err),
                    },
                    _ => TlsProbeResult {
                        is_tls: Some(true),
                        verification_ok: Some(false),
                        client_cert_required: Some(false),
                        error: Some(relaxed_err),
                    },
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_plaintext_server_errors() {
        assert_eq!(
            classify_handshake_error("error:0A00010B:SSL routines:ssl3_get_record:wrong version number"),
            HandshakeIndication::NotTls
        );
        assert_eq!(
            classify_handshake_error("unknown protocol"),
            HandshakeIndication::NotTls
        );
    }

    #[test]
    fn classifies_trust_failures() {
        assert_eq!(
            classify_handshake_error("certificate verify failed: self signed certificate"),
            HandshakeIndication::UntrustedCert
        );
        assert_eq!(
            classify_handshake_error("the certificate's hostname does not match"),
            HandshakeIndication::UntrustedCert
        );
        assert_eq!(
            classify_handshake_error("certificate verify failed: unknown ca"),
            HandshakeIndication::UntrustedCert
        );
    }

    #[test]
    fn classifies_client_cert_alert_before_trust() {
        // "certificate required" must win over the generic certificate rule
        assert_eq!(
            classify_handshake_error("tlsv1 alert certificate required"),
            HandshakeIndication::ClientCertRequired
        );
    }

    #[test]
    fn classifies_generic_tls_failures() {
        assert_eq!(
            classify_handshake_error("sslv3 alert handshake failure"),
            HandshakeIndication::TlsGenericFailure
        );
        assert_eq!(
            classify_handshake_error("unsupported protocol version"),
            HandshakeIndication::TlsGenericFailure
        );
    }

    #[test]
    fn unknown_errors_default_to_not_tls() {
        assert_eq!(
            classify_handshake_error("something nobody has seen before"),
            HandshakeIndication::NotTls
        );
    }
}
