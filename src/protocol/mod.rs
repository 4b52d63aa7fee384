// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Raw HTTP protocol layer.
//!
//! Builds, validates and transmits single raw HTTP/1.1 requests, with or
//! without TLS, directly or through an intercepting proxy, and probes
//! targets for TLS support. Malformed requests and transport failures are
//! reported as data, not raised: one bad probe must never abort a run.

pub mod probe;
pub mod request;
pub mod requester;
pub mod wire;

pub use probe::{classify_handshake_error, probe_tls, HandshakeIndication, TlsProbeResult};
pub use request::{parse_raw_request, validate_raw_request, RawHttpRequest, ValidationReport};
pub use requester::{parse_target_spec, Requester};

/// Default first hop for proxied payload delivery
pub const DEFAULT_PROXY_ADDR: &str = "localhost:8080";
