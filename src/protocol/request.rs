// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Strict HTTP/1.1 request grammar parsing and validation.
//!
//! Validation is pure and deterministic: the same raw request text always
//! yields the same report. Issues are additive findings, not exceptions;
//! the caller decides whether a flawed request is still worth sending.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Request line: token method, target, HTTP version
static REQUEST_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([!#$%&'*+.^_`|~0-9A-Za-z-]+) (\S+) HTTP/([0-9]\.[0-9])$").unwrap()
});

/// RFC 7230 header field name token
static HEADER_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[!#$%&'*+.^_`|~0-9A-Za-z-]+$").unwrap());

/// A parsed raw HTTP request. Header order is preserved; lookups are
/// case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHttpRequest {
    pub method: String,
    pub path: String,
    pub version: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawHttpRequest {
    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Validation outcome: `ok` is true iff no issues were found.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub ok: bool,
    pub issues: Vec<String>,
    pub method: Option<String>,
    pub path: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl ValidationReport {
    fn failed(issues: Vec<String>) -> Self {
        Self {
            ok: false,
            issues,
            method: None,
            path: None,
            headers: Vec::new(),
        }
    }
}

/// Parse raw request text with a strict HTTP/1.1 grammar. Returns the
/// first grammar violation as the error string.
///
/// Lone LF line endings are accepted alongside CRLF: model-authored
/// requests frequently arrive without carriage returns.
pub fn parse_raw_request(text: &str) -> Result<RawHttpRequest, String> {
    if text.trim().is_empty() {
        return Err("Empty request".to_string());
    }

    let normalized = text.replace("\r\n", "\n");
    let (head, body) = match normalized.split_once("\n\n") {
        Some((head, body)) => (head, body.as_bytes().to_vec()),
        None => (normalized.trim_end_matches('\n'), Vec::new()),
    };

    let mut lines = head.lines();
    let request_line = lines
        .next()
        .ok_or_else(|| "Missing request line".to_string())?;

    let captures = REQUEST_LINE
        .captures(request_line)
        .ok_or_else(|| format!("Malformed request line: '{request_line}'"))?;

    let method = captures[1].to_string();
    let path = captures[2].to_string();
    let version = captures[3].to_string();

    let mut headers = Vec::new();
    for line in lines {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| format!("Malformed header line: '{line}'"))?;
        if !HEADER_NAME.is_match(name) {
            return Err(format!("Invalid header field name: '{name}'"));
        }
        headers.push((name.to_string(), value.trim().to_string()));
    }

    Ok(RawHttpRequest {
        method,
        path,
        version,
        headers,
        body,
    })
}

/// Analyze raw request text and report every issue found.
///
/// Grammar failures end the analysis (nothing downstream is meaningful);
/// semantic findings accumulate. The body-less POST/PUT/PATCH check is a
/// heuristic warning: usually a mistake, not always invalid.
pub fn validate_raw_request(text: &str) -> ValidationReport {
    let parsed = match parse_raw_request(text) {
        Ok(parsed) => parsed,
        Err(reason) => {
            if reason == "Empty request" {
                return ValidationReport::failed(vec![reason]);
            }
            return ValidationReport::failed(vec![format!(
                "Malformed HTTP request: {reason}"
            )]);
        }
    };

    let mut issues = Vec::new();

    if !parsed.path.starts_with('/') {
        issues.push(
            "Request line contains invalid or missing path (URL must start with '/')".to_string(),
        );
    }

    if parsed.header("host").is_none() {
        issues.push("Missing required 'Host' header".to_string());
    }

    let chunked = parsed
        .header("transfer-encoding")
        .map(|v| v.to_lowercase().contains("chunked"))
        .unwrap_or(false);
    if parsed.header("content-length").is_some() && chunked {
        issues.push(
            "Both Content-Length and Transfer-Encoding: chunked present (invalid)".to_string(),
        );
    }

    if matches!(parsed.method.as_str(), "POST" | "PUT" | "PATCH") && parsed.body.is_empty() {
        issues.push(format!(
            "Method {} usually carries a body but none was provided",
            parsed.method
        ));
    }

    ValidationReport {
        ok: issues.is_empty(),
        issues,
        method: Some(parsed.method),
        path: Some(parsed.path),
        headers: parsed.headers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_get() {
        let parsed = parse_raw_request("GET / HTTP/1.1\r\nHost: a\r\n\r\n").unwrap();
        assert_eq!(parsed.method, "GET");
        assert_eq!(parsed.path, "/");
        assert_eq!(parsed.header("host"), Some("a"));
        assert!(parsed.body.is_empty());
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let parsed =
            parse_raw_request("GET / HTTP/1.1\r\nHost: a\r\nX-Api-Key: k\r\n\r\n").unwrap();
        assert_eq!(parsed.header("x-api-key"), Some("k"));
        assert_eq!(parsed.header("X-API-KEY"), Some("k"));
    }

    #[test]
    fn accepts_bare_lf_line_endings() {
        let parsed = parse_raw_request("GET /a HTTP/1.1\nHost: b\n\n").unwrap();
        assert_eq!(parsed.path, "/a");
    }

    #[test]
    fn body_is_preserved() {
        let parsed =
            parse_raw_request("POST /x HTTP/1.1\r\nHost: a\r\nContent-Length: 3\r\n\r\nabc")
                .unwrap();
        assert_eq!(parsed.body, b"abc");
    }

    #[test]
    fn rejects_garbage_request_line() {
        assert!(parse_raw_request("not an http request\r\n\r\n").is_err());
    }
}
