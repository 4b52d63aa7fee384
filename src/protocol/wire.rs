// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Raw socket transmission: direct connections, HTTP CONNECT tunnels and
//! TLS upgrades. Transport failures are returned as descriptive strings
//! so a single bad probe cannot abort a larger test run.

use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_native_tls::TlsStream;
use tracing::debug;

/// Flatten an error with its source chain into one matchable string.
/// TLS alert details often live a level or two down the chain.
pub fn error_chain_text(err: &(dyn std::error::Error + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        text.push_str(": ");
        text.push_str(&inner.to_string());
        source = inner.source();
    }
    text
}

/// Open a TCP connection with a connect timeout.
pub async fn open_tcp(host: &str, port: u16, timeout: Duration) -> Result<TcpStream, String> {
    let addr = format!("{host}:{port}");
    match tokio::time::timeout(timeout, TcpStream::connect(&addr)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(e)) => Err(format!("Connection to {addr} failed: {e}")),
        Err(_) => Err(format!("Connection to {addr} timed out after {timeout:?}")),
    }
}

/// Establish an HTTP CONNECT tunnel to `target_host` (host:port) over an
/// already-connected proxy socket. On a non-200 proxy answer the raw
/// proxy response is returned as the error.
pub async fn connect_tunnel(
    stream: &mut TcpStream,
    target_host: &str,
    read_timeout: Duration,
) -> Result<(), String> {
    let connect_req = format!(
        "CONNECT {target_host} HTTP/1.1\r\nHost: {target_host}\r\nConnection: keep-alive\r\n\r\n"
    );
    stream
        .write_all(connect_req.as_bytes())
        .await
        .map_err(|e| format!("Proxy CONNECT write failed: {e}"))?;

    let mut response = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let read = tokio::time::timeout(read_timeout, stream.read(&mut buf)).await;
        match read {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => {
                response.extend_from_slice(&buf[..n]);
                if response.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
            }
            Ok(Err(e)) => return Err(format!("Proxy CONNECT read failed: {e}")),
            Err(_) => break,
        }
    }

    if response.is_empty() {
        return Err("Proxy CONNECT failed: empty response".to_string());
    }
    let status_line = response.split(|b| *b == b'\r').next().unwrap_or(&[]);
    if !status_line.windows(5).any(|w| w == b" 200 ") {
        return Err(format!(
            "Proxy CONNECT failed: {}",
            String::from_utf8_lossy(&response)
        ));
    }
    debug!("CONNECT tunnel to {} established", target_host);
    Ok(())
}

/// Upgrade a TCP stream to TLS against `server_name`.
pub async fn tls_wrap(
    stream: TcpStream,
    server_name: &str,
    verify: bool,
) -> Result<TlsStream<TcpStream>, String> {
    let mut builder = native_tls::TlsConnector::builder();
    if !verify {
        builder.danger_accept_invalid_certs(true);
        builder.danger_accept_invalid_hostnames(true);
    }
    let connector = builder
        .build()
        .map_err(|e| format!("TLS connector setup failed: {e}"))?;
    let connector = tokio_native_tls::TlsConnector::from(connector);
    connector
        .connect(server_name, stream)
        .await
        .map_err(|e| error_chain_text(&e))
}

/// Read from the peer until it closes the connection or the per-read
/// timeout elapses. Partial responses are still responses.
async fn read_until_close<S>(stream: &mut S, read_timeout: Duration) -> Vec<u8>
where
    S: AsyncRead + Unpin,
{
    let mut response = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        match tokio::time::timeout(read_timeout, stream.read(&mut buf)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => response.extend_from_slice(&buf[..n]),
            Ok(Err(_)) => break,
            Err(_) => break,
        }
    }
    response
}

async fn exchange<S>(stream: &mut S, request: &[u8], read_timeout: Duration) -> Result<Vec<u8>, String>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    stream
        .write_all(request)
        .await
        .map_err(|e| format!("Request write failed: {e}"))?;
    stream.flush().await.map_err(|e| format!("Request flush failed: {e}"))?;
    Ok(read_until_close(stream, read_timeout).await)
}

/// Transmit raw request bytes and collect the raw response.
///
/// `host:port` is where the socket dials (the proxy, when `via_proxy`);
/// `target_host` is the logical destination used for the CONNECT tunnel
/// and TLS server name. The TLS handshake here never verifies more than
/// the caller asked for: payload delivery against broken-trust targets is
/// the normal case, not the exception.
#[allow(clippy::too_many_arguments)]
pub async fn send_raw(
    host: &str,
    port: u16,
    target_host: &str,
    request: &[u8],
    is_tls: bool,
    via_proxy: bool,
    verify_tls: bool,
    connect_timeout: Duration,
    read_timeout: Duration,
) -> Result<Vec<u8>, String> {
    let mut tcp = open_tcp(host, port, connect_timeout).await?;

    let server_name = target_host.split(':').next().unwrap_or(target_host).to_string();

    if is_tls {
        if via_proxy {
            connect_tunnel(&mut tcp, target_host, read_timeout).await?;
        }
        let mut tls = tls_wrap(tcp, &server_name, verify_tls).await?;
        exchange(&mut tls, request, read_timeout).await
    } else {
        exchange(&mut tcp, request, read_timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_chain_includes_sources() {
        let inner = std::io::Error::new(std::io::ErrorKind::Other, "inner detail");
        let text = error_chain_text(&inner);
        assert!(text.contains("inner detail"));
    }

    #[tokio::test]
    async fn open_tcp_reports_refused_connection() {
        // Port 1 is essentially never listening
        let result = open_tcp("127.0.0.1", 1, Duration::from_secs(2)).await;
        assert!(result.is_err());
    }
}
