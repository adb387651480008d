// adapters/openssl/probe.rs

use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use openssl::ssl::{HandshakeError, SslConnector, SslMethod, SslStream, SslVerifyMode};
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::domain::error::{EngineError, EngineResult};
use crate::domain::trust_engine::TrustPolicyEngine;
use crate::domain::types::{CertSummary, CertificateChain, EngineDefaults};
use crate::domain::verify::VerificationResult;

/// Where to open a TLS connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
  pub host: String,
  pub port: u16,
  pub timeout: Duration,
}

impl ProbeTarget {
  pub fn new(host: impl Into<String>, port: u16) -> Self {
    Self { host: host.into(), port, timeout: EngineDefaults::PROBE_TIMEOUT }
  }

  /// Only `https` URLs are accepted; the path and query are ignored.
  pub fn from_url(url_str: &str) -> EngineResult<Self> {
    let url = Url::parse(url_str)?;
    if url.scheme() != "https" {
      return Err(EngineError::Config(format!("unsupported URL scheme: {}", url.scheme())));
    }
    let host = url
      .host_str()
      .ok_or_else(|| EngineError::Config("URL missing host".into()))?
      .trim_start_matches('[')
      .trim_end_matches(']')
      .to_string();
    let port = url.port().unwrap_or(EngineDefaults::HTTPS_PORT);
    Ok(Self::new(host, port))
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }
}

/// What a successful probe saw.
#[derive(Debug, Serialize, Clone)]
pub struct ProbeReport {
  pub host: String,
  pub port: u16,
  pub protocol: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub cipher: Option<String>,
  /// Peer chain, leaf first.
  pub chain: Vec<CertSummary>,
}

/// Connect, complete a TLS handshake, and run `engine` over the peer chain
/// before any application data is exchanged. OpenSSL's own verification is
/// switched off; the engine is the only trust decision.
///
/// Errors keep their origin apart: `Rejected` for a refused chain, `Tls` for
/// handshake failures, `Io` for unreachable hosts and timeouts.
pub fn probe_tls(engine: &TrustPolicyEngine, target: &ProbeTarget) -> EngineResult<ProbeReport> {
  let stream = connect(target)?;

  let mut builder = SslConnector::builder(SslMethod::tls()).map_err(tls_err)?;
  builder.set_verify(SslVerifyMode::NONE);
  let mut config = builder.build().configure().map_err(tls_err)?;
  config.set_verify_hostname(false);

  let mut tls = config.connect(&target.host, stream).map_err(handshake_err)?;
  debug!(host = %target.host, port = target.port, "tls handshake complete");

  let chain = peer_chain(&tls)?;
  if let VerificationResult::Rejected { reason } = engine.verify(&chain, &target.host) {
    let _ = tls.shutdown();
    return Err(EngineError::Rejected(reason));
  }

  let report = ProbeReport {
    host: target.host.clone(),
    port: target.port,
    protocol: tls.ssl().version_str().to_string(),
    cipher: tls.ssl().current_cipher().map(|c| c.name().to_string()),
    chain: chain.summaries(),
  };
  let _ = tls.shutdown();
  info!(host = %report.host, protocol = %report.protocol, policy = engine.policy().kind(), "probe accepted");
  Ok(report)
}

fn connect(target: &ProbeTarget) -> EngineResult<TcpStream> {
  let addrs: Vec<SocketAddr> = (target.host.as_str(), target.port).to_socket_addrs()?.collect();
  let mut last_err = io::Error::new(io::ErrorKind::NotFound, format!("no address for {}", target.host));
  for addr in addrs {
    match TcpStream::connect_timeout(&addr, target.timeout) {
      Ok(stream) => {
        stream.set_read_timeout(Some(target.timeout))?;
        stream.set_write_timeout(Some(target.timeout))?;
        return Ok(stream);
      }
      Err(e) => last_err = e,
    }
  }
  Err(EngineError::Io(last_err))
}

/// Peer chain as sent, leaf first. Clients see the leaf in the stack.
fn peer_chain(tls: &SslStream<TcpStream>) -> EngineResult<CertificateChain> {
  let ders = match tls.ssl().peer_cert_chain() {
    Some(stack) => stack.iter().map(|c| c.to_der()).collect::<Result<Vec<_>, _>>()?,
    None => match tls.ssl().peer_certificate() {
      Some(leaf) => vec![leaf.to_der()?],
      None => Vec::new(),
    },
  };
  CertificateChain::from_der(&ders)
}

fn tls_err(e: openssl::error::ErrorStack) -> EngineError {
  EngineError::Tls(e.to_string())
}

fn handshake_err(e: HandshakeError<TcpStream>) -> EngineError {
  match e {
    HandshakeError::SetupFailure(stack) => tls_err(stack),
    HandshakeError::Failure(mid) => match mid.into_error().into_io_error() {
      Ok(io) => EngineError::Io(io),
      Err(ssl) => EngineError::Tls(ssl.to_string()),
    },
    HandshakeError::WouldBlock(_) => EngineError::Tls("handshake interrupted".into()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn from_url_defaults_to_443() {
    let t = ProbeTarget::from_url("https://juejin.cn/post/7017608469901475847").unwrap();
    assert_eq!(t.host, "juejin.cn");
    assert_eq!(t.port, 443);
  }

  #[test]
  fn from_url_keeps_explicit_port() {
    let t = ProbeTarget::from_url("https://localhost:8443/").unwrap();
    assert_eq!(t.port, 8443);
  }

  #[test]
  fn from_url_rejects_plain_http() {
    let err = ProbeTarget::from_url("http://example.com").unwrap_err();
    assert!(err.to_string().contains("unsupported URL scheme"));
  }
}
