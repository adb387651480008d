// adapters/openssl/system.rs

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use once_cell::sync::Lazy;
use openssl::nid::Nid;
use openssl::stack::Stack;
use openssl::x509::store::{X509Store, X509StoreBuilder};
use openssl::x509::verify::X509VerifyFlags;
use openssl::x509::{X509PurposeId, X509Ref, X509StoreContext, X509};

use crate::crypto::x509::asn1_text;
use crate::domain::error::{EngineError, EngineResult};
use crate::domain::trust_engine::SystemVerifier;
use crate::domain::types::{Certificate, CertificateChain, HostPattern};

static PLATFORM: Lazy<Result<Arc<OpenSslSystemVerifier>, String>> =
  Lazy::new(|| OpenSslSystemVerifier::platform().map(Arc::new).map_err(|e| e.to_string()));

/// PKIX validation through OpenSSL's `X509_verify_cert` under the TLS server
/// purpose, followed by a subjectAltName hostname check on the leaf.
#[derive(Clone)]
pub struct OpenSslSystemVerifier {
  store: Arc<X509Store>,
  source: &'static str,
}

impl OpenSslSystemVerifier {
  /// Store loaded from OpenSSL's default certificate locations.
  pub fn platform() -> EngineResult<Self> {
    let mut builder = X509StoreBuilder::new()?;
    builder.set_default_paths()?;
    builder.set_purpose(X509PurposeId::SSL_SERVER)?;
    Ok(Self { store: Arc::new(builder.build()), source: "platform" })
  }

  /// Store holding only `anchors`. Anchors need not be self-signed, so an
  /// intermediate may be trusted directly.
  pub fn with_anchors(anchors: &[Certificate]) -> EngineResult<Self> {
    if anchors.is_empty() {
      return Err(EngineError::MisconfiguredPolicy("anchor list is empty".into()));
    }
    let mut builder = X509StoreBuilder::new()?;
    for anchor in anchors {
      builder.add_cert(X509::from_der(anchor.der())?)?;
    }
    builder.set_flags(X509VerifyFlags::PARTIAL_CHAIN)?;
    builder.set_purpose(X509PurposeId::SSL_SERVER)?;
    Ok(Self { store: Arc::new(builder.build()), source: "anchors" })
  }

  /// Process-wide platform verifier, built on first use.
  pub fn shared() -> EngineResult<Arc<dyn SystemVerifier>> {
    match &*PLATFORM {
      Ok(verifier) => Ok(verifier.clone() as Arc<dyn SystemVerifier>),
      Err(e) => Err(EngineError::Config(format!("platform trust store unavailable: {e}"))),
    }
  }

  fn verify_path(&self, chain: &CertificateChain) -> Result<X509, String> {
    let mut certs = chain.iter().map(|c| X509::from_der(c.der()));
    let leaf = match certs.next() {
      Some(leaf) => leaf.map_err(|e| format!("unreadable leaf certificate: {e}"))?,
      None => return Err("empty chain".into()),
    };
    let mut untrusted = Stack::new().map_err(|e| e.to_string())?;
    for cert in certs {
      let cert = cert.map_err(|e| format!("unreadable intermediate certificate: {e}"))?;
      untrusted.push(cert).map_err(|e| e.to_string())?;
    }

    let mut ctx = X509StoreContext::new().map_err(|e| e.to_string())?;
    let (ok, error, depth) = ctx
      .init(&self.store, &leaf, &untrusted, |c| {
        let ok = c.verify_cert()?;
        Ok((ok, c.error(), c.error_depth()))
      })
      .map_err(|e| e.to_string())?;
    if !ok {
      return Err(format!("{} (depth {depth})", error.error_string()));
    }
    Ok(leaf)
  }
}

impl SystemVerifier for OpenSslSystemVerifier {
  fn validate(&self, chain: &CertificateChain, hostname: &str) -> Result<(), String> {
    let leaf = self.verify_path(chain)?;
    if leaf_matches_host(&leaf, hostname) {
      Ok(())
    } else {
      Err(format!("certificate is not valid for host {hostname}"))
    }
  }
}

impl fmt::Debug for OpenSslSystemVerifier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("OpenSslSystemVerifier").field("source", &self.source).finish()
  }
}

/// DNS and IP subjectAltNames; the subject CN is only consulted when the
/// certificate has no subjectAltName at all.
fn leaf_matches_host(leaf: &X509Ref, hostname: &str) -> bool {
  let ip = hostname.parse::<IpAddr>().ok();
  if let Some(sans) = leaf.subject_alt_names() {
    return sans.iter().any(|san| match ip {
      Some(ip) => san.ipaddress().is_some_and(|bytes| ip_matches(ip, bytes)),
      None => san.dnsname().is_some_and(|name| dns_name_matches(name, hostname)),
    });
  }
  if ip.is_some() {
    return false;
  }
  leaf
    .subject_name()
    .entries_by_nid(Nid::COMMONNAME)
    .filter_map(|cn| asn1_text(cn.data()))
    .any(|cn| dns_name_matches(cn, hostname))
}

fn ip_matches(ip: IpAddr, bytes: &[u8]) -> bool {
  match ip {
    IpAddr::V4(v4) => bytes == v4.octets(),
    IpAddr::V6(v6) => bytes == v6.octets(),
  }
}

/// Certificates only allow a single leftmost `*` label.
fn dns_name_matches(name: &str, hostname: &str) -> bool {
  if name.starts_with("**") {
    return false;
  }
  HostPattern::parse(name).map(|p| p.matches(hostname)).unwrap_or(false)
}
