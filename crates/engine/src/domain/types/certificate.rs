use std::fmt;

use serde::Serialize;

use crate::crypto::digest::digest;
use crate::crypto::x509::{self, ParsedCert};
use crate::domain::error::{EngineError, EngineResult};

use super::core::DigestAlg;
use super::trust::Pin;

/// A parsed X.509 certificate. Immutable; equality is DER byte equality.
#[derive(Clone)]
pub struct Certificate {
    der: Vec<u8>,
    public_key: PublicKey,
    subject: String,
    issuer: String,
    serial: String,
}

impl Certificate {
    pub fn from_der(der: &[u8]) -> EngineResult<Self> {
        x509::parse_der(der).map(Self::from_parsed)
    }

    /// First certificate of a PEM document.
    pub fn from_pem(pem: &[u8]) -> EngineResult<Self> {
        x509::parse_pem_bundle(pem)?
            .into_iter()
            .next()
            .map(Self::from_parsed)
            .ok_or_else(|| EngineError::Certificate("no certificate found in PEM data".into()))
    }

    /// Every certificate of a PEM bundle, in file order.
    pub fn from_pem_bundle(pem: &[u8]) -> EngineResult<Vec<Self>> {
        Ok(x509::parse_pem_bundle(pem)?
            .into_iter()
            .map(Self::from_parsed)
            .collect())
    }

    fn from_parsed(p: ParsedCert) -> Self {
        Self {
            der: p.der,
            public_key: PublicKey(p.spki),
            subject: p.subject,
            issuer: p.issuer,
            serial: p.serial,
        }
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Subject DN, for logging only.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Issuer DN, for logging only.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn serial_hex(&self) -> &str {
        &self.serial
    }

    /// Pin of this certificate's SubjectPublicKeyInfo.
    pub fn pin(&self, alg: DigestAlg) -> EngineResult<Pin> {
        Pin::new(alg, digest(alg, self.public_key.as_der())?)
    }

    pub fn summary(&self) -> CertSummary {
        CertSummary {
            subject: self.subject.clone(),
            issuer: self.issuer.clone(),
            serial: self.serial.clone(),
            sha256_pin: self.pin(DigestAlg::Sha256).ok().map(|p| p.to_string()),
        }
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject)
            .field("issuer", &self.issuer)
            .field("serial", &self.serial)
            .finish()
    }
}

/// DER-encoded SubjectPublicKeyInfo. Compared by value.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey(Vec<u8>);

impl PublicKey {
    pub fn from_der(der: &[u8]) -> EngineResult<Self> {
        x509::normalize_spki(der).map(PublicKey)
    }

    pub fn from_pem(pem: &[u8]) -> EngineResult<Self> {
        x509::spki_from_pem(pem).map(PublicKey)
    }

    /// Hex-encoded DER, as commonly pasted into app constants.
    pub fn from_hex(s: &str) -> EngineResult<Self> {
        let der = hex::decode(s.trim())
            .map_err(|e| EngineError::Certificate(format!("invalid hex public key: {e}")))?;
        Self::from_der(&der)
    }

    pub fn as_der(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(&self.0)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        let head = &hex[..hex.len().min(16)];
        write!(f, "PublicKey({head}.., {} bytes)", self.0.len())
    }
}

/// Peer chain as presented in the handshake, leaf first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateChain {
    certs: Vec<Certificate>,
}

impl CertificateChain {
    pub fn new(certs: Vec<Certificate>) -> Self {
        Self { certs }
    }

    /// Parse a DER chain in handshake order. Any unparsable entry fails the
    /// whole chain.
    pub fn from_der<B: AsRef<[u8]>>(ders: &[B]) -> EngineResult<Self> {
        let certs = ders
            .iter()
            .map(|d| Certificate::from_der(d.as_ref()))
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(Self { certs })
    }

    pub fn leaf(&self) -> Option<&Certificate> {
        self.certs.first()
    }

    pub fn is_empty(&self) -> bool {
        self.certs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.certs.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Certificate> {
        self.certs.iter()
    }

    pub fn as_slice(&self) -> &[Certificate] {
        &self.certs
    }

    /// Textual pins of every entry, in chain order. Used in rejection logs.
    pub fn pins(&self, alg: DigestAlg) -> Vec<String> {
        self.certs
            .iter()
            .map(|c| match c.pin(alg) {
                Ok(pin) => pin.to_string(),
                Err(_) => format!("{}/<unavailable>", alg.prefix()),
            })
            .collect()
    }

    pub fn summaries(&self) -> Vec<CertSummary> {
        self.certs.iter().map(Certificate::summary).collect()
    }
}

impl<'a> IntoIterator for &'a CertificateChain {
    type Item = &'a Certificate;
    type IntoIter = std::slice::Iter<'a, Certificate>;

    fn into_iter(self) -> Self::IntoIter {
        self.certs.iter()
    }
}

/// Loggable description of one chain entry.
#[derive(Debug, Serialize, Clone)]
pub struct CertSummary {
    pub subject: String,
    pub issuer: String,
    pub serial: String,
    pub sha256_pin: Option<String>,
}
