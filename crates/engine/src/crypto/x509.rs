//! X.509 parsing on top of OpenSSL. Only the fields the trust engine needs
//! are pulled out: the SubjectPublicKeyInfo and a few strings for logs.

use openssl::asn1::Asn1StringRef;
use openssl::pkey::PKey;
use openssl::x509::{X509NameRef, X509Ref, X509};

use crate::domain::error::{EngineError, EngineResult};

/// Fields extracted from one certificate.
#[derive(Debug, Clone)]
pub struct ParsedCert {
    pub der: Vec<u8>,
    pub spki: Vec<u8>,
    pub subject: String,
    pub issuer: String,
    pub serial: String,
}

pub fn parse_der(der: &[u8]) -> EngineResult<ParsedCert> {
    let x509 = X509::from_der(der)
        .map_err(|e| EngineError::Certificate(format!("invalid DER certificate: {e}")))?;
    inspect(&x509, der.to_vec())
}

/// Parse every certificate of a PEM bundle, in file order.
pub fn parse_pem_bundle(pem: &[u8]) -> EngineResult<Vec<ParsedCert>> {
    let stack = X509::stack_from_pem(pem)
        .map_err(|e| EngineError::Certificate(format!("invalid PEM certificate: {e}")))?;
    if stack.is_empty() {
        return Err(EngineError::Certificate("no certificate found in PEM data".into()));
    }
    stack
        .iter()
        .map(|x509| inspect(x509, x509.to_der()?))
        .collect()
}

/// DER SubjectPublicKeyInfo from a `-----BEGIN PUBLIC KEY-----` block.
pub fn spki_from_pem(pem: &[u8]) -> EngineResult<Vec<u8>> {
    let key = PKey::public_key_from_pem(pem)
        .map_err(|e| EngineError::Certificate(format!("invalid PEM public key: {e}")))?;
    Ok(key.public_key_to_der()?)
}

/// Round-trip a DER SubjectPublicKeyInfo through OpenSSL so that garbage is
/// refused up front.
pub fn normalize_spki(der: &[u8]) -> EngineResult<Vec<u8>> {
    let key = PKey::public_key_from_der(der)
        .map_err(|e| EngineError::Certificate(format!("invalid public key: {e}")))?;
    Ok(key.public_key_to_der()?)
}

fn inspect(x509: &X509Ref, der: Vec<u8>) -> EngineResult<ParsedCert> {
    let spki = x509
        .public_key()
        .and_then(|k| k.public_key_to_der())
        .map_err(|e| EngineError::Certificate(format!("unreadable public key: {e}")))?;
    let serial = x509.serial_number().to_bn()?.to_hex_str()?.to_string();
    Ok(ParsedCert {
        der,
        spki,
        subject: name_to_string(x509.subject_name()),
        issuer: name_to_string(x509.issuer_name()),
        serial,
    })
}

/// Raw string contents, or `None` when they hold a NUL or are not UTF-8.
/// Names compared against a hostname must go through this.
pub fn asn1_text(s: &Asn1StringRef) -> Option<&str> {
    let bytes = s.as_slice();
    if bytes.contains(&0) {
        return None;
    }
    std::str::from_utf8(bytes).ok()
}

/// One-line `CN=..., O=...` rendering for logs. Embedded NULs are shown
/// as `\0` rather than truncating the value.
pub fn name_to_string(name: &X509NameRef) -> String {
    name.entries()
        .filter_map(|entry| {
            let key = entry.object().nid().short_name().ok()?;
            let value = String::from_utf8_lossy(entry.data().as_slice()).replace('\0', "\\0");
            Some(format!("{key}={value}"))
        })
        .collect::<Vec<_>>()
        .join(", ")
}
