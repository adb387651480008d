//! Digest computation for certificate pins.

use openssl::hash::{hash, MessageDigest};
use openssl::memcmp;

use crate::domain::error::EngineResult;
use crate::domain::types::DigestAlg;

fn message_digest(alg: DigestAlg) -> MessageDigest {
    match alg {
        DigestAlg::Sha1 => MessageDigest::sha1(),
        DigestAlg::Sha256 => MessageDigest::sha256(),
        DigestAlg::Sha384 => MessageDigest::sha384(),
        DigestAlg::Sha512 => MessageDigest::sha512(),
    }
}

/// Hash `data` with `alg`.
pub fn digest(alg: DigestAlg, data: &[u8]) -> EngineResult<Vec<u8>> {
    Ok(hash(message_digest(alg), data)?.to_vec())
}

/// Constant-time equality. Only the lengths leak, and those are fixed per
/// algorithm.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    // memcmp::eq panics on unequal lengths
    a.len() == b.len() && memcmp::eq(a, b)
}
