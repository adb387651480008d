//! Primitive crypto helpers backed by OpenSSL: digests, constant-time
//! comparison and X.509 inspection.

pub mod digest;
pub mod x509;
