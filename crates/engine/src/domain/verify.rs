// crates/engine/src/domain/verify.rs
use std::fmt;

use serde::Serialize;

use super::error::{EngineError, EngineResult};

/// Why a chain was refused. Every reason is terminal for the handshake it
/// was produced for.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum RejectReason {
    EmptyChain,
    HostnameMismatch { expected: String, actual: String },
    DigestMismatch,
    PublicKeyMismatch,
    CertificateMismatch,
    SystemValidationFailed { detail: String },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::EmptyChain => f.write_str("peer presented an empty certificate chain"),
            RejectReason::HostnameMismatch { expected, actual } => {
                write!(f, "hostname {actual} does not match pinned host {expected}")
            }
            RejectReason::DigestMismatch => f.write_str("no certificate matches the pinned digest"),
            RejectReason::PublicKeyMismatch => f.write_str("no certificate carries a trusted public key"),
            RejectReason::CertificateMismatch => f.write_str("pinned certificate not present in chain"),
            RejectReason::SystemValidationFailed { detail } => {
                write!(f, "system validation failed: {detail}")
            }
        }
    }
}

/// Outcome of a single `verify` call.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum VerificationResult {
    Accepted,
    Rejected { reason: RejectReason },
}

impl VerificationResult {
    pub fn rejected(reason: RejectReason) -> Self {
        VerificationResult::Rejected { reason }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, VerificationResult::Accepted)
    }

    pub fn reason(&self) -> Option<&RejectReason> {
        match self {
            VerificationResult::Accepted => None,
            VerificationResult::Rejected { reason } => Some(reason),
        }
    }

    /// Turn a rejection into `EngineError::Rejected` so it can be propagated
    /// with `?` by the handshake layer.
    pub fn into_result(self) -> EngineResult<()> {
        match self {
            VerificationResult::Accepted => Ok(()),
            VerificationResult::Rejected { reason } => Err(EngineError::Rejected(reason)),
        }
    }
}
