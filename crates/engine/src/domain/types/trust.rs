use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use openssl::base64;
use tracing::warn;

use crate::domain::error::{EngineError, EngineResult};

use super::certificate::{Certificate, PublicKey};
use super::core::{BuildMode, DigestAlg};
use super::host::HostPattern;

/// A digest of a SubjectPublicKeyInfo, written `sha256/<base64>`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Pin {
    alg: DigestAlg,
    hash: Vec<u8>,
}

impl Pin {
    pub fn new(alg: DigestAlg, hash: Vec<u8>) -> EngineResult<Self> {
        if hash.len() != alg.output_len() {
            return Err(EngineError::MisconfiguredPolicy(format!(
                "{} pin must be {} bytes, got {}",
                alg.prefix(),
                alg.output_len(),
                hash.len()
            )));
        }
        Ok(Self { alg, hash })
    }

    pub fn alg(&self) -> DigestAlg {
        self.alg
    }

    pub fn hash(&self) -> &[u8] {
        &self.hash
    }
}

impl FromStr for Pin {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (prefix, encoded) = s.split_once('/').ok_or_else(|| {
            EngineError::MisconfiguredPolicy(format!("pin must look like sha256/<base64>: {s}"))
        })?;
        let alg = DigestAlg::from_prefix(prefix).ok_or_else(|| {
            EngineError::MisconfiguredPolicy(format!("unsupported pin algorithm: {prefix}"))
        })?;
        let hash = base64::decode_block(encoded)
            .map_err(|_| EngineError::MisconfiguredPolicy(format!("pin is not valid base64: {s}")))?;
        Pin::new(alg, hash)
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.alg.prefix(), base64::encode_block(&self.hash))
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pin({self})")
    }
}

/// Proof that a policy was built in debug mode. Cannot be constructed
/// outside this module, so `TrustPolicy::TrustAll` can only come from
/// [`TrustPolicy::trust_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugOnly(());

/// How a presented certificate chain is judged. Immutable once built and
/// safe to share between any number of concurrent handshakes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrustPolicy {
    /// Platform trust store (or the given anchors) plus hostname check.
    SystemDefault { anchors: Option<Vec<Certificate>> },
    /// Accept anything. Debug builds only.
    TrustAll(DebugOnly),
    /// Chain must contain a certificate byte-identical to `authority`.
    PinnedCertificate { authority: Certificate },
    /// Host must match and some chain entry's SPKI digest must equal `pin`.
    PinnedDigest { hostname: HostPattern, pin: Pin },
    /// Some chain entry must carry one of `trusted_keys`.
    PinnedPublicKey { trusted_keys: HashSet<PublicKey> },
}

impl TrustPolicy {
    pub fn system_default() -> Self {
        TrustPolicy::SystemDefault { anchors: None }
    }

    /// System validation against `anchors` instead of the platform store.
    pub fn system_with_anchors(anchors: Vec<Certificate>) -> EngineResult<Self> {
        if anchors.is_empty() {
            return Err(EngineError::MisconfiguredPolicy("anchor list is empty".into()));
        }
        Ok(TrustPolicy::SystemDefault { anchors: Some(anchors) })
    }

    pub fn trust_all(mode: BuildMode) -> EngineResult<Self> {
        match mode {
            BuildMode::Debug => {
                warn!("trust-all policy constructed; certificate validation is disabled");
                Ok(TrustPolicy::TrustAll(DebugOnly(())))
            }
            BuildMode::Release => Err(EngineError::MisconfiguredPolicy(
                "trust-all policy requires debug build mode".into(),
            )),
        }
    }

    pub fn pinned_certificate(authority: Certificate) -> Self {
        TrustPolicy::PinnedCertificate { authority }
    }

    pub fn pinned_digest(hostname: &str, alg: DigestAlg, expected: Vec<u8>) -> EngineResult<Self> {
        Ok(TrustPolicy::PinnedDigest {
            hostname: HostPattern::parse(hostname)?,
            pin: Pin::new(alg, expected)?,
        })
    }

    /// Digest pin in textual form, e.g.
    /// `pinned_digest_str("juejin.cn", "sha256/bCyTfyF4MY0Vx6sa6j+AYVRdHbhZvC2w3XvCAo6sMCg=")`.
    pub fn pinned_digest_str(hostname: &str, pin: &str) -> EngineResult<Self> {
        Ok(TrustPolicy::PinnedDigest {
            hostname: HostPattern::parse(hostname)?,
            pin: pin.parse()?,
        })
    }

    pub fn pinned_public_keys<I>(keys: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = PublicKey>,
    {
        let trusted_keys: HashSet<PublicKey> = keys.into_iter().collect();
        if trusted_keys.is_empty() {
            return Err(EngineError::MisconfiguredPolicy("trusted key set is empty".into()));
        }
        Ok(TrustPolicy::PinnedPublicKey { trusted_keys })
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TrustPolicy::SystemDefault { .. } => "system_default",
            TrustPolicy::TrustAll(_) => "trust_all",
            TrustPolicy::PinnedCertificate { .. } => "pinned_certificate",
            TrustPolicy::PinnedDigest { .. } => "pinned_digest",
            TrustPolicy::PinnedPublicKey { .. } => "pinned_public_key",
        }
    }
}
