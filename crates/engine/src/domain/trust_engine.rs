// crates/engine/src/domain/trust_engine.rs

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::adapters::openssl::OpenSslSystemVerifier;
use crate::crypto::digest::{constant_time_eq, digest};

use super::error::EngineResult;
use super::types::{CertificateChain, EngineDefaults, TrustPolicy, TrustPolicyConfig};
use super::verify::{RejectReason, VerificationResult};

/// Platform path validation (chain of trust, validity period, hostname),
/// used by `TrustPolicy::SystemDefault`. The error string is the detail
/// carried by `RejectReason::SystemValidationFailed`.
pub trait SystemVerifier: Send + Sync + fmt::Debug {
    fn validate(&self, chain: &CertificateChain, hostname: &str) -> Result<(), String>;
}

/// A trust policy bound to the system verifier it may need. Cheap to share:
/// `verify` takes `&self` and keeps no per-call state, so one engine can
/// serve any number of concurrent handshakes.
#[derive(Debug, Clone)]
pub struct TrustPolicyEngine {
    policy: TrustPolicy,
    system: Option<Arc<dyn SystemVerifier>>,
}

impl TrustPolicyEngine {
    /// Bind `policy` to OpenSSL. `SystemDefault` uses the process-wide
    /// platform store, or a dedicated store when the policy carries anchors.
    pub fn new(policy: TrustPolicy) -> EngineResult<Self> {
        let system: Option<Arc<dyn SystemVerifier>> = match &policy {
            TrustPolicy::SystemDefault { anchors: Some(anchors) } => {
                Some(Arc::new(OpenSslSystemVerifier::with_anchors(anchors)?))
            }
            TrustPolicy::SystemDefault { anchors: None } => Some(OpenSslSystemVerifier::shared()?),
            _ => None,
        };
        Ok(Self { policy, system })
    }

    /// Bind `policy` to a caller-supplied system verifier.
    pub fn with_system_verifier(policy: TrustPolicy, system: Arc<dyn SystemVerifier>) -> Self {
        Self { policy, system: Some(system) }
    }

    pub fn from_config(config: TrustPolicyConfig) -> EngineResult<Self> {
        Self::new(config.into_policy()?)
    }

    pub fn policy(&self) -> &TrustPolicy {
        &self.policy
    }

    /// Judge a leaf-first chain presented for `hostname`.
    pub fn verify(&self, chain: &CertificateChain, hostname: &str) -> VerificationResult {
        let (result, depth) = self.evaluate(chain, hostname);
        match &result {
            VerificationResult::Accepted => {
                if matches!(self.policy, TrustPolicy::TrustAll(_)) {
                    warn!(host = hostname, "trust-all policy accepted chain without inspection");
                } else {
                    debug!(
                        policy = self.policy.kind(),
                        host = hostname,
                        depth = ?depth,
                        subject = depth.and_then(|d| chain.as_slice().get(d)).map(|c| c.subject()),
                        "certificate chain accepted"
                    );
                }
            }
            VerificationResult::Rejected { reason } => {
                let subjects: Vec<&str> = chain.iter().map(|c| c.subject()).collect();
                warn!(
                    policy = self.policy.kind(),
                    host = hostname,
                    %reason,
                    ?subjects,
                    pins = ?chain.pins(EngineDefaults::PIN_ALGORITHM),
                    "certificate chain rejected"
                );
            }
        }
        result
    }

    /// Parse a DER chain in handshake order, then `verify` it.
    pub fn verify_der<B: AsRef<[u8]>>(&self, chain: &[B], hostname: &str) -> EngineResult<VerificationResult> {
        let chain = CertificateChain::from_der(chain)?;
        Ok(self.verify(&chain, hostname))
    }

    /// The decision plus the chain depth that satisfied a pin, if any.
    fn evaluate(&self, chain: &CertificateChain, hostname: &str) -> (VerificationResult, Option<usize>) {
        if let TrustPolicy::TrustAll(_) = self.policy {
            return (VerificationResult::Accepted, None);
        }
        if chain.is_empty() {
            return (VerificationResult::rejected(RejectReason::EmptyChain), None);
        }

        match &self.policy {
            TrustPolicy::TrustAll(_) => (VerificationResult::Accepted, None),

            TrustPolicy::SystemDefault { .. } => {
                let outcome = match &self.system {
                    Some(system) => system.validate(chain, hostname),
                    None => Err("no system verifier configured".to_string()),
                };
                match outcome {
                    Ok(()) => (VerificationResult::Accepted, Some(0)),
                    Err(detail) => (
                        VerificationResult::rejected(RejectReason::SystemValidationFailed { detail }),
                        None,
                    ),
                }
            }

            // Replaces path validation entirely, and checks no hostname.
            TrustPolicy::PinnedCertificate { authority } => {
                match chain.iter().position(|cert| cert.der() == authority.der()) {
                    Some(depth) => (VerificationResult::Accepted, Some(depth)),
                    None => (VerificationResult::rejected(RejectReason::CertificateMismatch), None),
                }
            }

            TrustPolicy::PinnedDigest { hostname: pattern, pin } => {
                if !pattern.matches(hostname) {
                    let reason = RejectReason::HostnameMismatch {
                        expected: pattern.to_string(),
                        actual: hostname.to_string(),
                    };
                    return (VerificationResult::rejected(reason), None);
                }
                let depth = chain.iter().position(|cert| {
                    digest(pin.alg(), cert.public_key().as_der())
                        .map(|actual| constant_time_eq(&actual, pin.hash()))
                        .unwrap_or(false)
                });
                match depth {
                    Some(depth) => (VerificationResult::Accepted, Some(depth)),
                    None => (VerificationResult::rejected(RejectReason::DigestMismatch), None),
                }
            }

            TrustPolicy::PinnedPublicKey { trusted_keys } => {
                match chain.iter().position(|cert| trusted_keys.contains(cert.public_key())) {
                    Some(depth) => (VerificationResult::Accepted, Some(depth)),
                    None => (VerificationResult::rejected(RejectReason::PublicKeyMismatch), None),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::BuildMode;

    #[derive(Debug)]
    struct FixedSystem(Result<(), String>);

    impl SystemVerifier for FixedSystem {
        fn validate(&self, _chain: &CertificateChain, _hostname: &str) -> Result<(), String> {
            self.0.clone()
        }
    }

    #[test]
    fn trust_all_accepts_empty_chain() {
        let engine = TrustPolicyEngine::new(TrustPolicy::trust_all(BuildMode::Debug).unwrap()).unwrap();
        assert!(engine.verify(&CertificateChain::default(), "example.com").is_accepted());
    }

    #[test]
    fn system_default_rejects_empty_chain_without_consulting_verifier() {
        let engine = TrustPolicyEngine::with_system_verifier(
            TrustPolicy::system_default(),
            Arc::new(FixedSystem(Ok(()))),
        );
        let res = engine.verify(&CertificateChain::default(), "example.com");
        assert_eq!(res.reason(), Some(&RejectReason::EmptyChain));
    }

    #[test]
    fn engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TrustPolicyEngine>();
        assert_send_sync::<TrustPolicy>();
    }
}
