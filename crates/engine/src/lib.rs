// crates/engine/src/lib.rs

//! Public facade for the TrustPin engine.
//! Exposes a stable API and re-exports types for consumers (mobile FFI,
//! network clients that need a certificate verification hook).

pub mod adapters;
pub mod crypto;
pub mod domain;

/// Judge `chain` (leaf first) for `hostname` under `policy`.
///
/// One-shot helper; callers verifying many handshakes should build a
/// [`TrustPolicyEngine`] once and reuse it. A system trust store that
/// cannot be loaded is reported as `SystemValidationFailed`.
pub fn verify_chain(policy: &TrustPolicy, chain: &CertificateChain, hostname: &str) -> VerificationResult {
    if chain.is_empty() && !matches!(policy, TrustPolicy::TrustAll(_)) {
        return VerificationResult::rejected(RejectReason::EmptyChain);
    }
    match TrustPolicyEngine::new(policy.clone()) {
        Ok(engine) => engine.verify(chain, hostname),
        Err(e) => VerificationResult::rejected(RejectReason::SystemValidationFailed { detail: e.to_string() }),
    }
}

/// Build an engine from a JSON policy configuration.
pub fn engine_from_json(json: &str) -> EngineResult<TrustPolicyEngine> {
    TrustPolicyEngine::from_config(TrustPolicyConfig::from_json(json)?)
}

/// Open a TLS connection to `url` and run `engine` over the peer chain.
#[cfg(feature = "net")]
pub fn probe_url(engine: &TrustPolicyEngine, url: &str) -> EngineResult<ProbeReport> {
    adapters::openssl::probe_tls(engine, &ProbeTarget::from_url(url)?)
}

// Re-exports for convenience
#[cfg(feature = "net")]
pub use adapters::dispatch::probe_tls_async;
#[cfg(feature = "net")]
pub use adapters::openssl::{probe_tls, ProbeReport, ProbeTarget};
pub use adapters::openssl::OpenSslSystemVerifier;
pub use domain::error::{EngineError, EngineResult};
pub use domain::trust_engine::{SystemVerifier, TrustPolicyEngine};
pub use domain::types::{
    BuildMode, CertSummary, Certificate, CertificateChain, DigestAlg, EngineDefaults, HostPattern, Pin,
    PolicyVariant, PublicKey, TrustPolicy, TrustPolicyConfig,
};
pub use domain::verify::{RejectReason, VerificationResult};
