use std::sync::Arc;

use trustpin_engine::domain::error::EngineError;
use trustpin_engine::domain::types as dt;
use trustpin_engine::domain::verify::{RejectReason, VerificationResult};
use trustpin_engine::{Certificate, CertificateChain, TrustPolicyEngine};

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum FfiError {
    #[error("{message}")]
    Misconfigured { message: String },
    #[error("{message}")]
    Certificate { message: String },
    #[error("{reason:?}")]
    Rejected { reason: FfiRejectReason },
    #[error("{message}")]
    Network { message: String },
    #[error("{message}")]
    Tls { message: String },
    #[error("{message}")]
    Generic { message: String },
}

impl From<EngineError> for FfiError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::MisconfiguredPolicy(_) | EngineError::Config(_) | EngineError::Json(_) => {
                FfiError::Misconfigured { message: e.to_string() }
            }
            #[cfg(feature = "net")]
            EngineError::Url(_) => {
                FfiError::Misconfigured { message: e.to_string() }
            }
            EngineError::Certificate(_) => FfiError::Certificate { message: e.to_string() },
            EngineError::Rejected(reason) => FfiError::Rejected { reason: reason.into() },
            EngineError::Io(_) => FfiError::Network { message: e.to_string() },
            EngineError::Tls(_) => FfiError::Tls { message: e.to_string() },
            other => FfiError::Generic { message: other.to_string() },
        }
    }
}

// ===== FFI types mirroring the public Rust API (FFI-friendly) =====

#[derive(uniffi::Enum, Debug, Clone, Copy)]
pub enum FfiPolicyVariant { SystemDefault, TrustAll, PinnedCertificate, PinnedDigest, PinnedPublicKey }

impl From<FfiPolicyVariant> for dt::PolicyVariant {
    fn from(v: FfiPolicyVariant) -> Self {
        match v {
            FfiPolicyVariant::SystemDefault => dt::PolicyVariant::SystemDefault,
            FfiPolicyVariant::TrustAll => dt::PolicyVariant::TrustAll,
            FfiPolicyVariant::PinnedCertificate => dt::PolicyVariant::PinnedCertificate,
            FfiPolicyVariant::PinnedDigest => dt::PolicyVariant::PinnedDigest,
            FfiPolicyVariant::PinnedPublicKey => dt::PolicyVariant::PinnedPublicKey,
        }
    }
}

#[derive(uniffi::Enum, Debug, Clone, Copy)]
pub enum FfiBuildMode { Debug, Release }

impl From<FfiBuildMode> for dt::BuildMode {
    fn from(v: FfiBuildMode) -> Self {
        match v { FfiBuildMode::Debug => dt::BuildMode::Debug, FfiBuildMode::Release => dt::BuildMode::Release }
    }
}

#[derive(uniffi::Record, Debug, Clone)]
pub struct FfiTrustPolicyConfig {
    pub variant: FfiPolicyVariant,
    pub authority: Option<String>,   // PEM certificate
    pub hostname: Option<String>,    // host pattern for digest pins
    pub expected: Option<String>,    // sha256/<base64>
    pub trusted_keys: Vec<String>,   // hex DER or PEM public keys
    pub anchors: Option<String>,     // PEM bundle replacing the platform store
    pub build_mode: FfiBuildMode,
}

impl From<FfiTrustPolicyConfig> for dt::TrustPolicyConfig {
    fn from(v: FfiTrustPolicyConfig) -> Self {
        dt::TrustPolicyConfig {
            variant: v.variant.into(),
            authority: v.authority,
            hostname: v.hostname,
            expected: v.expected,
            trusted_keys: v.trusted_keys,
            anchors: v.anchors,
            build_mode: v.build_mode.into(),
        }
    }
}

// ===== Verification result mappings =====

#[derive(uniffi::Enum, Debug, Clone, PartialEq, Eq)]
pub enum FfiRejectReason {
    EmptyChain,
    HostnameMismatch { expected: String, actual: String },
    DigestMismatch,
    PublicKeyMismatch,
    CertificateMismatch,
    SystemValidationFailed { detail: String },
}

impl From<RejectReason> for FfiRejectReason {
    fn from(r: RejectReason) -> Self {
        match r {
            RejectReason::EmptyChain => FfiRejectReason::EmptyChain,
            RejectReason::HostnameMismatch { expected, actual } => FfiRejectReason::HostnameMismatch { expected, actual },
            RejectReason::DigestMismatch => FfiRejectReason::DigestMismatch,
            RejectReason::PublicKeyMismatch => FfiRejectReason::PublicKeyMismatch,
            RejectReason::CertificateMismatch => FfiRejectReason::CertificateMismatch,
            RejectReason::SystemValidationFailed { detail } => FfiRejectReason::SystemValidationFailed { detail },
        }
    }
}

#[derive(uniffi::Record, Debug, Clone)]
pub struct FfiVerificationResult {
    pub accepted: bool,
    pub reason: Option<FfiRejectReason>,
    /// Human-readable reason, for display.
    pub message: Option<String>,
}

impl From<VerificationResult> for FfiVerificationResult {
    fn from(v: VerificationResult) -> Self {
        match v {
            VerificationResult::Accepted => FfiVerificationResult { accepted: true, reason: None, message: None },
            VerificationResult::Rejected { reason } => FfiVerificationResult {
                accepted: false,
                message: Some(reason.to_string()),
                reason: Some(reason.into()),
            },
        }
    }
}

#[derive(uniffi::Record, Debug, Clone)]
pub struct FfiCertSummary {
    pub subject: String,
    pub issuer: String,
    pub serial: String,
    pub sha256_pin: Option<String>,
}

impl From<dt::CertSummary> for FfiCertSummary {
    fn from(c: dt::CertSummary) -> Self {
        FfiCertSummary { subject: c.subject, issuer: c.issuer, serial: c.serial, sha256_pin: c.sha256_pin }
    }
}

#[cfg(feature = "net")]
#[derive(uniffi::Record, Debug, Clone)]
pub struct FfiProbeReport {
    pub host: String,
    pub port: u16,
    pub protocol: String,
    pub cipher: Option<String>,
    pub chain: Vec<FfiCertSummary>,
}

#[cfg(feature = "net")]
impl From<trustpin_engine::ProbeReport> for FfiProbeReport {
    fn from(r: trustpin_engine::ProbeReport) -> Self {
        FfiProbeReport {
            host: r.host,
            port: r.port,
            protocol: r.protocol,
            cipher: r.cipher,
            chain: r.chain.into_iter().map(Into::into).collect(),
        }
    }
}

// ===== Engine object: build once, share across requests =====

#[derive(uniffi::Object, Debug)]
pub struct FfiTrustEngine {
    inner: TrustPolicyEngine,
}

#[uniffi::export]
impl FfiTrustEngine {
    /// Fails fast on a bad configuration (e.g. trust-all in release mode).
    #[uniffi::constructor]
    pub fn new(cfg: FfiTrustPolicyConfig) -> Result<Arc<Self>, FfiError> {
        let inner = TrustPolicyEngine::from_config(cfg.into())?;
        Ok(Arc::new(Self { inner }))
    }

    /// Verify a DER chain, leaf first, presented for `hostname`.
    pub fn verify(&self, chain: Vec<Vec<u8>>, hostname: String) -> Result<FfiVerificationResult, FfiError> {
        Ok(self.inner.verify_der(&chain, &hostname)?.into())
    }
}

#[cfg(feature = "net")]
#[uniffi::export]
impl FfiTrustEngine {
    /// Blocking; call from a background thread.
    pub fn probe(&self, url: String) -> Result<FfiProbeReport, FfiError> {
        Ok(trustpin_engine::probe_url(&self.inner, &url)?.into())
    }
}

// ===== High-level API, mirroring Rust surface =====

#[uniffi::export]
pub fn verify_chain_ffi(
    cfg: FfiTrustPolicyConfig,
    chain: Vec<Vec<u8>>,
    hostname: String,
) -> Result<FfiVerificationResult, FfiError> {
    let engine = TrustPolicyEngine::from_config(cfg.into())?;
    let chain = CertificateChain::from_der(&chain)?;
    Ok(engine.verify(&chain, &hostname).into())
}

#[cfg(feature = "net")]
#[uniffi::export]
pub fn probe_url_ffi(cfg: FfiTrustPolicyConfig, url: String) -> Result<FfiProbeReport, FfiError> {
    let engine = TrustPolicyEngine::from_config(cfg.into())?;
    Ok(trustpin_engine::probe_url(&engine, &url)?.into())
}

/// `sha256/<base64>` pin of a PEM certificate's public key, for building
/// digest-pinning configs from a bundled certificate.
#[uniffi::export]
pub fn pin_for_certificate_ffi(pem: String) -> Result<String, FfiError> {
    let cert = Certificate::from_pem(pem.as_bytes())?;
    Ok(cert.pin(dt::EngineDefaults::PIN_ALGORITHM)?.to_string())
}

uniffi::setup_scaffolding!();
