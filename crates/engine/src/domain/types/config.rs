use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::error::{EngineError, EngineResult};

use super::certificate::{Certificate, PublicKey};
use super::core::{BuildMode, DigestAlg};
use super::trust::TrustPolicy;

/// Centralized defaults for the engine.
/// All opinionated defaults should be defined here for consistency.
pub struct EngineDefaults;

impl EngineDefaults {
    // Security defaults
    pub const BUILD_MODE: BuildMode = BuildMode::Release; // Secure default: no trust-all
    pub const PIN_ALGORITHM: DigestAlg = DigestAlg::Sha256; // What OkHttp-style pins use

    // Network defaults
    pub const HTTPS_PORT: u16 = 443;
    pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
}

/// Which policy a config describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolicyVariant {
    SystemDefault,
    TrustAll,
    PinnedCertificate,
    PinnedDigest,
    PinnedPublicKey,
}

/// Serializable trust policy configuration. Certificates and keys are
/// carried as text (PEM, hex) so the engine never touches the filesystem;
/// loading bundled resources is the caller's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustPolicyConfig {
    pub variant: PolicyVariant,
    /// PEM certificate for `PinnedCertificate`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,
    /// Host pattern for `PinnedDigest`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// `sha256/<base64>` pin for `PinnedDigest`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    /// Hex DER or PEM public keys for `PinnedPublicKey`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trusted_keys: Vec<String>,
    /// Optional PEM anchors replacing the platform store for `SystemDefault`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchors: Option<String>,
    #[serde(default)]
    pub build_mode: BuildMode,
}

impl TrustPolicyConfig {
    /// Secure opinionated defaults: platform trust, release mode.
    pub fn secure_default() -> Self {
        Self::for_variant(PolicyVariant::SystemDefault)
    }

    pub fn for_variant(variant: PolicyVariant) -> Self {
        Self {
            variant,
            authority: None,
            hostname: None,
            expected: None,
            trusted_keys: Vec::new(),
            anchors: None,
            build_mode: EngineDefaults::BUILD_MODE,
        }
    }

    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Build the policy. Every configuration error surfaces here, before any
    /// network activity.
    pub fn into_policy(self) -> EngineResult<TrustPolicy> {
        match self.variant {
            PolicyVariant::SystemDefault => match self.anchors {
                Some(pem) => {
                    let anchors = Certificate::from_pem_bundle(pem.as_bytes()).map_err(misconfigured("anchors"))?;
                    TrustPolicy::system_with_anchors(anchors)
                }
                None => Ok(TrustPolicy::system_default()),
            },
            PolicyVariant::TrustAll => TrustPolicy::trust_all(self.build_mode),
            PolicyVariant::PinnedCertificate => {
                let pem = required(self.authority, "authority")?;
                let authority = Certificate::from_pem(pem.as_bytes()).map_err(misconfigured("authority"))?;
                Ok(TrustPolicy::pinned_certificate(authority))
            }
            PolicyVariant::PinnedDigest => {
                let hostname = required(self.hostname, "hostname")?;
                let expected = required(self.expected, "expected")?;
                TrustPolicy::pinned_digest_str(&hostname, &expected)
            }
            PolicyVariant::PinnedPublicKey => {
                let keys = self
                    .trusted_keys
                    .iter()
                    .map(|k| parse_public_key(k))
                    .collect::<EngineResult<Vec<_>>>()?;
                TrustPolicy::pinned_public_keys(keys)
            }
        }
    }
}

impl Default for TrustPolicyConfig {
    fn default() -> Self {
        Self::secure_default()
    }
}

fn required(value: Option<String>, field: &str) -> EngineResult<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| EngineError::MisconfiguredPolicy(format!("missing `{field}`")))
}

fn parse_public_key(s: &str) -> EngineResult<PublicKey> {
    let key = if s.contains("-----BEGIN") {
        PublicKey::from_pem(s.as_bytes())
    } else {
        PublicKey::from_hex(s)
    };
    key.map_err(misconfigured("trustedKeys"))
}

fn misconfigured(field: &'static str) -> impl Fn(EngineError) -> EngineError {
    move |e| EngineError::MisconfiguredPolicy(format!("`{field}`: {e}"))
}
