use serde::{Deserialize, Serialize};

/// Build flavour the policy is configured for. `TrustAll` only exists in
/// `Debug`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    Debug,
    #[default]
    Release,
}

/// Digest algorithms accepted for certificate pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlg {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlg {
    /// Prefix used in the textual pin form, e.g. `sha256/`.
    pub fn prefix(self) -> &'static str {
        match self {
            DigestAlg::Sha1 => "sha1",
            DigestAlg::Sha256 => "sha256",
            DigestAlg::Sha384 => "sha384",
            DigestAlg::Sha512 => "sha512",
        }
    }

    pub fn from_prefix(s: &str) -> Option<Self> {
        match s {
            "sha1" => Some(DigestAlg::Sha1),
            "sha256" => Some(DigestAlg::Sha256),
            "sha384" => Some(DigestAlg::Sha384),
            "sha512" => Some(DigestAlg::Sha512),
            _ => None,
        }
    }

    pub fn output_len(self) -> usize {
        match self {
            DigestAlg::Sha1 => 20,
            DigestAlg::Sha256 => 32,
            DigestAlg::Sha384 => 48,
            DigestAlg::Sha512 => 64,
        }
    }
}
