// crates/engine/src/domain/error.rs
use thiserror::Error;

use super::verify::RejectReason;

#[derive(Debug, Error)]
pub enum EngineError {
  #[error("configuration: {0}")]
  Config(String),

  /// Invalid policy configuration. Raised while building a policy, never
  /// from `verify`.
  #[error("misconfigured policy: {0}")]
  MisconfiguredPolicy(String),

  #[error("certificate: {0}")]
  Certificate(String),

  /// The peer chain was presented but the trust policy refused it.
  #[error("certificate rejected: {0}")]
  Rejected(RejectReason),

  #[error("tls handshake: {0}")]
  Tls(String),

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error(transparent)]
  Json(#[from] serde_json::Error),

  #[cfg(feature = "net")]
  #[error(transparent)]
  Url(#[from] url::ParseError),

  #[error("internal panic: {0}")]
  Panic(String),
}

impl EngineError {
  /// True when the failure came from the trust decision rather than the
  /// network or the TLS layer.
  pub fn is_rejection(&self) -> bool {
    matches!(self, EngineError::Rejected(_))
  }
}

impl From<openssl::error::ErrorStack> for EngineError {
  fn from(e: openssl::error::ErrorStack) -> Self {
    EngineError::Certificate(e.to_string())
  }
}

pub type EngineResult<T> = Result<T, EngineError>;
