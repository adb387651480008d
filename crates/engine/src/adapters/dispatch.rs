// adapters/dispatch.rs

use std::sync::Arc;

use crate::domain::error::{EngineError, EngineResult};
use crate::domain::trust_engine::TrustPolicyEngine;

use super::openssl::{probe_tls, ProbeReport, ProbeTarget};

/// Run the blocking probe on tokio's blocking pool and hand the outcome
/// back to the awaiting task. The engine itself never suspends.
pub async fn probe_tls_async(
  engine: Arc<TrustPolicyEngine>,
  target: ProbeTarget,
) -> EngineResult<ProbeReport> {
  tokio::task::spawn_blocking(move || probe_tls(&engine, &target))
    .await
    .map_err(|e| EngineError::Panic(format!("probe task failed: {e}")))?
}
