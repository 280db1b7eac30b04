//! Transport to the arbiter.
//!
//! Requests cross the transport serialized as JSON, so an in-process peer
//! sees exactly what a networked one would.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use strike_ledger::AppliedVia;

use crate::elevated::ElevatedExecutor;
use crate::error::RelayError;
use crate::request::{ApplyResult, MutationRequest};
use crate::types::Principal;

/// Carries a serialized [`MutationRequest`] to the arbiter and brings back
/// the serialized [`ApplyResult`].
#[async_trait]
pub trait ArbiterPeer: Send + Sync {
    /// Returns `Err(RelayError::PeerUnavailable)` if the arbiter cannot be
    /// reached.
    async fn execute(&self, request: Value) -> Result<Value, RelayError>;
}

/// A peer that is never reachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflinePeer;

#[async_trait]
impl ArbiterPeer for OfflinePeer {
    async fn execute(&self, _request: Value) -> Result<Value, RelayError> {
        Err(RelayError::PeerUnavailable {
            reason: "no arbiter connected".to_string(),
        })
    }
}

/// Runs relayed requests on an [`ElevatedExecutor`] in the same process,
/// acting as the given arbiter.
pub struct InProcessPeer {
    executor: ElevatedExecutor,
    arbiter: Principal,
    online: AtomicBool,
    latency: Option<Duration>,
}

impl InProcessPeer {
    pub fn new(executor: ElevatedExecutor, arbiter: Principal) -> Self {
        Self {
            executor,
            arbiter,
            online: AtomicBool::new(true),
            latency: None,
        }
    }

    /// Delay every call by `latency` before it reaches the executor.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArbiterPeer for InProcessPeer {
    async fn execute(&self, request: Value) -> Result<Value, RelayError> {
        if !self.is_online() {
            return Err(RelayError::PeerUnavailable {
                reason: format!("arbiter '{}' is offline", self.arbiter.id),
            });
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let result = match serde_json::from_value::<MutationRequest>(request.clone()) {
            Ok(req) => {
                self.executor
                    .apply(&self.arbiter, req, AppliedVia::Relayed)
                    .await
            }
            Err(e) => {
                let correlation_id = request
                    .get("correlationId")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                ApplyResult::failure(
                    correlation_id,
                    &RelayError::invalid_request(format!("malformed request: {e}")),
                )
            }
        };
        serde_json::to_value(result).map_err(|e| RelayError::PeerUnavailable {
            reason: format!("unencodable response: {e}"),
        })
    }
}
