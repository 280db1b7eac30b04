//! The arbiter-side handler for relayed mutations and undo.
//!
//! Every request moves through
//! `received -> authorized -> validated -> entity resolved -> mutated ->
//! logged -> broadcast`. Any failure ends in a structured result; no error
//! escapes this boundary.

use std::sync::Arc;

use strike_ledger::AppliedVia;
use tracing::{debug, warn};

use crate::gate::require_arbiter;
use crate::request::{ApplyResult, MutationRequest, UndoRequest, UndoResult};
use crate::session::Session;
use crate::types::Principal;

/// Executes mutations with the arbiter's authority.
#[derive(Clone)]
pub struct ElevatedExecutor {
    session: Arc<Session>,
}

impl ElevatedExecutor {
    pub fn new(session: Arc<Session>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Apply one mutation on behalf of `caller`, who must be the arbiter.
    pub async fn apply(
        &self,
        caller: &Principal,
        request: MutationRequest,
        via: AppliedVia,
    ) -> ApplyResult {
        if let Err(e) = require_arbiter(caller) {
            warn!(
                correlation_id = %request.correlation_id,
                caller = %caller.id,
                "rejected unauthorized apply"
            );
            return ApplyResult::failure(&request.correlation_id, &e);
        }
        debug!(
            correlation_id = %request.correlation_id,
            target = %request.target_entity_id,
            kind = %request.kind,
            "apply received"
        );

        match self.session.apply(&request, via).await {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    correlation_id = %request.correlation_id,
                    target = %request.target_entity_id,
                    kind = %request.kind,
                    error = %e,
                    "apply failed"
                );
                ApplyResult::failure(&request.correlation_id, &e)
            }
        }
    }

    /// Undo one logged mutation on behalf of `caller`, who must be the
    /// arbiter.
    pub async fn undo(&self, caller: &Principal, request: UndoRequest) -> UndoResult {
        if let Err(e) = require_arbiter(caller) {
            warn!(
                correlation_id = %request.correlation_id,
                caller = %caller.id,
                "rejected unauthorized undo"
            );
            return UndoResult::failure(&request.correlation_id, &e);
        }

        match self.session.undo(&request).await {
            Ok((token_name, restored)) => UndoResult {
                success: true,
                token_name: Some(token_name),
                restored_stamina: Some(restored),
                correlation_id: request.correlation_id,
                error: None,
                message: None,
            },
            Err(e) => {
                warn!(
                    correlation_id = %request.correlation_id,
                    target = %request.target_entity_id,
                    error = %e,
                    "undo failed"
                );
                UndoResult::failure(&request.correlation_id, &e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::Amount;
    use crate::memory::MemoryHost;
    use crate::types::{Entity, EntityClass, Stamina};
    use strike_ledger::{AuditLog, InMemoryAuditLog, MutationKind};

    fn hero() -> Entity {
        Entity {
            id: "hero-1".to_string(),
            name: "Talia".to_string(),
            class: EntityClass::Hero,
            stamina: Stamina {
                permanent: 20,
                temporary: 0,
                max: 20,
                min: -10,
            },
            resources: Default::default(),
            conditions: vec![],
            owners: Default::default(),
            immunities: Default::default(),
            weaknesses: Default::default(),
        }
    }

    fn setup() -> (Arc<MemoryHost>, Arc<InMemoryAuditLog>, ElevatedExecutor) {
        let host = Arc::new(MemoryHost::with_entities([hero()]));
        let audit = Arc::new(InMemoryAuditLog::new());
        let session = Session::new(host.clone(), audit.clone());
        (host, audit, ElevatedExecutor::new(Arc::new(session)))
    }

    fn damage(amount: i64, correlation_id: &str) -> MutationRequest {
        let mut req = MutationRequest::new(MutationKind::Damage, "hero-1", correlation_id);
        req.amount = Some(Amount::Int(amount));
        req
    }

    #[tokio::test]
    async fn requester_cannot_apply() {
        let (host, audit, exec) = setup();
        let p = Principal::requester("p1", "Ada", None);
        let result = exec.apply(&p, damage(8, "c-1"), AppliedVia::Relayed).await;
        assert_eq!(result.error_code(), Some("Unauthorized"));
        assert_eq!(host.get("hero-1").await.unwrap().stamina.permanent, 20);
        assert!(audit.is_empty().await);
    }

    #[tokio::test]
    async fn duplicate_correlation_id_rejected_before_mutation() {
        let (host, _audit, exec) = setup();
        let gm = Principal::arbiter("gm", "GM");
        assert!(exec.apply(&gm, damage(3, "c-1"), AppliedVia::Relayed).await.success);
        let again = exec.apply(&gm, damage(3, "c-1"), AppliedVia::Relayed).await;
        assert_eq!(again.error_code(), Some("DuplicateCorrelation"));
        assert_eq!(host.get("hero-1").await.unwrap().stamina.permanent, 17);
    }

    #[tokio::test]
    async fn undo_mismatched_target_rejected() {
        let (_host, _audit, exec) = setup();
        let gm = Principal::arbiter("gm", "GM");
        exec.apply(&gm, damage(3, "c-1"), AppliedVia::Relayed).await;
        let result = exec
            .undo(
                &gm,
                UndoRequest {
                    target_entity_id: "goblin-1".to_string(),
                    before_snapshot: None,
                    correlation_id: "c-1".to_string(),
                },
            )
            .await;
        assert_eq!(result.error.as_deref(), Some("InvalidRequest"));
    }

    #[tokio::test]
    async fn relayed_entry_records_origin() {
        let (_host, audit, exec) = setup();
        let gm = Principal::arbiter("gm", "GM");
        exec.apply(&gm, damage(3, "c-1"), AppliedVia::Relayed).await;
        let entry = audit.get("c-1").await.unwrap();
        assert_eq!(entry.applied_via, AppliedVia::Relayed);
    }
}
