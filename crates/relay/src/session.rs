//! Session context shared by every path that mutates entities.
//!
//! A [`Session`] bundles the host collaborators, the audit log, the event
//! broadcaster and the per-entity locks. Direct mutations, relayed
//! mutations and undo all run through the pipelines here, so every path
//! records through the same `AuditLog::record` and holds the same lock for
//! resolve, mutate, clamp, persist and log.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as SyncMutex};

use strike_ledger::{
    AppliedVia, AuditEntry, AuditLog, HistoryFilter, LedgerError, MutationKind, StaminaSnapshot,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::amount::require_amount;
use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::events::{Audience, EventBroadcaster, NullBroadcaster, StrikeEvent};
use crate::executor::{self, DamageOptions, MutationOutcome, StatusOptions};
use crate::host::{DamageRule, EntityHost, StandardDamageRule};
use crate::request::{ApplyResult, MutationRequest, UndoRequest};
use crate::snapshot::UndoRecord;
use crate::stamp;
use crate::types::{ConditionSpec, Entity};

/// One async mutex per entity id, created on first use.
#[derive(Debug, Default)]
pub struct EntityLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `entity_id`. Released on drop.
    pub async fn acquire(&self, entity_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(entity_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

/// Correlation ids whose mutation is in progress but not yet recorded.
///
/// A claim is checked and inserted under one lock, and is released when the
/// returned [`Claim`] drops. The lock is never held across an await.
#[derive(Debug, Default)]
struct Claims {
    in_flight: SyncMutex<HashSet<String>>,
}

impl Claims {
    fn claim(self: &Arc<Self>, correlation_id: &str) -> Option<Claim> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        in_flight.insert(correlation_id.to_string()).then(|| Claim {
            claims: Arc::clone(self),
            correlation_id: correlation_id.to_string(),
        })
    }
}

struct Claim {
    claims: Arc<Claims>,
    correlation_id: String,
}

impl Drop for Claim {
    fn drop(&mut self) {
        let mut in_flight = self
            .claims
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        in_flight.remove(&self.correlation_id);
    }
}

/// Everything one arbiter session needs to mutate entities.
pub struct Session {
    host: Arc<dyn EntityHost>,
    rule: Arc<dyn DamageRule>,
    audit: Arc<dyn AuditLog>,
    broadcaster: Arc<dyn EventBroadcaster>,
    locks: EntityLocks,
    claims: Arc<Claims>,
    config: RelayConfig,
}

impl Session {
    /// A session using the standard damage rule, no broadcaster and default
    /// configuration.
    pub fn new(host: Arc<dyn EntityHost>, audit: Arc<dyn AuditLog>) -> Self {
        Self {
            host,
            rule: Arc::new(StandardDamageRule),
            audit,
            broadcaster: Arc::new(NullBroadcaster),
            locks: EntityLocks::new(),
            claims: Arc::new(Claims::default()),
            config: RelayConfig::default(),
        }
    }

    pub fn with_rule(mut self, rule: Arc<dyn DamageRule>) -> Self {
        self.rule = rule;
        self
    }

    pub fn with_broadcaster(mut self, broadcaster: Arc<dyn EventBroadcaster>) -> Self {
        self.broadcaster = broadcaster;
        self
    }

    pub fn with_config(mut self, config: RelayConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn host(&self) -> &Arc<dyn EntityHost> {
        &self.host
    }

    pub fn audit(&self) -> &Arc<dyn AuditLog> {
        &self.audit
    }

    /// Audit entries, oldest first.
    pub async fn history(&self, filter: &HistoryFilter) -> Result<Vec<AuditEntry>, RelayError> {
        Ok(self.audit.list(filter).await?)
    }

    fn audience(&self) -> Audience {
        Audience::from_public_log(self.config.public_log)
    }

    fn emit(&self, event: StrikeEvent) {
        let correlation_id = event.correlation_id().to_string();
        if let Err(e) = self.broadcaster.broadcast(event) {
            warn!(correlation_id = %correlation_id, error = %e, "broadcast failed");
        }
    }

    /// Validate, lock, resolve, mutate, record, broadcast.
    ///
    /// Authorization is the caller's job: the dispatcher routes by ownership
    /// and the elevated executor checks for the arbiter before calling this.
    pub(crate) async fn apply(
        &self,
        request: &MutationRequest,
        via: AppliedVia,
    ) -> Result<ApplyResult, RelayError> {
        request.validate()?;
        let requested = match request.kind {
            MutationKind::Damage | MutationKind::Heal | MutationKind::ResourceGain => {
                Some(require_amount(request.amount.as_ref())?)
            }
            MutationKind::ApplyStatus | MutationKind::RemoveStatus => None,
        };
        // Held until the entry is recorded, so a second request with the same
        // id cannot mutate anything while this one is in flight.
        let _claim = self.claim_correlation(&request.correlation_id).await?;

        let _guard = self.locks.acquire(&request.target_entity_id).await;
        let mut entity = self.host.resolve_entity(&request.target_entity_id).await?;
        let outcome = self.mutate(&mut entity, request).await?;

        let entry = AuditEntry {
            correlation_id: request.correlation_id.clone(),
            kind: request.kind,
            target_entity_id: entity.id.clone(),
            target_name: entity.name.clone(),
            detail: outcome.detail,
            before: outcome.before,
            after: outcome.after,
            source_actor_id: request.source_actor_id.clone(),
            source_actor_name: request.source_actor_name.clone(),
            source_player_name: request.source_player_name.clone(),
            source_item_ref: request.source_item_ref.clone(),
            applied_via: via,
            timestamp: stamp::now_rfc3339(),
            undone_at: None,
        };
        self.audit.record(entry.clone()).await?;
        info!(
            correlation_id = %request.correlation_id,
            target = %entity.id,
            kind = %request.kind,
            applied = outcome.applied_amount,
            ?via,
            "mutation applied"
        );

        self.emit(StrikeEvent::Applied {
            correlation_id: request.correlation_id.clone(),
            audience: self.audience(),
            entry,
        });

        Ok(ApplyResult {
            success: true,
            token_name: Some(entity.name),
            requested_amount: requested,
            damage_applied: (request.kind == MutationKind::Damage).then_some(outcome.applied_amount),
            healing_applied: (request.kind == MutationKind::Heal).then_some(outcome.applied_amount),
            correlation_id: request.correlation_id.clone(),
            error: None,
            message: None,
        })
    }

    async fn claim_correlation(&self, correlation_id: &str) -> Result<Claim, RelayError> {
        let duplicate = || LedgerError::DuplicateCorrelation {
            correlation_id: correlation_id.to_string(),
        };
        let claim = self.claims.claim(correlation_id).ok_or_else(duplicate)?;
        match self.audit.get(correlation_id).await {
            Ok(_) => Err(duplicate().into()),
            Err(LedgerError::EntryNotFound { .. }) => Ok(claim),
            Err(e) => Err(e.into()),
        }
    }

    async fn mutate(
        &self,
        entity: &mut Entity,
        request: &MutationRequest,
    ) -> Result<MutationOutcome, RelayError> {
        let host = self.host.as_ref();
        let amount = || {
            request.amount.as_ref().ok_or_else(|| RelayError::InvalidAmount {
                raw: "null".to_string(),
            })
        };
        let condition = || -> Result<&ConditionSpec, RelayError> {
            request
                .condition
                .as_ref()
                .ok_or_else(|| RelayError::invalid_request("missing condition"))
        };

        match request.kind {
            MutationKind::Damage => {
                let options = DamageOptions {
                    damage_kind: request.damage_kind.clone(),
                    ignored_immunities: request.ignored_immunities.clone(),
                };
                executor::apply_damage(host, self.rule.as_ref(), entity, amount()?, &options).await
            }
            MutationKind::Heal => {
                executor::apply_heal(host, entity, amount()?, request.temporary).await
            }
            MutationKind::ApplyStatus => {
                let options = StatusOptions {
                    source_ref: request.source_item_ref.clone(),
                };
                executor::apply_status(host, entity, condition()?, &options).await
            }
            MutationKind::RemoveStatus => {
                let spec = condition()?;
                let key = spec.display_name.as_deref().unwrap_or(&spec.condition_id);
                executor::remove_status(host, entity, key).await
            }
            MutationKind::ResourceGain => {
                let kind = request
                    .resource_kind
                    .as_deref()
                    .ok_or_else(|| RelayError::invalid_request("missing resourceKind"))?;
                executor::resource_gain(host, entity, kind, amount()?).await
            }
        }
    }

    /// Reverse one logged mutation and mark it undone.
    ///
    /// Returns the entity's name and the stamina it holds afterwards.
    pub(crate) async fn undo(
        &self,
        request: &UndoRequest,
    ) -> Result<(String, StaminaSnapshot), RelayError> {
        let _guard = self.locks.acquire(&request.target_entity_id).await;

        let entry = self.audit.get(&request.correlation_id).await?;
        if entry.target_entity_id != request.target_entity_id {
            return Err(RelayError::invalid_request(format!(
                "entry {} targets {}, not {}",
                entry.correlation_id, entry.target_entity_id, request.target_entity_id
            )));
        }
        if let Some(undone_at) = &entry.undone_at {
            return Err(LedgerError::AlreadyUndone {
                correlation_id: entry.correlation_id.clone(),
                undone_at: undone_at.clone(),
            }
            .into());
        }
        if let Some(claimed) = request.before_snapshot {
            if claimed != entry.before {
                debug!(
                    correlation_id = %entry.correlation_id,
                    ?claimed,
                    recorded = ?entry.before,
                    "undo request snapshot differs from ledger; using ledger"
                );
            }
        }

        let record = UndoRecord::from_entry(&entry).ok_or_else(|| {
            RelayError::invalid_request(format!(
                "entry {} cannot be reversed",
                entry.correlation_id
            ))
        })?;
        let mut entity = self.host.resolve_entity(&entry.target_entity_id).await?;
        let restored = executor::revert(self.host.as_ref(), &mut entity, &record).await?;

        let updated = self
            .audit
            .mark_undone(&entry.correlation_id, &stamp::now_rfc3339())
            .await?;
        info!(
            correlation_id = %entry.correlation_id,
            target = %entity.id,
            kind = %entry.kind,
            "mutation undone"
        );

        self.emit(StrikeEvent::Undone {
            correlation_id: entry.correlation_id.clone(),
            audience: self.audience(),
            restored,
            entry: updated,
        });
        Ok((entity.name, restored))
    }
}
