//! Requester-side entry point.
//!
//! The dispatcher takes one action against a list of targets, asks for
//! self-target confirmation when needed, then handles each target in order:
//! owned targets are mutated locally, the rest are forwarded to the arbiter.
//! Every target is attempted and reported on its own.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strike_ledger::{AppliedVia, MutationKind};
use tracing::{debug, info, warn};

use crate::amount::{require_amount, Amount};
use crate::confirm::{self_target_prompt, ConfirmationChannel, SelfTargetPrompt};
use crate::error::RelayError;
use crate::gate::{route, Route};
use crate::peer::ArbiterPeer;
use crate::request::{ApplyResult, MutationRequest};
use crate::session::Session;
use crate::stamp;
use crate::types::{ConditionSpec, Entity, Principal};

fn default_damage_kind() -> String {
    "untyped".to_string()
}

/// One action a requester fires at one or more targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrikeAction {
    pub kind: MutationKind,
    pub targets: Vec<String>,
    #[serde(default)]
    pub amount: Option<Amount>,
    #[serde(default = "default_damage_kind")]
    pub damage_kind: String,
    #[serde(default)]
    pub ignored_immunities: Vec<String>,
    #[serde(default)]
    pub temporary: bool,
    /// Halve the damage (rounding down) before dispatch.
    #[serde(default)]
    pub halve: bool,
    #[serde(default)]
    pub condition: Option<ConditionSpec>,
    #[serde(default)]
    pub resource_kind: Option<String>,
    #[serde(default)]
    pub source_actor_id: Option<String>,
    #[serde(default)]
    pub source_actor_name: Option<String>,
    #[serde(default)]
    pub source_item_ref: Option<String>,
}

impl StrikeAction {
    pub fn new(kind: MutationKind, targets: &[&str]) -> Self {
        Self {
            kind,
            targets: targets.iter().map(|t| t.to_string()).collect(),
            amount: None,
            damage_kind: default_damage_kind(),
            ignored_immunities: Vec::new(),
            temporary: false,
            halve: false,
            condition: None,
            resource_kind: None,
            source_actor_id: None,
            source_actor_name: None,
            source_item_ref: None,
        }
    }

    pub fn with_amount(mut self, amount: impl Into<Amount>) -> Self {
        self.amount = Some(amount.into());
        self
    }

    fn takes_amount(&self) -> bool {
        matches!(
            self.kind,
            MutationKind::Damage | MutationKind::Heal | MutationKind::ResourceGain
        )
    }
}

/// What happened to one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetOutcome {
    pub target_entity_id: String,
    /// `None` when the target could not be resolved.
    pub route: Option<Route>,
    pub result: ApplyResult,
}

impl TargetOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.success
    }
}

/// Result of one dispatched action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// The requester declined the self-target prompt; nothing was sent.
    Cancelled { prompt: SelfTargetPrompt },
    Completed { targets: Vec<TargetOutcome> },
}

impl DispatchOutcome {
    pub fn targets(&self) -> &[TargetOutcome] {
        match self {
            DispatchOutcome::Cancelled { .. } => &[],
            DispatchOutcome::Completed { targets } => targets.as_slice(),
        }
    }
}

/// Routes actions to local executors or to the arbiter.
pub struct RelayDispatcher {
    session: Arc<Session>,
    peer: Arc<dyn ArbiterPeer>,
    confirmation: Arc<dyn ConfirmationChannel>,
}

impl RelayDispatcher {
    pub fn new(
        session: Arc<Session>,
        peer: Arc<dyn ArbiterPeer>,
        confirmation: Arc<dyn ConfirmationChannel>,
    ) -> Self {
        Self {
            session,
            peer,
            confirmation,
        }
    }

    /// Dispatch `action` as `requester`.
    pub async fn dispatch(&self, requester: &Principal, action: &StrikeAction) -> DispatchOutcome {
        let amount = if action.takes_amount() {
            match require_amount(action.amount.as_ref()) {
                Ok(n) if action.halve && action.kind == MutationKind::Damage => {
                    Some(n.div_euclid(2))
                }
                Ok(n) => Some(n),
                Err(e) => {
                    warn!(kind = %action.kind, error = %e, "rejected action amount");
                    return DispatchOutcome::Completed {
                        targets: action
                            .targets
                            .iter()
                            .map(|id| failed(id, None, &stamp::correlation_id(action.kind), &e))
                            .collect(),
                    };
                }
            }
        } else {
            None
        };

        let mut resolved = Vec::with_capacity(action.targets.len());
        for id in &action.targets {
            resolved.push(self.session.host().resolve_entity(id).await);
        }

        let known: Vec<Entity> = resolved
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .cloned()
            .collect();
        if let Some(prompt) = self_target_prompt(
            action.kind,
            requester,
            &known,
            amount.unwrap_or(0),
            &action.damage_kind,
        ) {
            if !self.confirmation.confirm(&prompt).await {
                info!(
                    requester = %requester.id,
                    character = %prompt.character_name,
                    "self-targeted batch cancelled"
                );
                return DispatchOutcome::Cancelled { prompt };
            }
        }

        let mut outcomes = Vec::with_capacity(action.targets.len());
        for (id, entity) in action.targets.iter().zip(resolved) {
            let correlation_id = stamp::correlation_id(action.kind);
            let entity = match entity {
                Ok(e) => e,
                Err(e) => {
                    warn!(
                        correlation_id = %correlation_id,
                        target = %id,
                        error = %e,
                        "target unresolved"
                    );
                    outcomes.push(failed(id, None, &correlation_id, &e));
                    continue;
                }
            };
            let request = build_request(requester, action, amount, &entity.id, &correlation_id);
            let target_route = route(&entity, requester);
            debug!(
                correlation_id = %correlation_id,
                target = %entity.id,
                route = ?target_route,
                "routing"
            );

            let result = match target_route {
                Route::Direct => self.apply_direct(&request).await,
                Route::Relay => self.relay(&request).await,
            };
            outcomes.push(TargetOutcome {
                target_entity_id: entity.id,
                route: Some(target_route),
                result,
            });
        }
        DispatchOutcome::Completed { targets: outcomes }
    }

    async fn apply_direct(&self, request: &MutationRequest) -> ApplyResult {
        match self.session.apply(request, AppliedVia::Direct).await {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    correlation_id = %request.correlation_id,
                    target = %request.target_entity_id,
                    error = %e,
                    "direct apply failed"
                );
                ApplyResult::failure(&request.correlation_id, &e)
            }
        }
    }

    /// Forward to the arbiter under the configured timeout. Never falls back
    /// to a local mutation.
    async fn relay(&self, request: &MutationRequest) -> ApplyResult {
        let timeout = self.session.config().relay_timeout();
        let reply = match serde_json::to_value(request) {
            Ok(payload) => tokio::time::timeout(timeout, self.peer.execute(payload))
                .await
                .unwrap_or_else(|_| {
                    Err(RelayError::PeerUnavailable {
                        reason: format!("no answer within {} ms", timeout.as_millis()),
                    })
                }),
            Err(e) => Err(RelayError::invalid_request(format!(
                "unencodable request: {e}"
            ))),
        };

        let decoded = reply.and_then(|value| {
            serde_json::from_value::<ApplyResult>(value).map_err(|e| {
                RelayError::PeerUnavailable {
                    reason: format!("malformed reply: {e}"),
                }
            })
        });
        match decoded {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    correlation_id = %request.correlation_id,
                    target = %request.target_entity_id,
                    error = %e,
                    "relay failed"
                );
                ApplyResult::failure(&request.correlation_id, &e)
            }
        }
    }
}

fn failed(
    target_entity_id: &str,
    route: Option<Route>,
    correlation_id: &str,
    err: &RelayError,
) -> TargetOutcome {
    TargetOutcome {
        target_entity_id: target_entity_id.to_string(),
        route,
        result: ApplyResult::failure(correlation_id, err),
    }
}

fn build_request(
    requester: &Principal,
    action: &StrikeAction,
    amount: Option<i64>,
    target_entity_id: &str,
    correlation_id: &str,
) -> MutationRequest {
    let mut request = MutationRequest::new(action.kind, target_entity_id, correlation_id);
    request.amount = amount.map(Amount::Int);
    request.damage_kind = action.damage_kind.clone();
    request.ignored_immunities = action.ignored_immunities.clone();
    request.temporary = action.temporary;
    request.condition = action.condition.clone();
    request.resource_kind = action.resource_kind.clone();
    request.source_actor_id = action.source_actor_id.clone();
    request.source_actor_name = action
        .source_actor_name
        .clone()
        .unwrap_or_else(|| requester.name.clone());
    request.source_item_ref = action.source_item_ref.clone();
    request.source_player_name = requester.name.clone();
    request
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_deserializes_with_defaults() {
        let action: StrikeAction = serde_json::from_value(serde_json::json!({
            "kind": "damage",
            "targets": ["goblin-1"],
            "amount": "6"
        }))
        .unwrap();
        assert_eq!(action.damage_kind, "untyped");
        assert!(!action.halve);
        assert_eq!(action.amount, Some(Amount::Text("6".to_string())));
    }

    #[test]
    fn request_carries_action_and_requester() {
        let p = Principal::requester("p1", "Ada", None);
        let mut action = StrikeAction::new(MutationKind::Damage, &["goblin-1"]);
        action.damage_kind = "fire".to_string();
        action.source_item_ref = Some("item-fireball".to_string());
        let req = build_request(&p, &action, Some(6), "goblin-1", "damage-1-abc");
        assert_eq!(req.amount, Some(Amount::Int(6)));
        assert_eq!(req.damage_kind, "fire");
        assert_eq!(req.source_player_name, "Ada");
        assert_eq!(req.source_actor_name, "Ada");
        assert_eq!(req.source_item_ref.as_deref(), Some("item-fireball"));
        assert!(req.validate().is_ok());
    }
}
