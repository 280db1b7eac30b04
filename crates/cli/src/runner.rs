//! Session runner.
//!
//! Builds one arbiter session over an in-memory host, then plays the
//! script's steps through the relay in order: actions through the
//! dispatcher as the named requester, undo through the elevated executor,
//! arbiter connectivity through the in-process peer.

use std::sync::Arc;

use serde::Serialize;
use strike_ledger::{
    AuditEntry, AuditLog, HistoryFilter, InMemoryAuditLog, LedgerError, MutationKind,
};
use strike_relay::{
    ConfirmationChannel, DispatchOutcome, ElevatedExecutor, Entity, InProcessPeer, MemoryHost,
    RelayConfig, RelayDispatcher, Session, UndoRequest, UndoResult,
};
use tracing::info;

use crate::script::{SessionScript, Step};

/// What one step did.
#[derive(Debug, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepReport {
    Action {
        actor: String,
        kind: MutationKind,
        outcome: DispatchOutcome,
    },
    Undo {
        actor: String,
        result: UndoResult,
    },
    Arbiter {
        online: bool,
    },
}

/// Everything a script run produced.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub steps: Vec<StepReport>,
    pub entities: Vec<Entity>,
    pub history: Vec<AuditEntry>,
}

pub async fn run_script(
    script: &SessionScript,
    config: RelayConfig,
    confirmation: Arc<dyn ConfirmationChannel>,
) -> Result<RunReport, String> {
    let host = Arc::new(MemoryHost::with_entities(script.entities.clone()));
    let audit = Arc::new(InMemoryAuditLog::new());
    let session = Arc::new(Session::new(host.clone(), audit.clone()).with_config(config));
    let arbiter = ElevatedExecutor::new(session.clone());
    let peer = Arc::new(InProcessPeer::new(arbiter.clone(), script.arbiter.clone()));
    let dispatcher = RelayDispatcher::new(session.clone(), peer.clone(), confirmation);

    let mut last: Option<String> = None;
    let mut steps = Vec::with_capacity(script.steps.len());

    for step in &script.steps {
        let report = match step {
            Step::Action { actor, action } => {
                let requester = script
                    .principal(actor)
                    .ok_or_else(|| format!("unknown principal '{actor}'"))?;
                let outcome = dispatcher.dispatch(requester, action).await;
                if let Some(ok) = outcome.targets().iter().rev().find(|t| t.succeeded()) {
                    last = Some(ok.result.correlation_id.clone());
                }
                StepReport::Action {
                    actor: actor.clone(),
                    kind: action.kind,
                    outcome,
                }
            }
            Step::Undo { actor, undo } => {
                let caller = match actor {
                    Some(id) => script
                        .principal(id)
                        .ok_or_else(|| format!("unknown principal '{id}'"))?,
                    None => &script.arbiter,
                };
                let correlation_id = if undo == "last" {
                    last.clone().unwrap_or_default()
                } else {
                    undo.clone()
                };
                // An unknown id still goes to the arbiter, which reports
                // EntryNotFound for this step.
                let target_entity_id = match audit.get(&correlation_id).await {
                    Ok(entry) => entry.target_entity_id,
                    Err(LedgerError::EntryNotFound { .. }) => String::new(),
                    Err(e) => return Err(e.to_string()),
                };
                let result = arbiter
                    .undo(
                        caller,
                        UndoRequest {
                            target_entity_id,
                            before_snapshot: None,
                            correlation_id,
                        },
                    )
                    .await;
                StepReport::Undo {
                    actor: caller.id.clone(),
                    result,
                }
            }
            Step::Arbiter { online } => {
                peer.set_online(*online);
                info!(online = *online, "arbiter connectivity changed");
                StepReport::Arbiter { online: *online }
            }
        };
        steps.push(report);
    }

    let history = audit
        .list(&HistoryFilter {
            include_undone: true,
            ..HistoryFilter::default()
        })
        .await
        .map_err(|e| e.to_string())?;

    Ok(RunReport {
        steps,
        entities: host.entities().await,
        history,
    })
}

pub fn print_steps(report: &RunReport) {
    for (i, step) in report.steps.iter().enumerate() {
        let n = i + 1;
        match step {
            StepReport::Action {
                actor,
                kind,
                outcome,
            } => match outcome {
                DispatchOutcome::Cancelled { prompt } => {
                    println!(
                        "[{n}] {actor} {kind}: cancelled (self-target on {})",
                        prompt.character_name
                    );
                }
                DispatchOutcome::Completed { targets } => {
                    for t in targets {
                        let route = t
                            .route
                            .map(|r| format!("{r:?}").to_lowercase())
                            .unwrap_or_else(|| "-".to_string());
                        if t.result.success {
                            let amount = t
                                .result
                                .damage_applied
                                .map(|d| format!(" damage {d}"))
                                .or_else(|| t.result.healing_applied.map(|h| format!(" healing {h}")))
                                .unwrap_or_default();
                            println!(
                                "[{n}] {actor} {kind} -> {}: ok ({route}){amount} [{}]",
                                t.target_entity_id, t.result.correlation_id
                            );
                        } else {
                            println!(
                                "[{n}] {actor} {kind} -> {}: failed {} ({route}): {}",
                                t.target_entity_id,
                                t.result.error.as_deref().unwrap_or("Unknown"),
                                t.result.message.as_deref().unwrap_or("")
                            );
                        }
                    }
                }
            },
            StepReport::Undo { actor, result } => {
                if result.success {
                    let restored = result
                        .restored_stamina
                        .map(|s| format!(" stamina {}/{}", s.permanent, s.temporary))
                        .unwrap_or_default();
                    println!(
                        "[{n}] {actor} undo {}: ok{restored}",
                        result.correlation_id
                    );
                } else {
                    println!(
                        "[{n}] {actor} undo {}: failed {}",
                        result.correlation_id,
                        result.error.as_deref().unwrap_or("Unknown")
                    );
                }
            }
            StepReport::Arbiter { online } => {
                println!(
                    "[{n}] arbiter {}",
                    if *online { "online" } else { "offline" }
                );
            }
        }
    }
}

pub fn print_entities(entities: &[Entity]) {
    println!();
    for e in entities {
        let conditions: Vec<&str> = e.conditions.iter().map(|c| c.display_name.as_str()).collect();
        print!(
            "{} ({}): stamina {}/{}",
            e.name, e.id, e.stamina.permanent, e.stamina.max
        );
        if e.stamina.temporary > 0 {
            print!(" +{} temp", e.stamina.temporary);
        }
        if !conditions.is_empty() {
            print!(" [{}]", conditions.join(", "));
        }
        for (kind, value) in &e.resources {
            print!(" {kind}={value}");
        }
        println!();
    }
}

pub fn print_history<'a>(history: impl IntoIterator<Item = &'a AuditEntry>) {
    for entry in history {
        let undone = if entry.is_undone() { " (undone)" } else { "" };
        println!(
            "{} {} {} {} {} -> {} via {:?} by {}{}",
            entry.timestamp,
            entry.correlation_id,
            entry.kind,
            entry.target_name,
            entry.before.permanent,
            entry.after.permanent,
            entry.applied_via,
            entry.source_player_name,
            undone
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strike_relay::FixedConfirmation;

    fn script(json: serde_json::Value) -> SessionScript {
        serde_json::from_value(json).unwrap()
    }

    #[tokio::test]
    async fn undo_last_reverts_latest_success() {
        let s = script(serde_json::json!({
            "entities": [{
                "id": "goblin-1", "name": "Goblin", "class": "non_hero",
                "stamina": {"permanent": 10, "max": 10}
            }],
            "steps": [
                {"as": "gm", "action": {"kind": "damage", "targets": ["goblin-1"], "amount": 4}},
                {"undo": "last"}
            ]
        }));
        let report = run_script(&s, RelayConfig::default(), Arc::new(FixedConfirmation(true)))
            .await
            .unwrap();
        assert_eq!(report.entities[0].stamina.permanent, 10);
        assert_eq!(report.history.len(), 1);
        assert!(report.history[0].is_undone());
    }

    #[tokio::test]
    async fn offline_arbiter_step_blocks_relay() {
        let s = script(serde_json::json!({
            "principals": [{"id": "p1", "name": "Ada", "role": "requester"}],
            "entities": [{
                "id": "goblin-1", "name": "Goblin", "class": "non_hero",
                "stamina": {"permanent": 10, "max": 10}
            }],
            "steps": [
                {"arbiterOnline": false},
                {"as": "p1", "action": {"kind": "damage", "targets": ["goblin-1"], "amount": 4}}
            ]
        }));
        let report = run_script(&s, RelayConfig::default(), Arc::new(FixedConfirmation(true)))
            .await
            .unwrap();
        match &report.steps[1] {
            StepReport::Action { outcome, .. } => {
                assert_eq!(
                    outcome.targets()[0].result.error.as_deref(),
                    Some("PeerUnavailable")
                );
            }
            other => panic!("unexpected step {other:?}"),
        }
        assert!(report.history.is_empty());
    }

    #[tokio::test]
    async fn undo_without_entry_reports_entry_not_found() {
        let s = script(serde_json::json!({
            "entities": [{
                "id": "goblin-1", "name": "Goblin", "class": "non_hero",
                "stamina": {"permanent": 10, "max": 10}
            }],
            "steps": [
                {"undo": "last"},
                {"undo": "heal-1-unknown"}
            ]
        }));
        let report = run_script(&s, RelayConfig::default(), Arc::new(FixedConfirmation(true)))
            .await
            .unwrap();
        assert_eq!(report.steps.len(), 2);
        for step in &report.steps {
            match step {
                StepReport::Undo { result, .. } => {
                    assert!(!result.success);
                    assert_eq!(result.error.as_deref(), Some("EntryNotFound"));
                }
                other => panic!("unexpected step {other:?}"),
            }
        }
    }
}
