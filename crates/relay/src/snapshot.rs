//! Before/after capture of entity stats, and the undo record derived from it.

use strike_ledger::{AuditEntry, MutationDetail, StaminaSnapshot};

use crate::bounds;
use crate::types::{ConditionInstance, Entity, ResourceKind};

/// Capture the mutable stamina fields of an entity.
pub fn capture(entity: &Entity) -> StaminaSnapshot {
    StaminaSnapshot {
        permanent: entity.stamina.permanent,
        temporary: entity.stamina.temporary,
    }
}

/// The compensating action that reverses one audit entry.
#[derive(Debug, Clone, PartialEq)]
pub enum UndoRecord {
    /// Write stamina back to the pre-mutation values (re-clamped).
    RestoreStamina(StaminaSnapshot),
    /// Delete the condition instance the mutation added.
    RemoveCondition { instance_id: String },
    /// Put back the condition instance the mutation removed.
    RestoreCondition(ConditionInstance),
    /// Write a resource pool back to its previous value.
    RestoreResource { kind: ResourceKind, value: i64 },
    /// The mutation changed nothing that needs reversing.
    Nothing,
}

impl UndoRecord {
    /// Derive the undo action from an entry.
    ///
    /// Returns `None` if the entry names a resource kind this build does not
    /// know, which only happens with a foreign or corrupted ledger.
    pub fn from_entry(entry: &AuditEntry) -> Option<Self> {
        let record = match &entry.detail {
            MutationDetail::Damage { .. } | MutationDetail::Heal { .. } => {
                UndoRecord::RestoreStamina(entry.before)
            }
            MutationDetail::ApplyStatus {
                condition,
                newly_added: true,
            } => UndoRecord::RemoveCondition {
                instance_id: condition.instance_id.clone(),
            },
            MutationDetail::ApplyStatus {
                newly_added: false,
                ..
            } => UndoRecord::Nothing,
            MutationDetail::RemoveStatus { condition } => {
                UndoRecord::RestoreCondition(ConditionInstance::from(condition))
            }
            MutationDetail::ResourceGain {
                resource_kind,
                before,
                ..
            } => UndoRecord::RestoreResource {
                kind: resource_kind.parse().ok()?,
                value: *before,
            },
        };
        Some(record)
    }
}

/// Stamina an entity should hold after restoring `before`, clamped with the
/// entity's current bounds rather than the ones in force when it was taken.
pub fn restored_stamina(entity: &Entity, before: StaminaSnapshot) -> StaminaSnapshot {
    StaminaSnapshot {
        permanent: bounds::clamp_for(entity, before.permanent),
        temporary: bounds::clamp_temporary(before.temporary),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityClass, Stamina};
    use strike_ledger::{AppliedVia, ConditionRecord, MutationKind};

    fn hero(permanent: i64, max: i64) -> Entity {
        Entity {
            id: "hero-1".to_string(),
            name: "Talia".to_string(),
            class: EntityClass::Hero,
            stamina: Stamina {
                permanent,
                temporary: 0,
                max,
                min: -10,
            },
            resources: Default::default(),
            conditions: vec![],
            owners: Default::default(),
            immunities: Default::default(),
            weaknesses: Default::default(),
        }
    }

    fn entry(detail: MutationDetail) -> AuditEntry {
        AuditEntry {
            correlation_id: "c-1".to_string(),
            kind: detail.kind(),
            target_entity_id: "hero-1".to_string(),
            target_name: "Talia".to_string(),
            detail,
            before: StaminaSnapshot {
                permanent: 20,
                temporary: 3,
            },
            after: StaminaSnapshot {
                permanent: 12,
                temporary: 0,
            },
            source_actor_id: None,
            source_actor_name: "Goblin".to_string(),
            source_player_name: "gm".to_string(),
            source_item_ref: None,
            applied_via: AppliedVia::Direct,
            timestamp: "2025-01-01T00:00:00Z".to_string(),
            undone_at: None,
        }
    }

    fn condition() -> ConditionRecord {
        ConditionRecord {
            instance_id: "cond-9".to_string(),
            condition_id: "bleeding".to_string(),
            display_name: "Bleeding".to_string(),
            source_ref: None,
            duration: "save_ends".to_string(),
            applied_at: "2025-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn capture_reads_permanent_and_temporary() {
        let mut e = hero(14, 20);
        e.stamina.temporary = 5;
        assert_eq!(
            capture(&e),
            StaminaSnapshot {
                permanent: 14,
                temporary: 5
            }
        );
    }

    #[test]
    fn damage_entry_restores_before_snapshot() {
        let e = entry(MutationDetail::Damage {
            requested: 8,
            applied: 8,
            damage_kind: "untyped".to_string(),
            ignored_immunities: vec![],
        });
        assert_eq!(e.kind, MutationKind::Damage);
        assert_eq!(
            UndoRecord::from_entry(&e),
            Some(UndoRecord::RestoreStamina(e.before))
        );
    }

    #[test]
    fn new_status_entry_removes_instance() {
        let e = entry(MutationDetail::ApplyStatus {
            condition: condition(),
            newly_added: true,
        });
        assert_eq!(
            UndoRecord::from_entry(&e),
            Some(UndoRecord::RemoveCondition {
                instance_id: "cond-9".to_string()
            })
        );
    }

    #[test]
    fn refreshed_status_entry_undoes_nothing() {
        let e = entry(MutationDetail::ApplyStatus {
            condition: condition(),
            newly_added: false,
        });
        assert_eq!(UndoRecord::from_entry(&e), Some(UndoRecord::Nothing));
    }

    #[test]
    fn unknown_resource_kind_has_no_undo() {
        let e = entry(MutationDetail::ResourceGain {
            resource_kind: "mana".to_string(),
            amount: 2,
            before: 1,
            after: 3,
        });
        assert_eq!(UndoRecord::from_entry(&e), None);
    }

    #[test]
    fn restore_uses_current_bounds() {
        // max dropped from 20 to 15 since the snapshot was taken
        let e = hero(5, 15);
        let restored = restored_stamina(
            &e,
            StaminaSnapshot {
                permanent: 20,
                temporary: 2,
            },
        );
        assert_eq!(restored.permanent, 15);
        assert_eq!(restored.temporary, 2);
    }
}
