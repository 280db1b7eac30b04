//! Mutation executors.
//!
//! Each executor performs exactly one stat change on one entity and returns
//! the before/after snapshots. Executors coerce their own amount on entry so
//! direct callers that skip the relay boundary get the same validation.
//!
//! The `entity` argument is the caller's working copy; it is updated only
//! after the host accepted each write, so it always mirrors what was
//! persisted.

use strike_ledger::{ConditionRecord, MutationDetail, StaminaSnapshot};
use tracing::{debug, warn};

use crate::amount::{coerce_amount, Amount};
use crate::bounds;
use crate::error::RelayError;
use crate::host::{DamageRule, EntityHost, StatWrite};
use crate::snapshot::{capture, restored_stamina, UndoRecord};
use crate::stamp;
use crate::types::{ConditionInstance, ConditionSpec, Entity, ResourceKind};

/// What a single executor did.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome {
    pub before: StaminaSnapshot,
    pub after: StaminaSnapshot,
    /// The change that actually landed. For damage this is the drop in
    /// permanent stamina and may differ from the requested amount.
    pub applied_amount: i64,
    pub detail: MutationDetail,
}

/// Options for [`apply_damage`].
#[derive(Debug, Clone, Default)]
pub struct DamageOptions {
    pub damage_kind: String,
    pub ignored_immunities: Vec<String>,
}

/// Options for [`apply_status`].
#[derive(Debug, Clone, Default)]
pub struct StatusOptions {
    pub source_ref: Option<String>,
}

async fn write(
    host: &dyn EntityHost,
    entity: &mut Entity,
    change: StatWrite,
) -> Result<(), RelayError> {
    debug!(entity = %entity.id, field = %change.field_path(), "persist");
    host.persist(&entity.id, change.clone()).await?;
    change.apply_to(entity);
    Ok(())
}

async fn write_stamina(
    host: &dyn EntityHost,
    entity: &mut Entity,
    target: StaminaSnapshot,
) -> Result<(), RelayError> {
    let previous_temporary = entity.stamina.temporary;
    if target.temporary != previous_temporary {
        write(host, entity, StatWrite::Temporary(target.temporary)).await?;
    }
    if target.permanent != entity.stamina.permanent {
        if let Err(e) = write(host, entity, StatWrite::Permanent(target.permanent)).await {
            // Nothing is recorded for a failed mutation, so the host must not
            // keep half of it.
            if entity.stamina.temporary != previous_temporary {
                if let Err(restore) =
                    write(host, entity, StatWrite::Temporary(previous_temporary)).await
                {
                    warn!(
                        entity = %entity.id,
                        error = %restore,
                        "could not restore temporary stamina after failed write"
                    );
                }
            }
            return Err(e);
        }
    }
    Ok(())
}

/// Apply damage through the host's damage rule, then clamp.
pub async fn apply_damage(
    host: &dyn EntityHost,
    rule: &dyn DamageRule,
    entity: &mut Entity,
    amount: &Amount,
    options: &DamageOptions,
) -> Result<MutationOutcome, RelayError> {
    let requested = coerce_amount(amount)?;
    let before = capture(entity);

    let raw = rule.resolve(
        entity,
        requested,
        &options.damage_kind,
        &options.ignored_immunities,
    );
    let clamped = StaminaSnapshot {
        permanent: bounds::clamp_for(entity, raw.permanent),
        temporary: bounds::clamp_temporary(raw.temporary),
    };
    if clamped.permanent != raw.permanent {
        debug!(
            entity = %entity.id,
            raw = raw.permanent,
            clamped = clamped.permanent,
            "stamina bounds applied"
        );
    }
    write_stamina(host, entity, clamped).await?;

    let after = capture(entity);
    let applied = before.permanent - after.permanent;
    Ok(MutationOutcome {
        before,
        after,
        applied_amount: applied,
        detail: MutationDetail::Damage {
            requested,
            applied,
            damage_kind: options.damage_kind.clone(),
            ignored_immunities: options.ignored_immunities.clone(),
        },
    })
}

/// Heal permanent stamina up to `max`, or raise temporary stamina.
///
/// Temporary stamina does not stack: the pool becomes the larger of its
/// current value and the heal amount.
pub async fn apply_heal(
    host: &dyn EntityHost,
    entity: &mut Entity,
    amount: &Amount,
    temporary: bool,
) -> Result<MutationOutcome, RelayError> {
    let requested = coerce_amount(amount)?;
    let heal = requested.max(0);
    let before = capture(entity);

    let target = if temporary {
        StaminaSnapshot {
            permanent: before.permanent,
            temporary: before.temporary.max(heal),
        }
    } else {
        let raised = bounds::clamp_for(entity, before.permanent.saturating_add(heal));
        StaminaSnapshot {
            // a ceiling that drifted below current stamina must not turn a heal into a loss
            permanent: raised.max(before.permanent),
            temporary: before.temporary,
        }
    };
    write_stamina(host, entity, target).await?;

    let after = capture(entity);
    let applied = if temporary {
        after.temporary - before.temporary
    } else {
        after.permanent - before.permanent
    };
    Ok(MutationOutcome {
        before,
        after,
        applied_amount: applied,
        detail: MutationDetail::Heal {
            requested,
            applied,
            temporary,
        },
    })
}

/// Apply a status condition. A condition already present by id is not added
/// twice; only its source reference is replaced.
pub async fn apply_status(
    host: &dyn EntityHost,
    entity: &mut Entity,
    spec: &ConditionSpec,
    options: &StatusOptions,
) -> Result<MutationOutcome, RelayError> {
    let before = capture(entity);
    let mut conditions = entity.conditions.clone();

    let (instance, newly_added) = match conditions
        .iter_mut()
        .find(|c| c.condition_id == spec.condition_id)
    {
        Some(existing) => {
            existing.source_ref = options.source_ref.clone();
            (existing.clone(), false)
        }
        None => {
            let instance = ConditionInstance {
                instance_id: stamp::condition_instance_id(),
                condition_id: spec.condition_id.clone(),
                display_name: spec.name().to_string(),
                source_ref: options.source_ref.clone(),
                duration: spec.duration,
                applied_at: stamp::now_rfc3339(),
            };
            conditions.push(instance.clone());
            (instance, true)
        }
    };

    if conditions != entity.conditions {
        write(host, entity, StatWrite::Conditions(conditions)).await?;
    }

    Ok(MutationOutcome {
        before,
        after: capture(entity),
        applied_amount: 0,
        detail: MutationDetail::ApplyStatus {
            condition: ConditionRecord::from(&instance),
            newly_added,
        },
    })
}

/// Remove a status condition, matched by display name (case-insensitive)
/// first and by condition id second.
///
/// Distinct instances sharing a display name are indistinguishable here;
/// the first match is removed.
pub async fn remove_status(
    host: &dyn EntityHost,
    entity: &mut Entity,
    key: &str,
) -> Result<MutationOutcome, RelayError> {
    let before = capture(entity);
    let position = entity
        .conditions
        .iter()
        .position(|c| c.display_name.eq_ignore_ascii_case(key))
        .or_else(|| entity.conditions.iter().position(|c| c.condition_id == key))
        .ok_or_else(|| RelayError::StatusNotFound {
            entity_id: entity.id.clone(),
            condition: key.to_string(),
        })?;

    let mut conditions = entity.conditions.clone();
    let removed = conditions.remove(position);
    write(host, entity, StatWrite::Conditions(conditions)).await?;

    Ok(MutationOutcome {
        before,
        after: capture(entity),
        applied_amount: 0,
        detail: MutationDetail::RemoveStatus {
            condition: ConditionRecord::from(&removed),
        },
    })
}

/// Add to a resource pool. Pools have no upper bound.
pub async fn resource_gain(
    host: &dyn EntityHost,
    entity: &mut Entity,
    resource_kind: &str,
    amount: &Amount,
) -> Result<MutationOutcome, RelayError> {
    let kind: ResourceKind = resource_kind.parse()?;
    let gain = coerce_amount(amount)?;
    let before = capture(entity);

    let previous = entity.resource(kind);
    let next = previous.saturating_add(gain);
    write(host, entity, StatWrite::Resource(kind, next)).await?;

    Ok(MutationOutcome {
        before,
        after: capture(entity),
        applied_amount: gain,
        detail: MutationDetail::ResourceGain {
            resource_kind: kind.as_str().to_string(),
            amount: gain,
            before: previous,
            after: next,
        },
    })
}

/// Run the compensating action for an earlier mutation. Returns the stamina
/// the entity holds afterwards.
pub async fn revert(
    host: &dyn EntityHost,
    entity: &mut Entity,
    record: &UndoRecord,
) -> Result<StaminaSnapshot, RelayError> {
    match record {
        UndoRecord::RestoreStamina(before) => {
            let target = restored_stamina(entity, *before);
            write_stamina(host, entity, target).await?;
        }
        UndoRecord::RemoveCondition { instance_id } => {
            let mut conditions = entity.conditions.clone();
            let len = conditions.len();
            conditions.retain(|c| &c.instance_id != instance_id);
            if conditions.len() == len {
                return Err(RelayError::StatusNotFound {
                    entity_id: entity.id.clone(),
                    condition: instance_id.clone(),
                });
            }
            write(host, entity, StatWrite::Conditions(conditions)).await?;
        }
        UndoRecord::RestoreCondition(instance) => {
            if !entity
                .conditions
                .iter()
                .any(|c| c.instance_id == instance.instance_id)
            {
                let mut conditions = entity.conditions.clone();
                conditions.push(instance.clone());
                write(host, entity, StatWrite::Conditions(conditions)).await?;
            }
        }
        UndoRecord::RestoreResource { kind, value } => {
            write(host, entity, StatWrite::Resource(*kind, *value)).await?;
        }
        UndoRecord::Nothing => {}
    }
    Ok(capture(entity))
}
