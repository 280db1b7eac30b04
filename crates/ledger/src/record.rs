use std::fmt;

use serde::{Deserialize, Serialize};

/// The mutable stamina fields of an entity, captured around a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StaminaSnapshot {
    pub permanent: i64,
    pub temporary: i64,
}

/// The kind of effect a mutation applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Damage,
    Heal,
    ApplyStatus,
    RemoveStatus,
    ResourceGain,
}

impl MutationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MutationKind::Damage => "damage",
            MutationKind::Heal => "heal",
            MutationKind::ApplyStatus => "apply_status",
            MutationKind::RemoveStatus => "remove_status",
            MutationKind::ResourceGain => "resource_gain",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a mutation reached the entity.
///
/// `Direct` means the requester owned the entity and mutated it locally;
/// `Relayed` means the arbiter executed it on the requester's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppliedVia {
    Direct,
    Relayed,
}

/// A status condition instance as it was at the time of the mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionRecord {
    pub instance_id: String,
    pub condition_id: String,
    pub display_name: String,
    pub source_ref: Option<String>,
    pub duration: String,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub applied_at: String,
}

/// Kind-specific payload of an audit entry.
///
/// Damage and heal distinguish the amount the requester asked for from the
/// amount that actually landed after immunities, weaknesses and clamping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutationDetail {
    Damage {
        requested: i64,
        applied: i64,
        damage_kind: String,
        ignored_immunities: Vec<String>,
    },
    Heal {
        requested: i64,
        applied: i64,
        temporary: bool,
    },
    ApplyStatus {
        condition: ConditionRecord,
        /// False when the condition was already present and only its source
        /// metadata was refreshed.
        newly_added: bool,
    },
    RemoveStatus {
        condition: ConditionRecord,
    },
    ResourceGain {
        resource_kind: String,
        amount: i64,
        before: i64,
        after: i64,
    },
}

impl MutationDetail {
    pub fn kind(&self) -> MutationKind {
        match self {
            MutationDetail::Damage { .. } => MutationKind::Damage,
            MutationDetail::Heal { .. } => MutationKind::Heal,
            MutationDetail::ApplyStatus { .. } => MutationKind::ApplyStatus,
            MutationDetail::RemoveStatus { .. } => MutationKind::RemoveStatus,
            MutationDetail::ResourceGain { .. } => MutationKind::ResourceGain,
        }
    }
}

/// A single applied mutation.
///
/// Created exactly once per successful mutation and never modified afterwards,
/// except for `undone_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub correlation_id: String,
    pub kind: MutationKind,
    pub target_entity_id: String,
    pub target_name: String,
    pub detail: MutationDetail,
    pub before: StaminaSnapshot,
    pub after: StaminaSnapshot,
    pub source_actor_id: Option<String>,
    pub source_actor_name: String,
    pub source_player_name: String,
    pub source_item_ref: Option<String>,
    pub applied_via: AppliedVia,
    /// ISO 8601 / RFC 3339 timestamp string.
    pub timestamp: String,
    /// ISO 8601 / RFC 3339 timestamp string. None until undone.
    pub undone_at: Option<String>,
}

impl AuditEntry {
    pub fn is_undone(&self) -> bool {
        self.undone_at.is_some()
    }
}

/// Filter for history queries.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    /// Only entries targeting this entity.
    pub target_entity_id: Option<String>,
    /// Include entries that have already been undone.
    pub include_undone: bool,
    /// Return at most this many of the most recent matches (0 = no limit).
    pub limit: usize,
}
