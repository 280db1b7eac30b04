//! Entity, principal and condition types shared by every relay component.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strike_ledger::ConditionRecord;

use crate::error::RelayError;

/// Entity class. Determines which clamping rule applies to stamina.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityClass {
    Hero,
    NonHero,
}

/// Stamina pool of an entity. `min` only matters for heroes, who may drop
/// below zero down to their negative floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stamina {
    pub permanent: i64,
    #[serde(default)]
    pub temporary: i64,
    pub max: i64,
    #[serde(default)]
    pub min: i64,
}

/// Enumerated resource pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Heroic,
    Epic,
    Surge,
    Progression,
    Renown,
    Wealth,
    Victory,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::Heroic,
        ResourceKind::Epic,
        ResourceKind::Surge,
        ResourceKind::Progression,
        ResourceKind::Renown,
        ResourceKind::Wealth,
        ResourceKind::Victory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Heroic => "heroic",
            ResourceKind::Epic => "epic",
            ResourceKind::Surge => "surge",
            ResourceKind::Progression => "progression",
            ResourceKind::Renown => "renown",
            ResourceKind::Wealth => "wealth",
            ResourceKind::Victory => "victory",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ResourceKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| RelayError::UnknownResourceKind {
                kind: s.to_string(),
            })
    }
}

/// How long a condition lasts. Opaque to the relay; carried through as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusDuration {
    EndOfTurn,
    EndOfEncounter,
    NextRespite,
    SaveEnds,
    #[default]
    Untimed,
}

impl StatusDuration {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusDuration::EndOfTurn => "end_of_turn",
            StatusDuration::EndOfEncounter => "end_of_encounter",
            StatusDuration::NextRespite => "next_respite",
            StatusDuration::SaveEnds => "save_ends",
            StatusDuration::Untimed => "untimed",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "end_of_turn" => StatusDuration::EndOfTurn,
            "end_of_encounter" => StatusDuration::EndOfEncounter,
            "next_respite" => StatusDuration::NextRespite,
            "save_ends" => StatusDuration::SaveEnds,
            _ => StatusDuration::Untimed,
        }
    }
}

/// What a requester asks to apply or remove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionSpec {
    pub condition_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub duration: StatusDuration,
}

impl ConditionSpec {
    pub fn new(condition_id: &str) -> Self {
        Self {
            condition_id: condition_id.to_string(),
            display_name: None,
            duration: StatusDuration::Untimed,
        }
    }

    /// Display name, falling back to the condition id.
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.condition_id)
    }
}

/// A condition currently active on an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionInstance {
    pub instance_id: String,
    pub condition_id: String,
    pub display_name: String,
    #[serde(default)]
    pub source_ref: Option<String>,
    #[serde(default)]
    pub duration: StatusDuration,
    pub applied_at: String,
}

impl From<&ConditionInstance> for ConditionRecord {
    fn from(c: &ConditionInstance) -> Self {
        ConditionRecord {
            instance_id: c.instance_id.clone(),
            condition_id: c.condition_id.clone(),
            display_name: c.display_name.clone(),
            source_ref: c.source_ref.clone(),
            duration: c.duration.as_str().to_string(),
            applied_at: c.applied_at.clone(),
        }
    }
}

impl From<&ConditionRecord> for ConditionInstance {
    fn from(r: &ConditionRecord) -> Self {
        ConditionInstance {
            instance_id: r.instance_id.clone(),
            condition_id: r.condition_id.clone(),
            display_name: r.display_name.clone(),
            source_ref: r.source_ref.clone(),
            duration: StatusDuration::parse(&r.duration),
            applied_at: r.applied_at.clone(),
        }
    }
}

/// A shared game actor whose stats the relay mutates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: String,
    pub name: String,
    pub class: EntityClass,
    pub stamina: Stamina,
    #[serde(default)]
    pub resources: BTreeMap<ResourceKind, i64>,
    #[serde(default)]
    pub conditions: Vec<ConditionInstance>,
    /// Requester ids allowed to mutate this entity without the arbiter.
    #[serde(default)]
    pub owners: BTreeSet<String>,
    /// Damage kind -> flat reduction. The kind `"all"` applies to every kind.
    #[serde(default)]
    pub immunities: BTreeMap<String, i64>,
    /// Damage kind -> flat increase. The kind `"all"` applies to every kind.
    #[serde(default)]
    pub weaknesses: BTreeMap<String, i64>,
}

impl Entity {
    pub fn resource(&self, kind: ResourceKind) -> i64 {
        self.resources.get(&kind).copied().unwrap_or(0)
    }

    pub fn is_owned_by(&self, requester_id: &str) -> bool {
        self.owners.contains(requester_id)
    }

    pub fn condition_by_id(&self, condition_id: &str) -> Option<&ConditionInstance> {
        self.conditions
            .iter()
            .find(|c| c.condition_id == condition_id)
    }
}

/// Whether a principal is the session arbiter or an ordinary requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Arbiter,
    Requester,
}

/// The identity a call runs as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: String,
    pub name: String,
    pub role: Role,
    /// Entity this principal plays, if any. Used by the self-target gate.
    #[serde(default)]
    pub character: Option<String>,
}

impl Principal {
    pub fn arbiter(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            role: Role::Arbiter,
            character: None,
        }
    }

    pub fn requester(id: &str, name: &str, character: Option<&str>) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            role: Role::Requester,
            character: character.map(str::to_string),
        }
    }

    pub fn is_arbiter(&self) -> bool {
        self.role == Role::Arbiter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_kind_parses_case_insensitively() {
        assert_eq!("Heroic".parse::<ResourceKind>().unwrap(), ResourceKind::Heroic);
        assert_eq!(" victory ".parse::<ResourceKind>().unwrap(), ResourceKind::Victory);
    }

    #[test]
    fn resource_kind_rejects_unknown() {
        let err = "mana".parse::<ResourceKind>().unwrap_err();
        assert_eq!(err.code(), "UnknownResourceKind");
    }

    #[test]
    fn condition_round_trips_through_ledger_record() {
        let instance = ConditionInstance {
            instance_id: "cond-1".to_string(),
            condition_id: "slowed".to_string(),
            display_name: "Slowed".to_string(),
            source_ref: Some("item-ice-bolt".to_string()),
            duration: StatusDuration::SaveEnds,
            applied_at: "2025-01-01T00:00:00Z".to_string(),
        };
        let record = ConditionRecord::from(&instance);
        assert_eq!(record.duration, "save_ends");
        assert_eq!(ConditionInstance::from(&record), instance);
    }

    #[test]
    fn entity_deserializes_with_defaults() {
        let entity: Entity = serde_json::from_value(serde_json::json!({
            "id": "goblin-1",
            "name": "Goblin",
            "class": "non_hero",
            "stamina": {"permanent": 5, "max": 10}
        }))
        .unwrap();
        assert_eq!(entity.stamina.temporary, 0);
        assert_eq!(entity.stamina.min, 0);
        assert!(entity.owners.is_empty());
        assert_eq!(entity.resource(ResourceKind::Surge), 0);
    }
}
