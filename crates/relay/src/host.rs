//! Collaborators the host application provides.
//!
//! The relay never owns entities. It reads them through [`EntityHost`],
//! writes single fields back through [`EntityHost::persist`], and asks a
//! [`DamageRule`] how much of a hit actually lands.

use async_trait::async_trait;
use strike_ledger::StaminaSnapshot;

use crate::error::RelayError;
use crate::types::{ConditionInstance, Entity, ResourceKind};

/// A single field write against an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatWrite {
    Permanent(i64),
    Temporary(i64),
    Resource(ResourceKind, i64),
    Conditions(Vec<ConditionInstance>),
}

impl StatWrite {
    /// Dotted field path, for logs and error messages.
    pub fn field_path(&self) -> String {
        match self {
            StatWrite::Permanent(_) => "stamina.permanent".to_string(),
            StatWrite::Temporary(_) => "stamina.temporary".to_string(),
            StatWrite::Resource(kind, _) => format!("resources.{kind}"),
            StatWrite::Conditions(_) => "conditions".to_string(),
        }
    }

    /// Apply the write to an in-memory entity.
    pub fn apply_to(&self, entity: &mut Entity) {
        match self {
            StatWrite::Permanent(v) => entity.stamina.permanent = *v,
            StatWrite::Temporary(v) => entity.stamina.temporary = *v,
            StatWrite::Resource(kind, v) => {
                entity.resources.insert(*kind, *v);
            }
            StatWrite::Conditions(list) => entity.conditions = list.clone(),
        }
    }
}

/// Entity lookup and mutation primitives.
///
/// Implementations must be `Send + Sync` so one host can back every handler
/// of a session.
#[async_trait]
pub trait EntityHost: Send + Sync {
    /// Load the current state of an entity.
    ///
    /// Returns `Err(RelayError::EntityNotFound)` if no such entity exists.
    async fn resolve_entity(&self, entity_id: &str) -> Result<Entity, RelayError>;

    /// Persist one field of an entity.
    ///
    /// Failures surface as `Err(RelayError::Persistence)`.
    async fn persist(&self, entity_id: &str, write: StatWrite) -> Result<(), RelayError>;
}

/// Game-rules hook deciding how damage lands on an entity.
///
/// Returns the raw stamina the entity would have after the hit; the relay
/// clamps the result before anything is persisted.
pub trait DamageRule: Send + Sync {
    fn resolve(
        &self,
        entity: &Entity,
        amount: i64,
        damage_kind: &str,
        ignored_immunities: &[String],
    ) -> StaminaSnapshot;
}

/// Flat immunity/weakness adjustment, temporary stamina absorbing first.
///
/// Immunity and weakness are looked up for the damage kind and for `"all"`,
/// taking the larger value. An immunity listed in `ignored_immunities` (or
/// `"all"` listed there) is skipped. Effective damage never goes below zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardDamageRule;

impl StandardDamageRule {
    fn lookup(table: &std::collections::BTreeMap<String, i64>, kind: &str) -> i64 {
        let specific = table.get(kind).copied().unwrap_or(0);
        let all = table.get("all").copied().unwrap_or(0);
        specific.max(all)
    }

    /// Damage remaining after immunities and weaknesses.
    pub fn effective_damage(
        entity: &Entity,
        amount: i64,
        damage_kind: &str,
        ignored_immunities: &[String],
    ) -> i64 {
        let ignores_all = ignored_immunities.iter().any(|i| i == "all");
        let ignores_kind = ignored_immunities.iter().any(|i| i == damage_kind);
        let immunity = if ignores_all || ignores_kind {
            0
        } else {
            Self::lookup(&entity.immunities, damage_kind)
        };
        let weakness = Self::lookup(&entity.weaknesses, damage_kind);
        amount
            .saturating_sub(immunity)
            .saturating_add(weakness)
            .max(0)
    }
}

impl DamageRule for StandardDamageRule {
    fn resolve(
        &self,
        entity: &Entity,
        amount: i64,
        damage_kind: &str,
        ignored_immunities: &[String],
    ) -> StaminaSnapshot {
        let damage = Self::effective_damage(entity, amount.max(0), damage_kind, ignored_immunities);
        let temporary = entity.stamina.temporary.max(0);
        let absorbed = damage.min(temporary);
        StaminaSnapshot {
            permanent: entity.stamina.permanent.saturating_sub(damage - absorbed),
            temporary: temporary - absorbed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityClass, Stamina};

    fn target() -> Entity {
        Entity {
            id: "ogre-1".to_string(),
            name: "Ogre".to_string(),
            class: EntityClass::NonHero,
            stamina: Stamina {
                permanent: 30,
                temporary: 4,
                max: 30,
                min: 0,
            },
            resources: Default::default(),
            conditions: vec![],
            owners: Default::default(),
            immunities: [("fire".to_string(), 5)].into_iter().collect(),
            weaknesses: [("holy".to_string(), 3)].into_iter().collect(),
        }
    }

    #[test]
    fn extreme_amounts_saturate() {
        let mut hero = target();
        hero.stamina.permanent = -5;
        hero.stamina.temporary = 0;
        let after = StandardDamageRule.resolve(&hero, i64::MAX, "holy", &[]);
        assert_eq!(after.permanent, i64::MIN);

        let damage = StandardDamageRule::effective_damage(&hero, i64::MAX, "holy", &[]);
        assert_eq!(damage, i64::MAX);
    }

    #[test]
    fn temporary_absorbs_first() {
        let after = StandardDamageRule.resolve(&target(), 6, "untyped", &[]);
        assert_eq!(after.temporary, 0);
        assert_eq!(after.permanent, 28);
    }

    #[test]
    fn immunity_reduces_damage() {
        assert_eq!(
            StandardDamageRule::effective_damage(&target(), 8, "fire", &[]),
            3
        );
        assert_eq!(
            StandardDamageRule::effective_damage(&target(), 4, "fire", &[]),
            0
        );
    }

    #[test]
    fn ignored_immunity_skipped() {
        let ignored = vec!["fire".to_string()];
        assert_eq!(
            StandardDamageRule::effective_damage(&target(), 8, "fire", &ignored),
            8
        );
    }

    #[test]
    fn weakness_increases_damage() {
        assert_eq!(
            StandardDamageRule::effective_damage(&target(), 8, "holy", &[]),
            11
        );
    }

    #[test]
    fn resolve_does_not_clamp() {
        let after = StandardDamageRule.resolve(&target(), 50, "untyped", &[]);
        assert_eq!(after.permanent, -16);
    }

    #[test]
    fn stat_write_applies_to_entity() {
        let mut e = target();
        StatWrite::Resource(ResourceKind::Victory, 2).apply_to(&mut e);
        StatWrite::Temporary(9).apply_to(&mut e);
        assert_eq!(e.resource(ResourceKind::Victory), 2);
        assert_eq!(e.stamina.temporary, 9);
        assert_eq!(
            StatWrite::Resource(ResourceKind::Victory, 2).field_path(),
            "resources.victory"
        );
    }
}
