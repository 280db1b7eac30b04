//! In-memory entity host.
//!
//! Backs the CLI session runner and the test suites. Writes can be made to
//! fail per entity to exercise the persistence error path.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::RelayError;
use crate::host::{EntityHost, StatWrite};
use crate::types::Entity;

#[derive(Debug, Default)]
struct Inner {
    entities: HashMap<String, Entity>,
    failing: HashSet<String>,
    failing_fields: HashSet<(String, String)>,
    writes: usize,
}

/// Entity host keeping every entity in a map.
#[derive(Debug, Default)]
pub struct MemoryHost {
    inner: RwLock<Inner>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a host holding `entities`.
    pub fn with_entities(entities: impl IntoIterator<Item = Entity>) -> Self {
        let inner = Inner {
            entities: entities.into_iter().map(|e| (e.id.clone(), e)).collect(),
            ..Inner::default()
        };
        Self {
            inner: RwLock::new(inner),
        }
    }

    /// Insert or replace an entity.
    pub async fn insert(&self, entity: Entity) {
        self.inner
            .write()
            .await
            .entities
            .insert(entity.id.clone(), entity);
    }

    pub async fn get(&self, entity_id: &str) -> Option<Entity> {
        self.inner.read().await.entities.get(entity_id).cloned()
    }

    /// Every entity, sorted by id.
    pub async fn entities(&self) -> Vec<Entity> {
        let inner = self.inner.read().await;
        let mut all: Vec<Entity> = inner.entities.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Make every later write to `entity_id` fail.
    pub async fn fail_writes_for(&self, entity_id: &str) {
        self.inner.write().await.failing.insert(entity_id.to_string());
    }

    /// Make later writes to one field of `entity_id` fail, e.g.
    /// `"stamina.permanent"`.
    pub async fn fail_field_writes(&self, entity_id: &str, field_path: &str) {
        self.inner
            .write()
            .await
            .failing_fields
            .insert((entity_id.to_string(), field_path.to_string()));
    }

    /// Number of writes that succeeded.
    pub async fn write_count(&self) -> usize {
        self.inner.read().await.writes
    }
}

#[async_trait]
impl EntityHost for MemoryHost {
    async fn resolve_entity(&self, entity_id: &str) -> Result<Entity, RelayError> {
        self.get(entity_id)
            .await
            .ok_or_else(|| RelayError::EntityNotFound {
                entity_id: entity_id.to_string(),
            })
    }

    async fn persist(&self, entity_id: &str, write: StatWrite) -> Result<(), RelayError> {
        let mut inner = self.inner.write().await;
        let field_fails = inner
            .failing_fields
            .contains(&(entity_id.to_string(), write.field_path()));
        if field_fails || inner.failing.contains(entity_id) {
            return Err(RelayError::Persistence {
                entity_id: entity_id.to_string(),
                message: format!("write to {} rejected", write.field_path()),
            });
        }
        let entity = inner
            .entities
            .get_mut(entity_id)
            .ok_or_else(|| RelayError::EntityNotFound {
                entity_id: entity_id.to_string(),
            })?;
        write.apply_to(entity);
        inner.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityClass, Stamina};

    fn goblin() -> Entity {
        Entity {
            id: "goblin-1".to_string(),
            name: "Goblin".to_string(),
            class: EntityClass::NonHero,
            stamina: Stamina {
                permanent: 5,
                temporary: 0,
                max: 10,
                min: 0,
            },
            resources: Default::default(),
            conditions: vec![],
            owners: Default::default(),
            immunities: Default::default(),
            weaknesses: Default::default(),
        }
    }

    #[tokio::test]
    async fn missing_entity_not_found() {
        let host = MemoryHost::new();
        let err = host.resolve_entity("ghost").await.unwrap_err();
        assert_eq!(err.code(), "EntityNotFound");
    }

    #[tokio::test]
    async fn persist_updates_stored_entity() {
        let host = MemoryHost::with_entities([goblin()]);
        host.persist("goblin-1", StatWrite::Permanent(2)).await.unwrap();
        assert_eq!(host.get("goblin-1").await.unwrap().stamina.permanent, 2);
        assert_eq!(host.write_count().await, 1);
    }

    #[tokio::test]
    async fn failing_writes_leave_entity_untouched() {
        let host = MemoryHost::with_entities([goblin()]);
        host.fail_writes_for("goblin-1").await;
        let err = host
            .persist("goblin-1", StatWrite::Permanent(2))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "PersistenceError");
        assert_eq!(host.get("goblin-1").await.unwrap().stamina.permanent, 5);
    }
}
