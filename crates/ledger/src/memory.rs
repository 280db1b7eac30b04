use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::LedgerError;
use crate::record::{AuditEntry, HistoryFilter};
use crate::traits::AuditLog;

/// Session-scoped audit log held in memory.
///
/// Nothing survives a process restart. Entries live in a vector in recording
/// order, with an index from correlation id to position.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: Vec<AuditEntry>,
    index: HashMap<String, usize>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded entries, undone ones included.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn record(&self, entry: AuditEntry) -> Result<String, LedgerError> {
        let mut inner = self.inner.write().await;
        if inner.index.contains_key(&entry.correlation_id) {
            return Err(LedgerError::DuplicateCorrelation {
                correlation_id: entry.correlation_id,
            });
        }
        let id = entry.correlation_id.clone();
        let position = inner.entries.len();
        inner.entries.push(entry);
        inner.index.insert(id.clone(), position);
        Ok(id)
    }

    async fn get(&self, correlation_id: &str) -> Result<AuditEntry, LedgerError> {
        let inner = self.inner.read().await;
        inner
            .index
            .get(correlation_id)
            .map(|&i| inner.entries[i].clone())
            .ok_or_else(|| LedgerError::EntryNotFound {
                correlation_id: correlation_id.to_string(),
            })
    }

    async fn mark_undone(
        &self,
        correlation_id: &str,
        undone_at: &str,
    ) -> Result<AuditEntry, LedgerError> {
        let mut inner = self.inner.write().await;
        let position = match inner.index.get(correlation_id) {
            Some(&i) => i,
            None => {
                return Err(LedgerError::EntryNotFound {
                    correlation_id: correlation_id.to_string(),
                })
            }
        };
        let entry = &mut inner.entries[position];
        if let Some(existing) = &entry.undone_at {
            return Err(LedgerError::AlreadyUndone {
                correlation_id: correlation_id.to_string(),
                undone_at: existing.clone(),
            });
        }
        entry.undone_at = Some(undone_at.to_string());
        Ok(entry.clone())
    }

    async fn list(&self, filter: &HistoryFilter) -> Result<Vec<AuditEntry>, LedgerError> {
        let inner = self.inner.read().await;
        let matches: Vec<AuditEntry> = inner
            .entries
            .iter()
            .filter(|e| {
                filter
                    .target_entity_id
                    .as_deref()
                    .map_or(true, |t| e.target_entity_id == t)
            })
            .filter(|e| filter.include_undone || !e.is_undone())
            .cloned()
            .collect();

        if filter.limit == 0 || matches.len() <= filter.limit {
            return Ok(matches);
        }
        let skip = matches.len() - filter.limit;
        Ok(matches.into_iter().skip(skip).collect())
    }
}
