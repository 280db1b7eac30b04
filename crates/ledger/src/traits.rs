use async_trait::async_trait;

use crate::error::LedgerError;
use crate::record::{AuditEntry, HistoryFilter};

/// The audit log used by both the direct and the relayed mutation paths.
///
/// An `AuditLog` is append-only: `record` adds an entry, and the only
/// permitted change to an existing entry is `mark_undone`, which sets
/// `undone_at` exactly once.
///
/// ## Ordering
///
/// `list` returns entries in the order they were recorded. Callers that
/// process a batch of targets sequentially rely on this to reproduce the
/// batch order in history.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` so one log can be shared
/// through an `Arc` by every handler of a session.
#[async_trait]
pub trait AuditLog: Send + Sync + 'static {
    /// Append an entry and return its correlation id.
    ///
    /// Returns `Err(LedgerError::DuplicateCorrelation)` if an entry with the
    /// same correlation id already exists.
    async fn record(&self, entry: AuditEntry) -> Result<String, LedgerError>;

    /// Read an entry by correlation id.
    ///
    /// Returns `Err(LedgerError::EntryNotFound)` if no such entry exists.
    async fn get(&self, correlation_id: &str) -> Result<AuditEntry, LedgerError>;

    /// Set `undone_at` on an entry and return the updated entry.
    ///
    /// Returns `Err(LedgerError::AlreadyUndone)` if the entry was undone
    /// before; the existing timestamp is left untouched.
    async fn mark_undone(
        &self,
        correlation_id: &str,
        undone_at: &str,
    ) -> Result<AuditEntry, LedgerError>;

    /// List entries in recording order, filtered.
    async fn list(&self, filter: &HistoryFilter) -> Result<Vec<AuditEntry>, LedgerError>;
}
