/// All errors that can be returned by an AuditLog implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// No entry was recorded under this correlation id.
    #[error("audit entry not found: {correlation_id}")]
    EntryNotFound { correlation_id: String },

    /// An entry with this correlation id already exists. Correlation ids are
    /// unique per request, so a second record is a requester bug or a replay.
    #[error("duplicate correlation id: {correlation_id}")]
    DuplicateCorrelation { correlation_id: String },

    /// The entry has already been undone.
    #[error("audit entry {correlation_id} already undone at {undone_at}")]
    AlreadyUndone {
        correlation_id: String,
        undone_at: String,
    },

    /// A backend-specific error (lock poisoning, serialization, etc.).
    #[error("ledger backend error: {0}")]
    Backend(String),
}
