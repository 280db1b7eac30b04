//! Append-only audit ledger for the strike relay.
//!
//! Every mutation the relay applies is recorded here exactly once, keyed by
//! the correlation id the requester generated. Entries are immutable apart
//! from `undone_at`, which an undo sets at most once.

pub mod conformance;
mod error;
mod memory;
mod record;
mod traits;

pub use error::LedgerError;
pub use memory::InMemoryAuditLog;
pub use record::{
    AppliedVia, AuditEntry, ConditionRecord, HistoryFilter, MutationDetail, MutationKind,
    StaminaSnapshot,
};
pub use traits::AuditLog;
