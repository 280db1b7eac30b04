//! Conformance test suite for `AuditLog` implementations.
//!
//! A backend-agnostic suite any `AuditLog` can run to verify it behaves like
//! the session ledger the relay expects. The suite covers:
//!
//! - **Record**: append, read back, duplicate correlation ids
//! - **Undo marking**: set once, second mark rejected, unknown ids
//! - **History**: recording order, target filter, undone filter, limit
//! - **Concurrency**: parallel appends lose nothing
//!
//! # Usage
//!
//! Backend crates call [`run_conformance_suite`] with a factory function that
//! creates a fresh, empty log for each test:
//!
//! ```ignore
//! use strike_ledger::conformance::run_conformance_suite;
//!
//! #[tokio::test]
//! async fn my_backend_conformance() {
//!     let report = run_conformance_suite(|| async { MyAuditLog::connect().await }).await;
//!     assert_eq!(report.failed(), 0, "{report}");
//! }
//! ```

mod concurrent;
mod history;
mod record;
mod undo;

use std::fmt;
use std::future::Future;

use crate::record::{AppliedVia, AuditEntry, MutationDetail, MutationKind, StaminaSnapshot};
use crate::AuditLog;

/// The area of ledger behaviour a case checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Category {
    Record,
    Undo,
    History,
    Concurrent,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Record,
        Category::Undo,
        Category::History,
        Category::Concurrent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Record => "record",
            Category::Undo => "undo",
            Category::History => "history",
            Category::Concurrent => "concurrent",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one conformance case. `failure` holds the reason when the
/// backend misbehaved.
#[derive(Debug, Clone)]
pub struct CaseResult {
    pub category: Category,
    pub name: &'static str,
    pub failure: Option<String>,
}

impl CaseResult {
    fn check(category: Category, name: &'static str, result: Result<(), String>) -> Self {
        Self {
            category,
            name,
            failure: result.err(),
        }
    }

    pub fn passed(&self) -> bool {
        self.failure.is_none()
    }
}

/// Every case result of one suite run, in execution order.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub cases: Vec<CaseResult>,
}

impl ConformanceReport {
    pub fn total(&self) -> usize {
        self.cases.len()
    }

    pub fn failed(&self) -> usize {
        self.failures().count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseResult> {
        self.cases.iter().filter(|c| !c.passed())
    }

    /// `(passed, total)` for one category.
    pub fn tally(&self, category: Category) -> (usize, usize) {
        self.cases
            .iter()
            .filter(|c| c.category == category)
            .fold((0, 0), |(passed, total), c| {
                (passed + usize::from(c.passed()), total + 1)
            })
    }
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "audit log conformance: {} of {} cases failed",
            self.failed(),
            self.total()
        )?;
        for category in Category::ALL {
            let (passed, total) = self.tally(category);
            writeln!(f, "  {category:<10} {passed}/{total}")?;
        }
        for case in self.failures() {
            writeln!(
                f,
                "  {}::{} -> {}",
                case.category,
                case.name,
                case.failure.as_deref().unwrap_or_default()
            )?;
        }
        Ok(())
    }
}

/// Run the full conformance suite against an audit log backend.
///
/// `factory` builds a fresh, empty log for every case.
pub async fn run_conformance_suite<L, F, Fut>(factory: F) -> ConformanceReport
where
    L: AuditLog,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let mut cases = record::run_record_tests(&factory).await;
    cases.extend(undo::run_undo_tests(&factory).await);
    cases.extend(history::run_history_tests(&factory).await);
    cases.extend(concurrent::run_concurrent_tests(&factory).await);
    ConformanceReport { cases }
}

/// Build a relayed damage entry with sensible defaults, for backend tests.
pub fn make_entry(correlation_id: &str, target_entity_id: &str) -> AuditEntry {
    AuditEntry {
        correlation_id: correlation_id.to_string(),
        kind: MutationKind::Damage,
        target_entity_id: target_entity_id.to_string(),
        target_name: format!("{target_entity_id} (token)"),
        detail: MutationDetail::Damage {
            requested: 8,
            applied: 8,
            damage_kind: "fire".to_string(),
            ignored_immunities: vec![],
        },
        before: StaminaSnapshot {
            permanent: 20,
            temporary: 0,
        },
        after: StaminaSnapshot {
            permanent: 12,
            temporary: 0,
        },
        source_actor_id: Some("actor-talia".to_string()),
        source_actor_name: "Talia".to_string(),
        source_player_name: "player-one".to_string(),
        source_item_ref: None,
        applied_via: AppliedVia::Relayed,
        timestamp: "2025-01-01T00:00:00Z".to_string(),
        undone_at: None,
    }
}
