use std::future::Future;

use super::{make_entry, CaseResult, Category};
use crate::{AuditLog, LedgerError};

pub(super) async fn run_undo_tests<L, F, Fut>(factory: &F) -> Vec<CaseResult>
where
    L: AuditLog,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let mut results = Vec::new();

    results.push(CaseResult::check(
        Category::Undo,
        "mark_undone_sets_timestamp",
        mark_undone_sets_timestamp(factory).await,
    ));
    results.push(CaseResult::check(
        Category::Undo,
        "mark_undone_twice_rejected",
        mark_undone_twice_rejected(factory).await,
    ));
    results.push(CaseResult::check(
        Category::Undo,
        "mark_undone_unknown_returns_entry_not_found",
        mark_undone_unknown_returns_entry_not_found(factory).await,
    ));
    results.push(CaseResult::check(
        Category::Undo,
        "mark_undone_leaves_other_fields_untouched",
        mark_undone_leaves_other_fields_untouched(factory).await,
    ));

    results
}

async fn mark_undone_sets_timestamp<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: AuditLog,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let log = factory().await;
    log.record(make_entry("c-1", "goblin"))
        .await
        .map_err(|e| e.to_string())?;

    let updated = log
        .mark_undone("c-1", "2025-01-01T00:05:00Z")
        .await
        .map_err(|e| e.to_string())?;
    if updated.undone_at.as_deref() != Some("2025-01-01T00:05:00Z") {
        return Err(format!("returned entry undone_at {:?}", updated.undone_at));
    }

    let read = log.get("c-1").await.map_err(|e| e.to_string())?;
    if read.undone_at.as_deref() != Some("2025-01-01T00:05:00Z") {
        return Err(format!("stored entry undone_at {:?}", read.undone_at));
    }
    Ok(())
}

/// The first undo timestamp wins; a second mark fails with AlreadyUndone
/// carrying the original timestamp.
async fn mark_undone_twice_rejected<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: AuditLog,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let log = factory().await;
    log.record(make_entry("c-1", "goblin"))
        .await
        .map_err(|e| e.to_string())?;
    log.mark_undone("c-1", "2025-01-01T00:05:00Z")
        .await
        .map_err(|e| e.to_string())?;

    match log.mark_undone("c-1", "2025-01-01T00:09:00Z").await {
        Err(LedgerError::AlreadyUndone { undone_at, .. }) => {
            if undone_at != "2025-01-01T00:05:00Z" {
                return Err(format!("error carries wrong timestamp {undone_at}"));
            }
        }
        Err(e) => return Err(format!("expected AlreadyUndone, got {e}")),
        Ok(_) => return Err("expected AlreadyUndone, got Ok".to_string()),
    }

    let read = log.get("c-1").await.map_err(|e| e.to_string())?;
    if read.undone_at.as_deref() != Some("2025-01-01T00:05:00Z") {
        return Err(format!("timestamp overwritten: {:?}", read.undone_at));
    }
    Ok(())
}

async fn mark_undone_unknown_returns_entry_not_found<L, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    L: AuditLog,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let log = factory().await;
    match log.mark_undone("missing", "2025-01-01T00:05:00Z").await {
        Err(LedgerError::EntryNotFound { .. }) => Ok(()),
        Err(e) => Err(format!("expected EntryNotFound, got {e}")),
        Ok(_) => Err("expected EntryNotFound, got Ok".to_string()),
    }
}

async fn mark_undone_leaves_other_fields_untouched<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: AuditLog,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let log = factory().await;
    let original = make_entry("c-1", "goblin");
    log.record(original.clone())
        .await
        .map_err(|e| e.to_string())?;
    let mut updated = log
        .mark_undone("c-1", "2025-01-01T00:05:00Z")
        .await
        .map_err(|e| e.to_string())?;

    updated.undone_at = None;
    if updated != original {
        return Err(format!("entry changed beyond undone_at: {updated:?}"));
    }
    Ok(())
}
