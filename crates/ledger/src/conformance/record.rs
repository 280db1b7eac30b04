use std::future::Future;

use super::{make_entry, CaseResult, Category};
use crate::{AuditLog, LedgerError};

pub(super) async fn run_record_tests<L, F, Fut>(factory: &F) -> Vec<CaseResult>
where
    L: AuditLog,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let mut results = Vec::new();

    results.push(CaseResult::check(
        Category::Record,
        "record_returns_correlation_id",
        record_returns_correlation_id(factory).await,
    ));
    results.push(CaseResult::check(
        Category::Record,
        "record_then_get_returns_entry",
        record_then_get_returns_entry(factory).await,
    ));
    results.push(CaseResult::check(
        Category::Record,
        "duplicate_correlation_rejected",
        duplicate_correlation_rejected(factory).await,
    ));
    results.push(CaseResult::check(
        Category::Record,
        "get_unknown_returns_entry_not_found",
        get_unknown_returns_entry_not_found(factory).await,
    ));
    results.push(CaseResult::check(
        Category::Record,
        "recorded_entry_starts_not_undone",
        recorded_entry_starts_not_undone(factory).await,
    ));

    results
}

// ── Test implementations ──────────────────────────────────────────────────────

async fn record_returns_correlation_id<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: AuditLog,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let log = factory().await;
    let id = log
        .record(make_entry("damage-1-abc", "goblin"))
        .await
        .map_err(|e| e.to_string())?;
    if id != "damage-1-abc" {
        return Err(format!("expected id \"damage-1-abc\", got \"{id}\""));
    }
    Ok(())
}

async fn record_then_get_returns_entry<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: AuditLog,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let log = factory().await;
    let entry = make_entry("damage-1-abc", "goblin");
    log.record(entry.clone()).await.map_err(|e| e.to_string())?;

    let read = log.get("damage-1-abc").await.map_err(|e| e.to_string())?;
    if read != entry {
        return Err(format!("read entry differs: {read:?}"));
    }
    Ok(())
}

/// A second record under the same correlation id must fail and leave the
/// first entry intact.
async fn duplicate_correlation_rejected<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: AuditLog,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let log = factory().await;
    log.record(make_entry("damage-1-abc", "goblin"))
        .await
        .map_err(|e| e.to_string())?;

    match log.record(make_entry("damage-1-abc", "ogre")).await {
        Err(LedgerError::DuplicateCorrelation { correlation_id }) => {
            if correlation_id != "damage-1-abc" {
                return Err(format!("wrong correlation id in error: {correlation_id}"));
            }
        }
        Err(e) => return Err(format!("expected DuplicateCorrelation, got {e}")),
        Ok(_) => return Err("expected DuplicateCorrelation, got Ok".to_string()),
    }

    let read = log.get("damage-1-abc").await.map_err(|e| e.to_string())?;
    if read.target_entity_id != "goblin" {
        return Err(format!(
            "first entry overwritten: target {}",
            read.target_entity_id
        ));
    }
    Ok(())
}

async fn get_unknown_returns_entry_not_found<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: AuditLog,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let log = factory().await;
    match log.get("missing").await {
        Err(LedgerError::EntryNotFound { correlation_id }) if correlation_id == "missing" => Ok(()),
        Err(e) => Err(format!("expected EntryNotFound(missing), got {e}")),
        Ok(_) => Err("expected EntryNotFound, got Ok".to_string()),
    }
}

async fn recorded_entry_starts_not_undone<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: AuditLog,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let log = factory().await;
    log.record(make_entry("damage-1-abc", "goblin"))
        .await
        .map_err(|e| e.to_string())?;
    let read = log.get("damage-1-abc").await.map_err(|e| e.to_string())?;
    if read.undone_at.is_some() {
        return Err(format!("expected undone_at None, got {:?}", read.undone_at));
    }
    Ok(())
}
