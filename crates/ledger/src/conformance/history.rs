use std::future::Future;

use super::{make_entry, CaseResult, Category};
use crate::{AuditLog, HistoryFilter};

pub(super) async fn run_history_tests<L, F, Fut>(factory: &F) -> Vec<CaseResult>
where
    L: AuditLog,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let mut results = Vec::new();

    results.push(CaseResult::check(
        Category::History,
        "list_preserves_recording_order",
        list_preserves_recording_order(factory).await,
    ));
    results.push(CaseResult::check(
        Category::History,
        "list_filters_by_target",
        list_filters_by_target(factory).await,
    ));
    results.push(CaseResult::check(
        Category::History,
        "list_hides_undone_by_default",
        list_hides_undone_by_default(factory).await,
    ));
    results.push(CaseResult::check(
        Category::History,
        "list_limit_keeps_most_recent",
        list_limit_keeps_most_recent(factory).await,
    ));
    results.push(CaseResult::check(
        Category::History,
        "list_empty_log",
        list_empty_log(factory).await,
    ));

    results
}

async fn seed<L: AuditLog>(log: &L, entries: &[(&str, &str)]) -> Result<(), String> {
    for (id, target) in entries {
        log.record(make_entry(id, target))
            .await
            .map_err(|e| e.to_string())?;
    }
    Ok(())
}

fn ids(entries: &[crate::AuditEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.correlation_id.as_str()).collect()
}

async fn list_preserves_recording_order<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: AuditLog,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let log = factory().await;
    seed(&log, &[("c-3", "a"), ("c-1", "b"), ("c-2", "c")]).await?;
    let all = log
        .list(&HistoryFilter::default())
        .await
        .map_err(|e| e.to_string())?;
    if ids(&all) != ["c-3", "c-1", "c-2"] {
        return Err(format!("unexpected order {:?}", ids(&all)));
    }
    Ok(())
}

async fn list_filters_by_target<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: AuditLog,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let log = factory().await;
    seed(&log, &[("c-1", "goblin"), ("c-2", "ogre"), ("c-3", "goblin")]).await?;
    let filter = HistoryFilter {
        target_entity_id: Some("goblin".to_string()),
        ..HistoryFilter::default()
    };
    let goblin = log.list(&filter).await.map_err(|e| e.to_string())?;
    if ids(&goblin) != ["c-1", "c-3"] {
        return Err(format!("unexpected entries {:?}", ids(&goblin)));
    }
    Ok(())
}

async fn list_hides_undone_by_default<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: AuditLog,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let log = factory().await;
    seed(&log, &[("c-1", "goblin"), ("c-2", "goblin")]).await?;
    log.mark_undone("c-1", "2025-01-01T00:05:00Z")
        .await
        .map_err(|e| e.to_string())?;

    let live = log
        .list(&HistoryFilter::default())
        .await
        .map_err(|e| e.to_string())?;
    if ids(&live) != ["c-2"] {
        return Err(format!("undone entry listed: {:?}", ids(&live)));
    }

    let everything = log
        .list(&HistoryFilter {
            include_undone: true,
            ..HistoryFilter::default()
        })
        .await
        .map_err(|e| e.to_string())?;
    if ids(&everything) != ["c-1", "c-2"] {
        return Err(format!("include_undone missed entries: {:?}", ids(&everything)));
    }
    Ok(())
}

async fn list_limit_keeps_most_recent<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: AuditLog,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let log = factory().await;
    seed(&log, &[("c-1", "a"), ("c-2", "a"), ("c-3", "a"), ("c-4", "a")]).await?;
    let recent = log
        .list(&HistoryFilter {
            limit: 2,
            ..HistoryFilter::default()
        })
        .await
        .map_err(|e| e.to_string())?;
    if ids(&recent) != ["c-3", "c-4"] {
        return Err(format!("expected [c-3, c-4], got {:?}", ids(&recent)));
    }
    Ok(())
}

async fn list_empty_log<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: AuditLog,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let log = factory().await;
    let all = log
        .list(&HistoryFilter::default())
        .await
        .map_err(|e| e.to_string())?;
    if !all.is_empty() {
        return Err(format!("expected empty history, got {}", all.len()));
    }
    Ok(())
}
