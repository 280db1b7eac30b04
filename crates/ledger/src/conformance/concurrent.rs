use std::future::Future;
use std::sync::Arc;

use super::{make_entry, CaseResult, Category};
use crate::{AuditLog, HistoryFilter, LedgerError};

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<L, F, Fut>(factory: &F) -> Vec<CaseResult>
where
    L: AuditLog,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let mut results = Vec::new();

    results.push(CaseResult::check(
        Category::Concurrent,
        "concurrent_records_none_lost",
        concurrent_records_none_lost(factory).await,
    ));
    results.push(CaseResult::check(
        Category::Concurrent,
        "concurrent_mark_undone_exactly_one_wins",
        concurrent_mark_undone_exactly_one_wins(factory).await,
    ));

    results
}

// ── Concurrent appends: none lost ────────────────────────────────────────────

/// N tasks append distinct entries in parallel, the way direct and relayed
/// paths share one log. Every entry must be readable afterwards.
async fn concurrent_records_none_lost<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: AuditLog,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let log = Arc::new(factory().await);

    let mut handles = Vec::new();
    for i in 0..N {
        let l = log.clone();
        handles.push(tokio::spawn(async move {
            l.record(make_entry(&format!("c-{i}"), "goblin")).await
        }));
    }
    for handle in handles {
        handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e| format!("record: {e}"))?;
    }

    let all = log
        .list(&HistoryFilter::default())
        .await
        .map_err(|e| e.to_string())?;
    if all.len() != N {
        return Err(format!("expected {N} entries, got {}", all.len()));
    }
    for i in 0..N {
        log.get(&format!("c-{i}"))
            .await
            .map_err(|e| format!("c-{i}: {e}"))?;
    }
    Ok(())
}

// ── Concurrent undo marks: exactly one wins ──────────────────────────────────

async fn concurrent_mark_undone_exactly_one_wins<L, F, Fut>(factory: &F) -> Result<(), String>
where
    L: AuditLog,
    F: Fn() -> Fut,
    Fut: Future<Output = L>,
{
    let log = Arc::new(factory().await);
    log.record(make_entry("c-1", "goblin"))
        .await
        .map_err(|e| e.to_string())?;

    let mut handles = Vec::new();
    for i in 0..N {
        let l = log.clone();
        handles.push(tokio::spawn(async move {
            match l.mark_undone("c-1", &format!("2025-01-01T00:0{i}:00Z")).await {
                Ok(_) => Ok(true),
                Err(LedgerError::AlreadyUndone { .. }) => Ok(false),
                Err(e) => Err(e),
            }
        }));
    }

    let mut winners = 0usize;
    for handle in handles {
        let won = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: LedgerError| format!("ledger error: {e}"))?;
        if won {
            winners += 1;
        }
    }
    if winners != 1 {
        return Err(format!("expected exactly one winner, got {winners}"));
    }
    Ok(())
}
