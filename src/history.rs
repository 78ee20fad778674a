//! Recent search terms.
//!
//! Keeps the most recent searches, newest first, with at most one entry
//! per term ignoring case. Searching a term again moves it to the front.

use anyhow::{bail, Result};
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Record `term` as the most recent search and trim to `max_entries`.
pub async fn record_search(pool: &SqlitePool, term: &str, max_entries: usize) -> Result<()> {
    let now = chrono::Utc::now().timestamp();
    let mut tx = pool.begin().await?;

    // SQLite's lower() only folds ASCII, so compare in Rust
    let folded = term.to_lowercase();
    let existing: Vec<(i64, String)> = sqlx::query_as("SELECT seq, term FROM search_history")
        .fetch_all(&mut *tx)
        .await?;
    for (seq, _) in existing.iter().filter(|(_, t)| t.to_lowercase() == folded) {
        sqlx::query("DELETE FROM search_history WHERE seq = ?")
            .bind(*seq)
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query("INSERT INTO search_history (term, searched_at) VALUES (?, ?)")
        .bind(term)
        .bind(now)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        r#"
        DELETE FROM search_history
        WHERE seq NOT IN (
            SELECT seq FROM search_history ORDER BY seq DESC LIMIT ?
        )
        "#,
    )
    .bind(max_entries as i64)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Recent terms, newest first.
pub async fn list_history(pool: &SqlitePool) -> Result<Vec<String>> {
    let terms: Vec<String> =
        sqlx::query_scalar("SELECT term FROM search_history ORDER BY seq DESC")
            .fetch_all(pool)
            .await?;
    Ok(terms)
}

pub async fn clear_history(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query("DELETE FROM search_history")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// The `n`-th most recent term (1-based), as shown by `vctx history list`.
pub async fn nth_recent(pool: &SqlitePool, n: usize) -> Result<String> {
    if n == 0 {
        bail!("history positions start at 1");
    }
    let terms = list_history(pool).await?;
    match terms.into_iter().nth(n - 1) {
        Some(term) => Ok(term),
        None => bail!("no search at position {} in history", n),
    }
}

// ============ CLI entry points ============

pub async fn run_list(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let terms = list_history(&pool).await?;
    pool.close().await;

    if terms.is_empty() {
        println!("No recent searches.");
        return Ok(());
    }

    for (i, term) in terms.iter().enumerate() {
        println!("{}. {}", i + 1, term);
    }
    Ok(())
}

pub async fn run_clear(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let removed = clear_history(&pool).await?;
    pool.close().await;

    println!("Cleared {} search(es) from history.", removed);
    Ok(())
}
