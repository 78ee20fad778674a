//! The learner's document library.
//!
//! Reads text files from disk and stores them as immutable
//! [`Document`]s in SQLite. Documents are listed in upload order, which
//! is also the order extraction scans them in.
//!
//! Used by the `vctx add` and `vctx docs` commands and by search.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::config::Config;
use crate::db;
use crate::models::{Document, DocumentKind, NewDocument};

/// Read documents from the given paths.
///
/// Files are taken as given, whatever their extension. Directories are
/// walked recursively and filtered by `include_globs` (relative to the
/// directory). Results keep argument order; files found in a directory
/// are sorted by relative path.
pub fn scan_paths(paths: &[PathBuf], include_globs: &[String]) -> Result<Vec<NewDocument>> {
    let include_set = build_globset(include_globs)?;
    let exclude_set = build_globset(&[
        "**/.git/**".to_string(),
        "**/target/**".to_string(),
        "**/node_modules/**".to_string(),
    ])?;

    let mut docs = Vec::new();

    for path in paths {
        if path.is_file() {
            docs.push(read_document(path)?);
            continue;
        }

        if !path.is_dir() {
            bail!("No such file or directory: {}", path.display());
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(path) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let file = entry.path();
            let relative = file.strip_prefix(path).unwrap_or(file);
            let rel_str = relative.to_string_lossy().to_string();

            if exclude_set.is_match(&rel_str) || !include_set.is_match(&rel_str) {
                continue;
            }
            found.push((rel_str, file.to_path_buf()));
        }

        // Sort for deterministic ordering
        found.sort_by(|a, b| a.0.cmp(&b.0));
        for (_, file) in found {
            docs.push(read_document(&file)?);
        }
    }

    Ok(docs)
}

/// Read one file. Bytes that are not valid UTF-8 are replaced rather
/// than rejected, so odd encodings degrade to fewer sentences. A leading
/// byte-order mark is dropped.
fn read_document(path: &Path) -> Result<NewDocument> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    let content = text.strip_prefix('\u{FEFF}').unwrap_or(&*text).to_string();

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    Ok(NewDocument {
        kind: DocumentKind::from_file_name(&name),
        name,
        content,
    })
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Append documents to the library, assigning fresh ids.
pub async fn add_documents(pool: &SqlitePool, new_docs: Vec<NewDocument>) -> Result<Vec<Document>> {
    let now = chrono::Utc::now().timestamp();
    let mut added = Vec::with_capacity(new_docs.len());
    let mut tx = pool.begin().await?;

    for nd in new_docs {
        let doc = Document {
            id: Uuid::new_v4().to_string(),
            name: nd.name,
            content: nd.content,
            kind: nd.kind,
            uploaded_at: now,
        };

        sqlx::query(
            "INSERT INTO documents (id, name, content, kind, uploaded_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&doc.id)
        .bind(&doc.name)
        .bind(&doc.content)
        .bind(doc.kind.as_str())
        .bind(doc.uploaded_at)
        .execute(&mut *tx)
        .await?;

        tracing::info!(id = %doc.id, name = %doc.name, bytes = doc.content.len(), "document added");
        added.push(doc);
    }

    tx.commit().await?;
    Ok(added)
}

/// All documents in upload order.
pub async fn list_documents(pool: &SqlitePool) -> Result<Vec<Document>> {
    let rows = sqlx::query(
        "SELECT id, name, content, kind, uploaded_at FROM documents ORDER BY seq ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(row_to_document).collect())
}

pub async fn get_document(pool: &SqlitePool, id: &str) -> Result<Option<Document>> {
    let row = sqlx::query("SELECT id, name, content, kind, uploaded_at FROM documents WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(row_to_document))
}

/// Delete a document. Returns false if no document had that id.
pub async fn remove_document(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM documents WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_documents(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> Document {
    let kind: String = row.get("kind");
    Document {
        id: row.get("id"),
        name: row.get("name"),
        content: row.get("content"),
        kind: DocumentKind::parse(&kind),
        uploaded_at: row.get("uploaded_at"),
    }
}

// ============ CLI entry points ============

pub async fn run_add(config: &Config, paths: &[PathBuf]) -> Result<()> {
    let new_docs = scan_paths(paths, &config.library.include_globs)?;
    if new_docs.is_empty() {
        println!("No documents found.");
        return Ok(());
    }

    let pool = db::connect(config).await?;
    let added = add_documents(&pool, new_docs).await?;
    pool.close().await;

    for doc in &added {
        println!("added {}  {} ({})", doc.id, doc.name, doc.kind.as_str());
    }
    println!("{} document(s) added.", added.len());
    Ok(())
}

pub async fn run_list(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let docs = list_documents(&pool).await?;
    pool.close().await;

    if docs.is_empty() {
        println!("No documents. Use `vctx add <path>` to upload some.");
        return Ok(());
    }

    println!("{:<36}  {:<8}  {:>8}  {:<10}  NAME", "ID", "KIND", "CHARS", "ADDED");
    for doc in &docs {
        println!(
            "{:<36}  {:<8}  {:>8}  {:<10}  {}",
            doc.id,
            doc.kind.as_str(),
            doc.content.chars().count(),
            format_date(doc.uploaded_at),
            doc.name
        );
    }
    Ok(())
}

pub async fn run_show(config: &Config, id: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    let doc = get_document(&pool, id).await?;
    pool.close().await;

    let doc = match doc {
        Some(d) => d,
        None => bail!("document not found: {}", id),
    };

    println!("--- Document ---");
    println!("id:           {}", doc.id);
    println!("name:         {}", doc.name);
    println!("kind:         {}", doc.kind.as_str());
    println!("uploaded_at:  {}", format_date(doc.uploaded_at));
    println!();
    println!("--- Content ---");
    println!("{}", doc.content);
    Ok(())
}

pub async fn run_remove(config: &Config, id: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    let removed = remove_document(&pool, id).await?;
    pool.close().await;

    if !removed {
        bail!("document not found: {}", id);
    }
    println!("Removed document {}.", id);
    Ok(())
}

fn format_date(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| ts.to_string())
}
