use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use docent_core::TutorError;

use crate::config::DbConfig;

/// Open the database pool, creating the file and its parent directory
/// on first use. WAL keeps question answering readable while ingestion
/// writes. Foreign keys are enforced on every connection: index rows
/// cannot outlive the document row they belong to.
pub async fn connect(db: &DbConfig) -> Result<SqlitePool> {
    if let Some(parent) = db.path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db.path.display()))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Map an sqlx error to the caller-facing taxonomy. Detail goes to the
/// log; callers see a generic upstream failure.
pub(crate) fn db_err(e: sqlx::Error) -> TutorError {
    tracing::warn!("database error: {}", e);
    TutorError::Upstream("database operation failed".to_string())
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err.as_database_error().map(|db| db.kind()),
        Some(sqlx::error::ErrorKind::UniqueViolation)
    )
}
