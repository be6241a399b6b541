//! Document storage: metadata rows in SQLite, raw file bytes on disk.
//!
//! [`LocalStorage`] is phase one of ingestion. A document row recorded
//! here is durable regardless of whether indexing later succeeds; the
//! `indexed` flag tracks phase two. Per-owner name uniqueness is the
//! `UNIQUE(owner_email, name)` constraint on the table, so a clash is
//! reported by the insert itself rather than by a racy existence check.

use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use docent_core::models::{DocumentRecord, NewDocument};
use docent_core::traits::DocumentStorage;
use docent_core::{Result, TutorError};

use crate::db::{db_err, is_unique_violation};

/// SQLite rows plus a local blob directory.
pub struct LocalStorage {
    pool: SqlitePool,
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(pool: SqlitePool, root: PathBuf) -> Self {
        Self { pool, root }
    }
}

fn row_to_document(row: &sqlx::sqlite::SqliteRow) -> DocumentRecord {
    DocumentRecord {
        id: row.get("id"),
        owner_email: row.get("owner_email"),
        name: row.get("name"),
        content_type: row.get("content_type"),
        body: row.get("body"),
        storage_url: row.get("storage_url"),
        created_at: row.get("created_at"),
        indexed: row.get("indexed"),
        modules: row.get("modules"),
    }
}

#[async_trait]
impl DocumentStorage for LocalStorage {
    async fn store_file(&self, bytes: &[u8], object_name: &str) -> Result<String> {
        // Object names never nest; separators are flattened so an
        // uploaded file name cannot escape the storage root.
        let safe_name = object_name.replace(['/', '\\'], "_");
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            tracing::warn!("failed to create storage root: {}", e);
            TutorError::Upstream("document storage failed".to_string())
        })?;
        let path = self.root.join(safe_name);
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            tracing::warn!("failed to write {}: {}", path.display(), e);
            TutorError::Upstream("document storage failed".to_string())
        })?;
        Ok(format!("file://{}", path.display()))
    }

    async fn record_document(&self, document: &NewDocument) -> Result<()> {
        let insert = sqlx::query(
            r#"
            INSERT INTO documents (id, owner_email, name, content_type, body,
                                   created_at, indexed, modules)
            VALUES (?, ?, ?, ?, ?, ?, 0, 0)
            "#,
        )
        .bind(&document.id)
        .bind(&document.owner_email)
        .bind(&document.name)
        .bind(&document.content_type)
        .bind(&document.body)
        .bind(document.created_at)
        .execute(&self.pool)
        .await;

        match insert {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(TutorError::Conflict(format!(
                "a document named '{}' already exists",
                document.name
            ))),
            Err(e) => Err(db_err(e)),
        }
    }

    async fn set_storage_url(&self, document_id: &str, url: &str) -> Result<()> {
        sqlx::query("UPDATE documents SET storage_url = ? WHERE id = ?")
            .bind(url)
            .bind(document_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn set_indexed(&self, document_id: &str, indexed: bool, modules: i64) -> Result<()> {
        sqlx::query("UPDATE documents SET indexed = ?, modules = ? WHERE id = ?")
            .bind(indexed)
            .bind(modules)
            .bind(document_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn get_document(&self, document_id: &str) -> Result<Option<DocumentRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_email, name, content_type, body, storage_url,
                   created_at, indexed, modules
            FROM documents WHERE id = ?
            "#,
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.as_ref().map(row_to_document))
    }

    async fn list_documents(&self, owner_email: &str) -> Result<Vec<DocumentRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, owner_email, name, content_type, body, storage_url,
                   created_at, indexed, modules
            FROM documents
            WHERE owner_email = ?
            ORDER BY created_at DESC, name ASC
            "#,
        )
        .bind(owner_email)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows.iter().map(row_to_document).collect())
    }

    async fn delete_document(&self, document_id: &str) -> Result<bool> {
        let storage_url: Option<String> =
            sqlx::query("SELECT storage_url FROM documents WHERE id = ?")
                .bind(document_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?
                .and_then(|row| row.get("storage_url"));

        let deleted = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(document_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?
            .rows_affected();

        // Blob removal is best effort; a stale file is harmless while a
        // failed delete of the row is not.
        if let Some(url) = storage_url {
            if let Some(path) = url.strip_prefix("file://") {
                if let Err(e) = tokio::fs::remove_file(path).await {
                    tracing::warn!("failed to remove stored file {}: {}", path, e);
                }
            }
        }

        Ok(deleted > 0)
    }
}
