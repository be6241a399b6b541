//! SQLite-backed [`IndexStore`] implementation.
//!
//! Index records live in the `chunks` table with their vectors in
//! `chunk_vectors`. Duplicate detection is the `chunks.record_id`
//! primary key: the insert itself fails on a repeat, there is no
//! read-before-write window. Similarity search fetches the scoped
//! candidate rows and scores them in Rust with cosine similarity.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use docent_core::embed::{blob_to_vec, cosine_similarity, vec_to_blob, Embedder};
use docent_core::models::{preview, ChunkRecord, ModuleSummary, ScoredChunk};
use docent_core::store::{order_hits, IndexStore, QueryScope, MODULE_PREVIEW_CHARS};
use docent_core::{Result, TutorError};

use crate::db::{db_err, is_unique_violation};

/// SQLite implementation of the [`IndexStore`] trait.
pub struct SqliteIndexStore {
    pool: SqlitePool,
    embedder: Arc<dyn Embedder>,
}

impl SqliteIndexStore {
    pub fn new(pool: SqlitePool, embedder: Arc<dyn Embedder>) -> Self {
        Self { pool, embedder }
    }
}

/// Insert one record and its vector inside an open transaction.
async fn insert_record(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    record: &ChunkRecord,
    vector: &[f32],
    model: &str,
) -> Result<()> {
    let insert = sqlx::query(
        r#"
        INSERT INTO chunks (record_id, document_id, module_number, text,
                            owner_email, document_name, hash)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.record_id)
    .bind(&record.document_id)
    .bind(record.module_number)
    .bind(&record.text)
    .bind(&record.owner_email)
    .bind(&record.document_name)
    .bind(&record.hash)
    .execute(&mut **tx)
    .await;

    if let Err(e) = insert {
        if is_unique_violation(&e) {
            return Err(TutorError::DuplicateRecord(record.record_id.clone()));
        }
        return Err(db_err(e));
    }

    sqlx::query(
        r#"
        INSERT INTO chunk_vectors (record_id, document_id, embedding, model, dims)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.record_id)
    .bind(&record.document_id)
    .bind(vec_to_blob(vector))
    .bind(model)
    .bind(vector.len() as i64)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;

    Ok(())
}

#[async_trait]
impl IndexStore for SqliteIndexStore {
    async fn add(&self, record: &ChunkRecord) -> Result<String> {
        let vector = self.embedder.embed_one(&record.text).await?;
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        insert_record(&mut tx, record, &vector, self.embedder.model_name()).await?;
        tx.commit().await.map_err(db_err)?;
        Ok(record.record_id.clone())
    }

    async fn add_batch(&self, records: &[ChunkRecord]) -> Result<Vec<String>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }
        let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != records.len() {
            return Err(TutorError::Upstream(
                "embedding backend returned a mismatched vector count".to_string(),
            ));
        }

        // One transaction for the whole batch: a duplicate anywhere
        // rolls everything back.
        let mut tx = self.pool.begin().await.map_err(db_err)?;
        let mut ids = Vec::with_capacity(records.len());
        for (record, vector) in records.iter().zip(&vectors) {
            insert_record(&mut tx, record, vector, self.embedder.model_name()).await?;
            ids.push(record.record_id.clone());
        }
        tx.commit().await.map_err(db_err)?;
        Ok(ids)
    }

    async fn replace_document(&self, document_id: &str, records: &[ChunkRecord]) -> Result<()> {
        let texts: Vec<String> = records.iter().map(|r| r.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != records.len() {
            return Err(TutorError::Upstream(
                "embedding backend returned a mismatched vector count".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query("DELETE FROM chunk_vectors WHERE document_id = ?")
            .bind(document_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(document_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        for (record, vector) in records.iter().zip(&vectors) {
            insert_record(&mut tx, record, vector, self.embedder.model_name()).await?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn query(
        &self,
        question: &str,
        scope: QueryScope<'_>,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let query_vec = self.embedder.embed_one(question).await?;

        let rows = sqlx::query(
            r#"
            SELECT c.record_id, c.document_id, c.document_name, c.module_number,
                   c.text, cv.embedding
            FROM chunks c
            JOIN chunk_vectors cv ON cv.record_id = c.record_id
            WHERE c.owner_email = ?
              AND (? IS NULL OR c.document_id = ?)
            "#,
        )
        .bind(scope.owner_email)
        .bind(scope.document_id)
        .bind(scope.document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut hits: Vec<ScoredChunk> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vector = blob_to_vec(&blob);
                ScoredChunk {
                    record_id: row.get("record_id"),
                    document_id: row.get("document_id"),
                    document_name: row.get("document_name"),
                    module_number: row.get("module_number"),
                    text: row.get("text"),
                    score: cosine_similarity(&query_vec, &vector),
                }
            })
            .collect();

        order_hits(&mut hits);
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn list_modules(&self, document_id: &str) -> Result<Vec<ModuleSummary>> {
        let rows = sqlx::query(
            "SELECT module_number, text FROM chunks WHERE document_id = ? ORDER BY module_number ASC",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows
            .iter()
            .map(|row| {
                let text: String = row.get("text");
                ModuleSummary {
                    module_number: row.get("module_number"),
                    preview: preview(&text, MODULE_PREVIEW_CHARS),
                }
            })
            .collect())
    }

    async fn module_text(&self, document_id: &str, module_number: i64) -> Result<Option<String>> {
        let row = sqlx::query(
            "SELECT text FROM chunks WHERE document_id = ? AND module_number = ?",
        )
        .bind(document_id)
        .bind(module_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(|r| r.get("text")))
    }

    async fn delete_document(&self, document_id: &str) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        sqlx::query("DELETE FROM chunk_vectors WHERE document_id = ?")
            .bind(document_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        let deleted = sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(document_id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?
            .rows_affected();

        tx.commit().await.map_err(db_err)?;
        Ok(deleted)
    }
}
