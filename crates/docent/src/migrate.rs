use anyhow::Result;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(&config.db).await?;

    // Documents table. One row per upload; `indexed` records whether
    // phase two of ingestion completed. Name uniqueness per owner is a
    // constraint here, not an application-level check, so two racing
    // uploads of the same name cannot both land.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            owner_email TEXT NOT NULL,
            name TEXT NOT NULL,
            content_type TEXT NOT NULL,
            body TEXT NOT NULL,
            storage_url TEXT,
            created_at INTEGER NOT NULL,
            indexed INTEGER NOT NULL DEFAULT 0,
            modules INTEGER NOT NULL DEFAULT 0,
            UNIQUE(owner_email, name)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Index records. The primary key is the composite record id
    // `{document_id}_{module_number}`; re-adding the same module is a
    // constraint violation, which the store surfaces as a duplicate.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            record_id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL,
            module_number INTEGER NOT NULL,
            text TEXT NOT NULL,
            owner_email TEXT NOT NULL,
            document_name TEXT NOT NULL,
            hash TEXT NOT NULL,
            UNIQUE(document_id, module_number),
            FOREIGN KEY (document_id) REFERENCES documents(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Embedding vectors, one per index record, stored as little-endian
    // f32 BLOBs.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunk_vectors (
            record_id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL,
            embedding BLOB NOT NULL,
            model TEXT NOT NULL,
            dims INTEGER NOT NULL,
            FOREIGN KEY (record_id) REFERENCES chunks(record_id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(&pool)
    .await?;

    // Indexes for the two hot lookups: an owner's documents, and a
    // document's records.
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_owner ON documents(owner_email)")
        .execute(&pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_owner ON chunks(owner_email)")
        .execute(&pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_document ON chunks(document_id)")
        .execute(&pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_vectors_document ON chunk_vectors(document_id)")
        .execute(&pool)
        .await?;

    pool.close().await;
    Ok(())
}
