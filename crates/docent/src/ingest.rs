//! Document ingestion, re-indexing, deletion, and listing.
//!
//! Ingestion is two-phase. Phase one parses the upload and persists the
//! document row plus the original file; it either completes or leaves
//! nothing behind. Phase two chunks the text and writes index records;
//! it is retryable, and its failure handling follows
//! `ingestion.on_index_failure`: `defer` reports success with
//! `indexed = false` so the document can be re-indexed later, `fail`
//! surfaces the error while keeping the stored document.

use std::path::Path;

use chrono::Utc;
use uuid::Uuid;

use docent_core::chunk::chunk_document;
use docent_core::models::{DocumentRecord, IngestReceipt, NewDocument};
use docent_core::store::IndexStore;
use docent_core::traits::{DocumentStorage, TokenVerifier};
use docent_core::{Result, TutorError};

use crate::config::Config;
use crate::extract::{self, DocumentFormat};
use crate::runtime::Runtime;

/// Ingest an uploaded file for the token's owner.
pub async fn ingest_document(
    rt: &Runtime,
    token: &str,
    file_name: &str,
    display_name: Option<&str>,
    bytes: &[u8],
) -> Result<IngestReceipt> {
    let identity = rt.verifier.verify(token).await?;

    let name = display_name.unwrap_or(file_name).trim();
    if name.is_empty() {
        return Err(TutorError::Validation(
            "document name must not be empty".to_string(),
        ));
    }
    if bytes.is_empty() {
        return Err(TutorError::Validation(
            "uploaded file is empty".to_string(),
        ));
    }
    let format = DocumentFormat::from_file_name(file_name).ok_or_else(|| {
        TutorError::Validation(format!(
            "unsupported file type for '{}': only .pdf and .docx are accepted",
            file_name
        ))
    })?;

    let text = extract::extract_text(bytes, format).map_err(|e| {
        tracing::warn!("extraction failed for '{}': {}", file_name, e);
        TutorError::Unparsable(e.to_string())
    })?;
    if text.trim().is_empty() {
        return Err(TutorError::EmptyDocument);
    }

    let document = NewDocument {
        id: Uuid::new_v4().to_string(),
        owner_email: identity.email,
        name: name.to_string(),
        content_type: format.content_type().to_string(),
        body: text,
        created_at: Utc::now().timestamp(),
    };

    // Phase one. The row insert carries the (owner, name) uniqueness
    // check, so it goes first: a Conflict aborts before any file write.
    rt.storage.record_document(&document).await?;

    let object_name = format!("{}_{}", document.id, file_name);
    let url = match rt.storage.store_file(bytes, &object_name).await {
        Ok(url) => url,
        Err(err) => {
            // Undo the row so the name is not claimed by a half-stored
            // upload.
            if let Err(del) = rt.storage.delete_document(&document.id).await {
                tracing::warn!("rollback of document {} failed: {}", document.id, del);
            }
            return Err(err);
        }
    };
    rt.storage.set_storage_url(&document.id, &url).await?;

    // Phase two.
    let records = chunk_document(&document, &rt.chunker());
    let modules = records.len() as i64;
    match rt.index.add_batch(&records).await {
        Ok(_) => {
            rt.storage.set_indexed(&document.id, true, modules).await?;
            Ok(IngestReceipt {
                status: "success".to_string(),
                message: format!("document ingested and indexed into {} modules", modules),
                document_id: document.id,
                document_url: Some(url),
                indexed: true,
                modules,
            })
        }
        // The records are already present from an earlier attempt, so
        // indexing is effectively complete.
        Err(TutorError::DuplicateRecord(_)) => {
            rt.storage.set_indexed(&document.id, true, modules).await?;
            Ok(IngestReceipt {
                status: "success".to_string(),
                message: format!("document already indexed ({} modules)", modules),
                document_id: document.id,
                document_url: Some(url),
                indexed: true,
                modules,
            })
        }
        Err(err) if rt.config.ingestion.on_index_failure == "defer" => {
            tracing::warn!(
                "indexing failed for document {}: {}; stored unindexed",
                document.id,
                err
            );
            Ok(IngestReceipt {
                status: "success".to_string(),
                message: "document stored; indexing deferred (run reindex to retry)".to_string(),
                document_id: document.id,
                document_url: Some(url),
                indexed: false,
                modules: 0,
            })
        }
        Err(err) => Err(err),
    }
}

/// Re-run indexing for a stored document, replacing any existing
/// records atomically.
pub async fn reindex_document(
    rt: &Runtime,
    token: &str,
    document_id: &str,
) -> Result<IngestReceipt> {
    let identity = rt.verifier.verify(token).await?;

    let document = fetch_owned(rt, &identity.email, document_id).await?;

    let seed = NewDocument {
        id: document.id.clone(),
        owner_email: document.owner_email.clone(),
        name: document.name.clone(),
        content_type: document.content_type.clone(),
        body: document.body.clone(),
        created_at: document.created_at,
    };
    let records = chunk_document(&seed, &rt.chunker());
    if records.is_empty() {
        return Err(TutorError::EmptyDocument);
    }

    let modules = records.len() as i64;
    rt.index.replace_document(&document.id, &records).await?;
    rt.storage.set_indexed(&document.id, true, modules).await?;

    Ok(IngestReceipt {
        status: "success".to_string(),
        message: format!("document re-indexed into {} modules", modules),
        document_id: document.id,
        document_url: document.storage_url,
        indexed: true,
        modules,
    })
}

/// Delete a document and everything derived from it: index records
/// first, then the stored file and row.
pub async fn delete_document(rt: &Runtime, token: &str, document_id: &str) -> Result<u64> {
    let identity = rt.verifier.verify(token).await?;

    fetch_owned(rt, &identity.email, document_id).await?;

    let removed = rt.index.delete_document(document_id).await?;
    rt.storage.delete_document(document_id).await?;
    Ok(removed)
}

/// List the owner's documents, newest first.
pub async fn list_documents(rt: &Runtime, token: &str) -> Result<Vec<DocumentRecord>> {
    let identity = rt.verifier.verify(token).await?;
    rt.storage.list_documents(&identity.email).await
}

/// Fetch a document and require it to belong to `owner_email`. A
/// document owned by someone else reads as absent, never as forbidden.
pub(crate) async fn fetch_owned(
    rt: &Runtime,
    owner_email: &str,
    document_id: &str,
) -> Result<DocumentRecord> {
    let document = rt
        .storage
        .get_document(document_id)
        .await?
        .filter(|d| d.owner_email == owner_email);
    document.ok_or_else(|| TutorError::NotFound(format!("document not found: {}", document_id)))
}

pub async fn run_ingest(
    config: &Config,
    file: &Path,
    name: Option<&str>,
    token: &str,
) -> anyhow::Result<()> {
    use anyhow::Context;

    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read file: {}", file.display()))?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| file.display().to_string());

    let rt = Runtime::open(config).await?;
    let receipt = ingest_document(&rt, token, &file_name, name, &bytes).await?;

    println!("ingest {}", file.display());
    println!("  document id: {}", receipt.document_id);
    if let Some(url) = &receipt.document_url {
        println!("  stored at: {}", url);
    }
    println!("  indexed: {} ({} modules)", receipt.indexed, receipt.modules);
    println!("  {}", receipt.message);
    println!("ok");

    rt.close().await;
    Ok(())
}

pub async fn run_reindex(config: &Config, document_id: &str, token: &str) -> anyhow::Result<()> {
    let rt = Runtime::open(config).await?;
    let receipt = reindex_document(&rt, token, document_id).await?;

    println!("reindex {}", document_id);
    println!("  indexed: {} ({} modules)", receipt.indexed, receipt.modules);
    println!("ok");

    rt.close().await;
    Ok(())
}

pub async fn run_delete(config: &Config, document_id: &str, token: &str) -> anyhow::Result<()> {
    let rt = Runtime::open(config).await?;
    let removed = delete_document(&rt, token, document_id).await?;

    println!("delete {}", document_id);
    println!("  index records removed: {}", removed);
    println!("ok");

    rt.close().await;
    Ok(())
}

pub async fn run_documents(config: &Config, token: &str) -> anyhow::Result<()> {
    let rt = Runtime::open(config).await?;
    let documents = list_documents(&rt, token).await?;

    if documents.is_empty() {
        println!("No documents. Ingest one with `docent ingest <file> --token <token>`.");
    } else {
        println!("Documents ({}):\n", documents.len());
        for doc in &documents {
            let status = if doc.indexed {
                format!("indexed, {} modules", doc.modules)
            } else {
                "not indexed".to_string()
            };
            println!("  {}  {} ({})", doc.id, doc.name, status);
        }
    }

    rt.close().await;
    Ok(())
}
