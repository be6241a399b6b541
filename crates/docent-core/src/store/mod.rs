//! Index store abstraction.
//!
//! The [`IndexStore`] trait defines every operation the pipeline needs
//! from the vector index, enabling pluggable backends: the SQLite store
//! in the app crate for production, [`memory::InMemoryIndex`] for tests.
//!
//! Two rules hold for every implementation:
//!
//! - Adding a record whose id already exists fails with
//!   [`TutorError::DuplicateRecord`](crate::TutorError::DuplicateRecord)
//!   rather than overwriting; ingestion relies on that to stay
//!   idempotent.
//! - Every query is scoped to an owner. There is no unscoped read path,
//!   so one user's modules can never surface in another user's results.

pub mod memory;

use std::cmp::Ordering;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ChunkRecord, ModuleSummary, ScoredChunk};

/// Characters of module text shown in listing previews.
pub const MODULE_PREVIEW_CHARS: usize = 100;

/// Visibility scope for a query: always one owner, optionally narrowed
/// to one of their documents.
#[derive(Debug, Clone, Copy)]
pub struct QueryScope<'a> {
    pub owner_email: &'a str,
    pub document_id: Option<&'a str>,
}

/// Abstract vector index over chunked document modules.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Embed and insert one record. Returns its record id.
    async fn add(&self, record: &ChunkRecord) -> Result<String>;

    /// Embed and insert a batch of records, all or nothing: embedding
    /// happens before any write, and a duplicate anywhere in the batch
    /// leaves the index unchanged.
    async fn add_batch(&self, records: &[ChunkRecord]) -> Result<Vec<String>>;

    /// Atomically replace every record of a document with `records`.
    /// A reader never observes the document half-indexed.
    async fn replace_document(&self, document_id: &str, records: &[ChunkRecord]) -> Result<()>;

    /// Embed `question` and return the best-scoring records inside
    /// `scope`, ordered by [`order_hits`], at most `top_k` of them.
    async fn query(
        &self,
        question: &str,
        scope: QueryScope<'_>,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>>;

    /// List a document's modules in position order, with short previews.
    async fn list_modules(&self, document_id: &str) -> Result<Vec<ModuleSummary>>;

    /// Full text of one module, or `None` when the document has no
    /// module at that position.
    async fn module_text(&self, document_id: &str, module_number: i64) -> Result<Option<String>>;

    /// Remove every record of a document. Returns how many were removed.
    async fn delete_document(&self, document_id: &str) -> Result<u64>;
}

/// Canonical result ordering: score descending, then module number
/// ascending so equal-scoring modules rank in document order. Total and
/// deterministic even in the presence of NaN scores.
pub fn order_hits(hits: &mut [ScoredChunk]) {
    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.module_number.cmp(&b.module_number))
    });
}
