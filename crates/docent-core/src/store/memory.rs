//! In-memory [`IndexStore`] implementation for testing.
//!
//! Records live in a `Vec` behind `std::sync::RwLock`; queries are
//! brute-force cosine similarity over every stored vector. Embedding
//! always happens before the lock is taken, so no guard is ever held
//! across an await point.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::embed::{cosine_similarity, Embedder};
use crate::error::{Result, TutorError};
use crate::models::{preview, ChunkRecord, ModuleSummary, ScoredChunk};

use super::{order_hits, IndexStore, QueryScope, MODULE_PREVIEW_CHARS};

struct StoredRecord {
    chunk: ChunkRecord,
    vector: Vec<f32>,
}

/// In-memory index for tests and local experimentation.
pub struct InMemoryIndex {
    embedder: Arc<dyn Embedder>,
    records: RwLock<Vec<StoredRecord>>,
}

impl InMemoryIndex {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            records: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl IndexStore for InMemoryIndex {
    async fn add(&self, record: &ChunkRecord) -> Result<String> {
        let vector = self.embedder.embed_one(&record.text).await?;
        let mut records = self.records.write().unwrap();
        if records.iter().any(|sr| sr.chunk.record_id == record.record_id) {
            return Err(TutorError::DuplicateRecord(record.record_id.clone()));
        }
        records.push(StoredRecord {
            chunk: record.clone(),
            vector,
        });
        Ok(record.record_id.clone())
    }

    async fn add_batch(&self, batch: &[ChunkRecord]) -> Result<Vec<String>> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }
        let texts: Vec<String> = batch.iter().map(|r| r.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != batch.len() {
            return Err(TutorError::Upstream(
                "embedding backend returned a mismatched vector count".to_string(),
            ));
        }

        let mut records = self.records.write().unwrap();
        for record in batch {
            if records.iter().any(|sr| sr.chunk.record_id == record.record_id) {
                return Err(TutorError::DuplicateRecord(record.record_id.clone()));
            }
        }
        let mut ids = Vec::with_capacity(batch.len());
        for (record, vector) in batch.iter().zip(vectors) {
            ids.push(record.record_id.clone());
            records.push(StoredRecord {
                chunk: record.clone(),
                vector,
            });
        }
        Ok(ids)
    }

    async fn replace_document(&self, document_id: &str, new_records: &[ChunkRecord]) -> Result<()> {
        let texts: Vec<String> = new_records.iter().map(|r| r.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != new_records.len() {
            return Err(TutorError::Upstream(
                "embedding backend returned a mismatched vector count".to_string(),
            ));
        }

        let mut records = self.records.write().unwrap();
        records.retain(|sr| sr.chunk.document_id != document_id);
        for (record, vector) in new_records.iter().zip(vectors) {
            records.push(StoredRecord {
                chunk: record.clone(),
                vector,
            });
        }
        Ok(())
    }

    async fn query(
        &self,
        question: &str,
        scope: QueryScope<'_>,
        top_k: usize,
    ) -> Result<Vec<ScoredChunk>> {
        let query_vec = self.embedder.embed_one(question).await?;
        let records = self.records.read().unwrap();
        let mut hits: Vec<ScoredChunk> = records
            .iter()
            .filter(|sr| {
                sr.chunk.owner_email == scope.owner_email
                    && scope
                        .document_id
                        .map(|doc| sr.chunk.document_id == doc)
                        .unwrap_or(true)
            })
            .map(|sr| ScoredChunk {
                record_id: sr.chunk.record_id.clone(),
                document_id: sr.chunk.document_id.clone(),
                document_name: sr.chunk.document_name.clone(),
                module_number: sr.chunk.module_number,
                text: sr.chunk.text.clone(),
                score: cosine_similarity(&query_vec, &sr.vector),
            })
            .collect();
        order_hits(&mut hits);
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn list_modules(&self, document_id: &str) -> Result<Vec<ModuleSummary>> {
        let records = self.records.read().unwrap();
        let mut modules: Vec<ModuleSummary> = records
            .iter()
            .filter(|sr| sr.chunk.document_id == document_id)
            .map(|sr| ModuleSummary {
                module_number: sr.chunk.module_number,
                preview: preview(&sr.chunk.text, MODULE_PREVIEW_CHARS),
            })
            .collect();
        modules.sort_by_key(|m| m.module_number);
        Ok(modules)
    }

    async fn module_text(&self, document_id: &str, module_number: i64) -> Result<Option<String>> {
        let records = self.records.read().unwrap();
        Ok(records
            .iter()
            .find(|sr| {
                sr.chunk.document_id == document_id && sr.chunk.module_number == module_number
            })
            .map(|sr| sr.chunk.text.clone()))
    }

    async fn delete_document(&self, document_id: &str) -> Result<u64> {
        let mut records = self.records.write().unwrap();
        let before = records.len();
        records.retain(|sr| sr.chunk.document_id != document_id);
        Ok((before - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record_id;

    /// Deterministic test embedder: four dimensions counting keyword
    /// occurrences, plus a constant so no vector is ever zero.
    struct KeywordEmbedder;

    #[async_trait]
    impl Embedder for KeywordEmbedder {
        fn model_name(&self) -> &str {
            "keyword-stub"
        }

        fn dims(&self) -> usize {
            4
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let lower = t.to_lowercase();
                    vec![
                        lower.matches("rust").count() as f32,
                        lower.matches("python").count() as f32,
                        lower.matches("cooking").count() as f32,
                        1.0,
                    ]
                })
                .collect())
        }
    }

    fn record(owner: &str, doc: &str, module: i64, text: &str) -> ChunkRecord {
        ChunkRecord {
            record_id: record_id(doc, module),
            document_id: doc.to_string(),
            module_number: module,
            text: text.to_string(),
            owner_email: owner.to_string(),
            document_name: format!("{}.pdf", doc),
            hash: String::new(),
        }
    }

    fn index() -> InMemoryIndex {
        InMemoryIndex::new(Arc::new(KeywordEmbedder))
    }

    #[tokio::test]
    async fn test_add_and_query() {
        let idx = index();
        idx.add(&record("ada@example.com", "d1", 0, "rust rust ownership"))
            .await
            .unwrap();
        idx.add(&record("ada@example.com", "d1", 1, "python generators"))
            .await
            .unwrap();

        let scope = QueryScope {
            owner_email: "ada@example.com",
            document_id: Some("d1"),
        };
        let hits = idx.query("tell me about rust", scope, 5).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].record_id, "d1_0");
        assert!(hits[0].score > hits[1].score);
    }

    #[tokio::test]
    async fn test_duplicate_record_rejected() {
        let idx = index();
        let r = record("ada@example.com", "d1", 0, "rust traits");
        idx.add(&r).await.unwrap();
        let err = idx.add(&r).await.unwrap_err();
        assert!(matches!(err, TutorError::DuplicateRecord(_)));
    }

    #[tokio::test]
    async fn test_add_batch_is_all_or_nothing() {
        let idx = index();
        idx.add(&record("ada@example.com", "d1", 0, "rust lifetimes"))
            .await
            .unwrap();

        let batch = vec![
            record("ada@example.com", "d1", 0, "rust lifetimes"),
            record("ada@example.com", "d1", 1, "rust closures"),
        ];
        let err = idx.add_batch(&batch).await.unwrap_err();
        assert!(matches!(err, TutorError::DuplicateRecord(_)));

        // The non-duplicate half of the batch must not have landed.
        let modules = idx.list_modules("d1").await.unwrap();
        assert_eq!(modules.len(), 1);
    }

    #[tokio::test]
    async fn test_query_is_scoped_to_owner() {
        let idx = index();
        idx.add(&record("ada@example.com", "d1", 0, "rust ownership"))
            .await
            .unwrap();
        idx.add(&record("mallory@example.com", "d2", 0, "rust ownership"))
            .await
            .unwrap();

        let scope = QueryScope {
            owner_email: "ada@example.com",
            document_id: None,
        };
        let hits = idx.query("rust", scope, 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_id, "d1");
    }

    #[tokio::test]
    async fn test_query_scoped_to_document() {
        let idx = index();
        idx.add(&record("ada@example.com", "d1", 0, "rust ownership"))
            .await
            .unwrap();
        idx.add(&record("ada@example.com", "d2", 0, "rust borrowing"))
            .await
            .unwrap();

        let scope = QueryScope {
            owner_email: "ada@example.com",
            document_id: Some("d2"),
        };
        let hits = idx.query("rust", scope, 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document_id, "d2");
    }

    #[tokio::test]
    async fn test_equal_scores_rank_by_module_number() {
        let idx = index();
        // Same text means identical vectors, so all three tie on score.
        for module in [5, 1, 3] {
            idx.add(&record("ada@example.com", "d1", module, "rust"))
                .await
                .unwrap();
        }
        let scope = QueryScope {
            owner_email: "ada@example.com",
            document_id: Some("d1"),
        };
        let hits = idx.query("rust", scope, 10).await.unwrap();
        let modules: Vec<i64> = hits.iter().map(|h| h.module_number).collect();
        assert_eq!(modules, vec![1, 3, 5]);
    }

    #[tokio::test]
    async fn test_replace_document_swaps_all_records() {
        let idx = index();
        idx.add_batch(&[
            record("ada@example.com", "d1", 0, "old rust text"),
            record("ada@example.com", "d1", 1, "old python text"),
            record("ada@example.com", "d1", 2, "old cooking text"),
        ])
        .await
        .unwrap();

        idx.replace_document(
            "d1",
            &[
                record("ada@example.com", "d1", 0, "new rust text"),
                record("ada@example.com", "d1", 1, "new python text"),
            ],
        )
        .await
        .unwrap();

        let modules = idx.list_modules("d1").await.unwrap();
        assert_eq!(modules.len(), 2);
        let text = idx.module_text("d1", 0).await.unwrap();
        assert_eq!(text.as_deref(), Some("new rust text"));
        assert!(idx.module_text("d1", 2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_modules_sorted_with_previews() {
        let idx = index();
        let long = format!("rust {}", "filler ".repeat(40));
        idx.add(&record("ada@example.com", "d1", 1, &long))
            .await
            .unwrap();
        idx.add(&record("ada@example.com", "d1", 0, "short module"))
            .await
            .unwrap();

        let modules = idx.list_modules("d1").await.unwrap();
        assert_eq!(modules[0].module_number, 0);
        assert_eq!(modules[1].module_number, 1);
        assert!(modules[1].preview.chars().count() <= MODULE_PREVIEW_CHARS);
    }

    #[tokio::test]
    async fn test_delete_document_reports_removed_count() {
        let idx = index();
        idx.add_batch(&[
            record("ada@example.com", "d1", 0, "rust"),
            record("ada@example.com", "d1", 1, "python"),
        ])
        .await
        .unwrap();
        idx.add(&record("ada@example.com", "d2", 0, "cooking"))
            .await
            .unwrap();

        assert_eq!(idx.delete_document("d1").await.unwrap(), 2);
        assert_eq!(idx.delete_document("d1").await.unwrap(), 0);
        assert_eq!(idx.list_modules("d2").await.unwrap().len(), 1);
    }
}
