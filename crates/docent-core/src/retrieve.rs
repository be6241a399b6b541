//! Scoped retrieval over the index store.
//!
//! Thin layer between question answering and [`IndexStore::query`]: it
//! builds the visibility scope, caps the result count, and drops hits
//! below the relevance floor. Deciding what an *empty* result means is
//! left to the caller; answering treats it as not-found while owner-wide
//! search treats it as an ordinary empty list.

use crate::error::Result;
use crate::models::ScoredChunk;
use crate::store::{IndexStore, QueryScope};

/// Default number of modules retrieved per question.
pub const DEFAULT_TOP_K: usize = 5;

/// A retrieval request, fully scoped.
#[derive(Debug, Clone)]
pub struct RetrieveRequest<'a> {
    pub question: &'a str,
    pub owner_email: &'a str,
    pub document_id: Option<&'a str>,
    pub top_k: usize,
    pub min_score: f32,
}

/// Retrieve the best-matching modules for a question.
///
/// Results come back in canonical order (score descending, module
/// number ascending on ties) with everything below `min_score` removed.
pub async fn retrieve(store: &dyn IndexStore, req: &RetrieveRequest<'_>) -> Result<Vec<ScoredChunk>> {
    let scope = QueryScope {
        owner_email: req.owner_email,
        document_id: req.document_id,
    };
    let hits = store.query(req.question, scope, req.top_k).await?;
    Ok(hits.into_iter().filter(|h| h.score >= req.min_score).collect())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::embed::Embedder;
    use crate::models::{record_id, ChunkRecord};
    use crate::store::memory::InMemoryIndex;

    /// Embeds to a two-dimensional vector: occurrences of "ownership"
    /// and occurrences of "garnish".
    struct TwoTopicEmbedder;

    #[async_trait]
    impl Embedder for TwoTopicEmbedder {
        fn model_name(&self) -> &str {
            "two-topic-stub"
        }

        fn dims(&self) -> usize {
            2
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    let lower = t.to_lowercase();
                    vec![
                        lower.matches("ownership").count() as f32,
                        lower.matches("garnish").count() as f32,
                    ]
                })
                .collect())
        }
    }

    fn record(module: i64, text: &str) -> ChunkRecord {
        ChunkRecord {
            record_id: record_id("d1", module),
            document_id: "d1".to_string(),
            module_number: module,
            text: text.to_string(),
            owner_email: "ada@example.com".to_string(),
            document_name: "notes.pdf".to_string(),
            hash: String::new(),
        }
    }

    async fn seeded_index() -> InMemoryIndex {
        let idx = InMemoryIndex::new(Arc::new(TwoTopicEmbedder));
        idx.add_batch(&[
            record(0, "ownership moves values between bindings"),
            record(1, "ownership ownership and borrowing interact"),
            record(2, "garnish the plate before serving"),
        ])
        .await
        .unwrap();
        idx
    }

    fn request<'a>(question: &'a str, min_score: f32, top_k: usize) -> RetrieveRequest<'a> {
        RetrieveRequest {
            question,
            owner_email: "ada@example.com",
            document_id: Some("d1"),
            top_k,
            min_score,
        }
    }

    #[tokio::test]
    async fn test_retrieve_filters_below_min_score() {
        let idx = seeded_index().await;
        let hits = retrieve(&idx, &request("ownership", 0.5, 5)).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.score >= 0.5));
        assert!(hits.iter().all(|h| h.text.contains("ownership")));
    }

    #[tokio::test]
    async fn test_retrieve_respects_top_k() {
        let idx = seeded_index().await;
        let hits = retrieve(&idx, &request("ownership", 0.0, 1)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].module_number, 0);
    }

    #[tokio::test]
    async fn test_retrieve_can_come_back_empty() {
        let idx = seeded_index().await;
        // A question with no overlap embeds to the zero vector, which
        // scores 0.0 against everything.
        let hits = retrieve(&idx, &request("quantum tunneling", 0.25, 5))
            .await
            .unwrap();
        assert!(hits.is_empty());
    }
}
