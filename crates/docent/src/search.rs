//! Owner-wide document search.
//!
//! Unlike [`crate::ask`], which answers inside one document, search
//! fans a query across every indexed record the caller owns and
//! aggregates to one hit per document, best chunk score winning.

use std::collections::HashSet;

use docent_core::models::{preview, DocumentHit};
use docent_core::retrieve::{retrieve, RetrieveRequest};
use docent_core::store::MODULE_PREVIEW_CHARS;
use docent_core::traits::TokenVerifier;
use docent_core::{Result, TutorError};

use crate::config::Config;
use crate::runtime::Runtime;

/// Chunk candidates fetched before per-document aggregation.
const CANDIDATE_POOL: usize = 50;

pub async fn search_documents(rt: &Runtime, token: &str, query: &str) -> Result<Vec<DocumentHit>> {
    let identity = rt.verifier.verify(token).await?;

    if query.trim().is_empty() {
        return Err(TutorError::Validation(
            "search query must not be empty".to_string(),
        ));
    }

    let request = RetrieveRequest {
        question: query,
        owner_email: &identity.email,
        document_id: None,
        top_k: CANDIDATE_POOL,
        min_score: rt.config.retrieval.min_score,
    };
    let hits = retrieve(&rt.index, &request).await?;

    // Hits arrive best-first, so the first chunk seen for a document is
    // that document's best match.
    let mut seen: HashSet<String> = HashSet::new();
    let mut results = Vec::new();
    for hit in hits {
        if seen.insert(hit.document_id.clone()) {
            results.push(DocumentHit {
                document_id: hit.document_id,
                document_name: hit.document_name,
                preview: preview(&hit.text, MODULE_PREVIEW_CHARS),
                score: hit.score,
            });
        }
    }
    Ok(results)
}

pub async fn run_search(config: &Config, query: &str, token: &str) -> anyhow::Result<()> {
    let rt = Runtime::open(config).await?;
    let hits = search_documents(&rt, token, query).await?;

    if hits.is_empty() {
        println!("No results.");
    } else {
        for (i, hit) in hits.iter().enumerate() {
            println!("{}. [{:.2}] {}", i + 1, hit.score, hit.document_name);
            println!("    excerpt: \"{}\"", hit.preview);
            println!("    id: {}", hit.document_id);
            println!();
        }
    }

    rt.close().await;
    Ok(())
}
