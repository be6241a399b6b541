//! Core data models for the ingestion and answering pipeline.
//!
//! These types represent the documents, index records, and responses that
//! flow between extraction, chunking, the index store, retrieval, and
//! answer composition.

use serde::{Deserialize, Serialize};

/// A document accepted for ingestion, before it has been persisted.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub id: String,
    pub owner_email: String,
    pub name: String,
    pub content_type: String,
    pub body: String,
    pub created_at: i64,
}

/// A persisted document row.
///
/// `indexed` records whether phase two of ingestion (embedding and index
/// writes) completed; `modules` is the number of index records the body
/// chunked into, zero until indexing succeeds.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub id: String,
    pub owner_email: String,
    pub name: String,
    pub content_type: String,
    pub body: String,
    pub storage_url: Option<String>,
    pub created_at: i64,
    pub indexed: bool,
    pub modules: i64,
}

/// One chunk of a document's body, addressed by its composite record id.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    pub record_id: String,
    pub document_id: String,
    pub module_number: i64,
    pub text: String,
    pub owner_email: String,
    pub document_name: String,
    pub hash: String,
}

/// An index record scored against a query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub record_id: String,
    pub document_id: String,
    pub document_name: String,
    pub module_number: i64,
    pub text: String,
    pub score: f32,
}

/// A module listing entry: position plus a short text preview.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleSummary {
    pub module_number: i64,
    pub preview: String,
}

/// The structured payload a generation provider is asked to produce,
/// and the shape every answer is normalized into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedAnswer {
    pub answer: String,
    #[serde(default)]
    pub supporting_texts: Vec<String>,
}

/// Full response to a question, ready for serialization to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerResponse {
    pub answer: String,
    pub supporting_texts: Vec<String>,
    pub emotion: String,
    pub mode: String,
    pub document_id: String,
    pub audio_url: Option<String>,
}

/// Outcome of an ingestion request.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReceipt {
    pub status: String,
    pub message: String,
    pub document_id: String,
    pub document_url: Option<String>,
    pub indexed: bool,
    pub modules: i64,
}

/// Best-scoring match for a document in an owner-wide search.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentHit {
    pub document_id: String,
    pub document_name: String,
    pub preview: String,
    pub score: f32,
}

/// The authenticated caller, as established by a token verifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub email: String,
}

/// Composite id of an index record: the owning document plus the module's
/// position within it. Re-ingesting the same document produces the same
/// ids, which is what makes duplicate detection possible at the store.
pub fn record_id(document_id: &str, module_number: i64) -> String {
    format!("{}_{}", document_id, module_number)
}

/// First `max_chars` characters of `text`, on a char boundary, with
/// newlines flattened so previews stay single-line.
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat: String = text
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .take(max_chars)
        .collect();
    flat.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_format() {
        assert_eq!(record_id("doc-42", 0), "doc-42_0");
        assert_eq!(record_id("doc-42", 17), "doc-42_17");
    }

    #[test]
    fn test_preview_truncates_and_flattens() {
        let text = "first line\nsecond line\nthird";
        let p = preview(text, 100);
        assert!(!p.contains('\n'));
        assert!(p.starts_with("first line second line"));

        let long = "x".repeat(500);
        assert_eq!(preview(&long, 100).len(), 100);
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        // Multi-byte characters must not be split.
        let text = "héllo wörld ".repeat(50);
        let p = preview(&text, 100);
        assert_eq!(p.chars().count(), 100);
    }

    #[test]
    fn test_composed_answer_supporting_texts_default() {
        let parsed: ComposedAnswer = serde_json::from_str(r#"{"answer": "just text"}"#).unwrap();
        assert_eq!(parsed.answer, "just text");
        assert!(parsed.supporting_texts.is_empty());
    }
}
