//! End-to-end pipeline tests against a real SQLite database.
//!
//! The network providers are replaced with deterministic stubs: an
//! embedder that counts keywords, so similarity scores are exact, and
//! scripted generators. Everything else (storage, index, migrations,
//! auth) is the real code path.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;

use docent::auth::HmacVerifier;
use docent::config::{AuthConfig, ChunkingConfig, Config, DbConfig, StorageConfig};
use docent::runtime::Runtime;
use docent::sqlite_store::SqliteIndexStore;
use docent::storage::LocalStorage;
use docent::{ask, db, ingest, migrate, modules, search};
use docent_core::answer::FALLBACK_ANSWER;
use docent_core::embed::Embedder;
use docent_core::models::record_id;
use docent_core::store::IndexStore;
use docent_core::traits::{Generator, SpeechSynthesizer};
use docent_core::{Result, TutorError};

const SECRET: &str = "pipeline-test-secret";

/// Embeds text as counts of four fixed keywords. Texts sharing a
/// keyword get a positive cosine score; texts sharing none score zero
/// and fall below any positive `min_score`.
struct KeywordEmbedder;

const KEYWORDS: [&str; 4] = ["ownership", "borrow", "lifetime", "trait"];

impl KeywordEmbedder {
    fn vector_for(text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        KEYWORDS
            .iter()
            .map(|k| lower.matches(k).count() as f32)
            .collect()
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn model_name(&self) -> &str {
        "keyword-stub"
    }

    fn dims(&self) -> usize {
        KEYWORDS.len()
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::vector_for(t)).collect())
    }
}

struct ScriptedGenerator(String);

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Ok(self.0.clone())
    }
}

struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(TutorError::Upstream(
            "model endpoint unreachable".to_string(),
        ))
    }
}

struct StubSynthesizer;

#[async_trait]
impl SpeechSynthesizer for StubSynthesizer {
    async fn synthesize(&self, _text: &str, emotion: &str) -> Result<String> {
        Ok(format!("https://audio.test/{}.mp3", emotion))
    }
}

struct FailingSynthesizer;

#[async_trait]
impl SpeechSynthesizer for FailingSynthesizer {
    async fn synthesize(&self, _text: &str, _emotion: &str) -> Result<String> {
        Err(TutorError::Upstream("voice backend down".to_string()))
    }
}

fn test_config(root: &Path) -> Config {
    Config {
        db: DbConfig {
            path: root.join("data/docent.db"),
        },
        storage: StorageConfig {
            root: root.join("data/files"),
        },
        chunking: Default::default(),
        retrieval: Default::default(),
        embedding: Default::default(),
        generation: Default::default(),
        auth: AuthConfig {
            secret: SECRET.to_string(),
        },
        ingestion: Default::default(),
    }
}

async fn open_runtime_with(config: Config, generator: Arc<dyn Generator>) -> Runtime {
    migrate::run_migrations(&config).await.unwrap();
    let pool = db::connect(&config.db).await.unwrap();
    Runtime {
        storage: LocalStorage::new(pool.clone(), config.storage.root.clone()),
        index: SqliteIndexStore::new(pool.clone(), Arc::new(KeywordEmbedder)),
        verifier: HmacVerifier::new(SECRET),
        generator,
        config,
        pool,
    }
}

async fn open_runtime(root: &Path, generator: Arc<dyn Generator>) -> Runtime {
    open_runtime_with(test_config(root), generator).await
}

fn token(email: &str) -> String {
    HmacVerifier::new(SECRET).mint_token(email)
}

fn minimal_docx(paragraphs: &[&str]) -> Vec<u8> {
    use std::io::Write;

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut zip = zip::ZipWriter::new(&mut cursor);
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("word/document.xml", options).unwrap();
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", p))
            .collect();
        let xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
             <w:body>{}</w:body></w:document>",
            body
        );
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap();
    }
    cursor.into_inner()
}

const STUDY_PARAGRAPHS: &[&str] = &[
    "Ownership is the compiler's rule that every value has a single owner, \
     and ownership moves when a value is assigned.",
    "Borrowing lets code use a value without taking ownership, so a borrow \
     never outlives the owner.",
    "A lifetime names the region of code where a borrow stays valid.",
];

async fn ingest_study_notes(rt: &Runtime, token: &str, name: &str) -> String {
    let bytes = minimal_docx(STUDY_PARAGRAPHS);
    let receipt = ingest::ingest_document(rt, token, "study.docx", Some(name), &bytes)
        .await
        .unwrap();
    assert!(receipt.indexed, "ingest should index with the stub embedder");
    receipt.document_id
}

fn scripted_answer() -> Arc<dyn Generator> {
    Arc::new(ScriptedGenerator(
        r#"{"answer": "Every value has exactly one owner.", "supporting_texts": ["every value has a single owner"]}"#
            .to_string(),
    ))
}

#[tokio::test]
async fn test_ingest_indexes_document() {
    let tmp = TempDir::new().unwrap();
    let rt = open_runtime(tmp.path(), scripted_answer()).await;
    let ada = token("ada@example.com");

    let bytes = minimal_docx(STUDY_PARAGRAPHS);
    let receipt = ingest::ingest_document(&rt, &ada, "study.docx", Some("Rust Notes"), &bytes)
        .await
        .unwrap();

    assert_eq!(receipt.status, "success");
    assert!(receipt.indexed);
    assert!(receipt.modules >= 1);
    let url = receipt.document_url.as_deref().unwrap();
    assert!(url.starts_with("file://"), "got: {}", url);

    // The original upload is on disk under the storage root.
    let stored = tmp
        .path()
        .join("data/files")
        .join(format!("{}_study.docx", receipt.document_id));
    assert!(stored.exists());

    rt.close().await;
}

#[tokio::test]
async fn test_ask_returns_scripted_answer() {
    let tmp = TempDir::new().unwrap();
    let rt = open_runtime(tmp.path(), scripted_answer()).await;
    let ada = token("ada@example.com");
    let document_id = ingest_study_notes(&rt, &ada, "Rust Notes").await;

    let response = ask::answer_question(&rt, &ada, "What is ownership?", &document_id, "neutral", None)
        .await
        .unwrap();

    assert_eq!(response.answer, "Every value has exactly one owner.");
    assert_eq!(
        response.supporting_texts,
        vec!["every value has a single owner".to_string()]
    );
    assert_eq!(response.mode, "text");
    assert_eq!(response.emotion, "neutral");
    assert_eq!(response.document_id, document_id);
    assert!(response.audio_url.is_none());

    rt.close().await;
}

#[tokio::test]
async fn test_ask_unrelated_question_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let rt = open_runtime(tmp.path(), scripted_answer()).await;
    let ada = token("ada@example.com");
    let document_id = ingest_study_notes(&rt, &ada, "Rust Notes").await;

    let err = ask::answer_question(
        &rt,
        &ada,
        "Tell me about photosynthesis in plants.",
        &document_id,
        "neutral",
        None,
    )
    .await
    .unwrap_err();

    match err {
        TutorError::NotFound(msg) => assert!(msg.contains("no relevant content"), "got: {}", msg),
        other => panic!("expected NotFound, got {:?}", other),
    }

    rt.close().await;
}

#[tokio::test]
async fn test_generation_failure_degrades_to_fallback() {
    let tmp = TempDir::new().unwrap();
    let rt = open_runtime(tmp.path(), Arc::new(FailingGenerator)).await;
    let ada = token("ada@example.com");
    let document_id = ingest_study_notes(&rt, &ada, "Rust Notes").await;

    let response = ask::answer_question(&rt, &ada, "What is ownership?", &document_id, "neutral", None)
        .await
        .unwrap();

    assert_eq!(response.answer, FALLBACK_ANSWER);
    assert!(response.supporting_texts.is_empty());
    assert_eq!(response.mode, "text");

    rt.close().await;
}

#[tokio::test]
async fn test_answers_are_scoped_to_owner() {
    let tmp = TempDir::new().unwrap();
    let rt = open_runtime(tmp.path(), scripted_answer()).await;
    let ada = token("ada@example.com");
    let eve = token("eve@example.com");
    let document_id = ingest_study_notes(&rt, &ada, "Ada's Notes").await;

    // Someone else's document reads as absent.
    let err = ask::answer_question(&rt, &eve, "What is ownership?", &document_id, "neutral", None)
        .await
        .unwrap_err();
    assert!(matches!(err, TutorError::NotFound(_)), "got {:?}", err);

    let ada_documents = ingest::list_documents(&rt, &ada).await.unwrap();
    assert_eq!(ada_documents.len(), 1);
    let eve_documents = ingest::list_documents(&rt, &eve).await.unwrap();
    assert!(eve_documents.is_empty());

    rt.close().await;
}

#[tokio::test]
async fn test_high_min_score_filters_weak_matches() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(tmp.path());
    config.retrieval.min_score = 0.99;
    let rt = open_runtime_with(config, scripted_answer()).await;
    let ada = token("ada@example.com");
    let document_id = ingest_study_notes(&rt, &ada, "Rust Notes").await;

    // "ownership" matches, but not at 0.99 cosine against the mixed
    // keyword counts of the document.
    let err = ask::answer_question(&rt, &ada, "What is ownership?", &document_id, "neutral", None)
        .await
        .unwrap_err();
    assert!(matches!(err, TutorError::NotFound(_)), "got {:?}", err);

    rt.close().await;
}

#[tokio::test]
async fn test_voice_mode_attaches_audio_url() {
    let tmp = TempDir::new().unwrap();
    let rt = open_runtime(tmp.path(), scripted_answer()).await;
    let ada = token("ada@example.com");
    let document_id = ingest_study_notes(&rt, &ada, "Rust Notes").await;

    let response = ask::answer_question(
        &rt,
        &ada,
        "What is ownership?",
        &document_id,
        "cheerful",
        Some(&StubSynthesizer),
    )
    .await
    .unwrap();

    assert_eq!(response.mode, "voice");
    assert_eq!(
        response.audio_url.as_deref(),
        Some("https://audio.test/cheerful.mp3")
    );

    rt.close().await;
}

#[tokio::test]
async fn test_synthesis_failure_falls_back_to_text() {
    let tmp = TempDir::new().unwrap();
    let rt = open_runtime(tmp.path(), scripted_answer()).await;
    let ada = token("ada@example.com");
    let document_id = ingest_study_notes(&rt, &ada, "Rust Notes").await;

    let response = ask::answer_question(
        &rt,
        &ada,
        "What is ownership?",
        &document_id,
        "cheerful",
        Some(&FailingSynthesizer),
    )
    .await
    .unwrap();

    // The answer still goes out, just without audio.
    assert_eq!(response.mode, "text");
    assert!(response.audio_url.is_none());
    assert_eq!(response.answer, "Every value has exactly one owner.");

    rt.close().await;
}

#[tokio::test]
async fn test_modules_listing_and_text() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(tmp.path());
    config.chunking = ChunkingConfig {
        max_chars: 80,
        overlap_chars: 10,
    };
    let rt = open_runtime_with(config, scripted_answer()).await;
    let ada = token("ada@example.com");

    let bytes = minimal_docx(STUDY_PARAGRAPHS);
    let receipt = ingest::ingest_document(&rt, &ada, "study.docx", Some("Rust Notes"), &bytes)
        .await
        .unwrap();
    assert!(receipt.modules >= 2, "small windows should yield several modules");

    let listing = modules::list_modules(&rt, &ada, &receipt.document_id)
        .await
        .unwrap();
    assert_eq!(listing.len() as i64, receipt.modules);
    for (position, summary) in listing.iter().enumerate() {
        assert_eq!(summary.module_number, position as i64);
        assert!(!summary.preview.is_empty());
    }

    let first = modules::get_module(&rt, &ada, &receipt.document_id, 0)
        .await
        .unwrap();
    assert!(first.contains("Ownership"), "got: {}", first);

    let err = modules::get_module(&rt, &ada, &receipt.document_id, 99)
        .await
        .unwrap_err();
    assert!(matches!(err, TutorError::NotFound(_)), "got {:?}", err);

    rt.close().await;
}

#[tokio::test]
async fn test_reindex_rebuilds_modules() {
    let tmp = TempDir::new().unwrap();
    let mut config = test_config(tmp.path());
    config.chunking = ChunkingConfig {
        max_chars: 80,
        overlap_chars: 10,
    };
    let rt = open_runtime_with(config, scripted_answer()).await;
    let ada = token("ada@example.com");

    let bytes = minimal_docx(STUDY_PARAGRAPHS);
    let receipt = ingest::ingest_document(&rt, &ada, "study.docx", Some("Rust Notes"), &bytes)
        .await
        .unwrap();

    // Same body, same chunker: reindex lands on the same module count
    // instead of stacking duplicates.
    let reindexed = ingest::reindex_document(&rt, &ada, &receipt.document_id)
        .await
        .unwrap();
    assert!(reindexed.indexed);
    assert_eq!(reindexed.modules, receipt.modules);

    let listing = modules::list_modules(&rt, &ada, &receipt.document_id)
        .await
        .unwrap();
    assert_eq!(listing.len() as i64, receipt.modules);

    rt.close().await;
}

#[tokio::test]
async fn test_duplicate_record_rejected_at_store() {
    let tmp = TempDir::new().unwrap();
    let rt = open_runtime(tmp.path(), scripted_answer()).await;
    let ada = token("ada@example.com");
    let document_id = ingest_study_notes(&rt, &ada, "Rust Notes").await;

    let duplicate = docent_core::models::ChunkRecord {
        record_id: record_id(&document_id, 0),
        document_id: document_id.clone(),
        module_number: 0,
        text: "replay of module zero".to_string(),
        owner_email: "ada@example.com".to_string(),
        document_name: "Rust Notes".to_string(),
        hash: "replay".to_string(),
    };
    let err = rt.index.add(&duplicate).await.unwrap_err();
    assert!(matches!(err, TutorError::DuplicateRecord(_)), "got {:?}", err);

    rt.close().await;
}

#[tokio::test]
async fn test_search_finds_best_document() {
    let tmp = TempDir::new().unwrap();
    let rt = open_runtime(tmp.path(), scripted_answer()).await;
    let ada = token("ada@example.com");
    let eve = token("eve@example.com");

    ingest_study_notes(&rt, &ada, "Ownership Notes").await;
    let trait_bytes = minimal_docx(&[
        "A trait describes shared behavior that many types can implement.",
        "Trait objects enable dynamic dispatch through a vtable.",
    ]);
    ingest::ingest_document(&rt, &ada, "traits.docx", Some("Trait Notes"), &trait_bytes)
        .await
        .unwrap();

    let hits = search::search_documents(&rt, &ada, "trait").await.unwrap();
    assert_eq!(hits.len(), 1, "the ownership notes share no keyword");
    assert_eq!(hits[0].document_name, "Trait Notes");
    assert!(hits[0].score > 0.9, "got score {}", hits[0].score);
    assert!(!hits[0].preview.is_empty());

    // Another owner sees nothing.
    let hits = search::search_documents(&rt, &eve, "trait").await.unwrap();
    assert!(hits.is_empty());

    rt.close().await;
}

#[tokio::test]
async fn test_delete_removes_records_and_file() {
    let tmp = TempDir::new().unwrap();
    let rt = open_runtime(tmp.path(), scripted_answer()).await;
    let ada = token("ada@example.com");

    let bytes = minimal_docx(STUDY_PARAGRAPHS);
    let receipt = ingest::ingest_document(&rt, &ada, "study.docx", Some("Rust Notes"), &bytes)
        .await
        .unwrap();
    let stored = tmp
        .path()
        .join("data/files")
        .join(format!("{}_study.docx", receipt.document_id));
    assert!(stored.exists());

    let removed = ingest::delete_document(&rt, &ada, &receipt.document_id)
        .await
        .unwrap();
    assert_eq!(removed, receipt.modules as u64);
    assert!(!stored.exists(), "stored blob should be gone");

    let err = ask::answer_question(
        &rt,
        &ada,
        "What is ownership?",
        &receipt.document_id,
        "neutral",
        None,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, TutorError::NotFound(_)), "got {:?}", err);

    rt.close().await;
}
