//! Collaborator traits for the ingestion and answering pipeline.
//!
//! Every external dependency of the pipeline sits behind one of these
//! traits: token verification, document persistence, answer generation,
//! and speech synthesis. The app crate wires in real implementations;
//! tests substitute deterministic stubs. Pipeline functions take these
//! as `Arc<dyn …>` parameters, never as globals.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{DocumentRecord, Identity, NewDocument};

/// Verifies caller tokens and resolves the identity they belong to.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verify a bearer token.
    ///
    /// Returns [`TutorError::Auth`](crate::TutorError::Auth) when the
    /// token is missing, malformed, or fails verification.
    async fn verify(&self, token: &str) -> Result<Identity>;
}

/// Durable storage for documents: metadata rows plus raw file bytes.
///
/// This is phase one of ingestion. A document recorded here survives
/// even when indexing (phase two) fails, so it can be re-indexed later.
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    /// Write the raw uploaded bytes, returning a URL or path for the
    /// stored object.
    async fn store_file(&self, bytes: &[u8], object_name: &str) -> Result<String>;

    /// Persist a document row.
    ///
    /// Returns [`TutorError::Conflict`](crate::TutorError::Conflict)
    /// when the owner already has a document with this name; the check
    /// is a storage-level uniqueness constraint, not a read-then-write.
    async fn record_document(&self, document: &NewDocument) -> Result<()>;

    /// Attach the stored-object URL to an existing document row.
    async fn set_storage_url(&self, document_id: &str, url: &str) -> Result<()>;

    /// Record the outcome of indexing phase two.
    async fn set_indexed(&self, document_id: &str, indexed: bool, modules: i64) -> Result<()>;

    /// Fetch one document by id.
    async fn get_document(&self, document_id: &str) -> Result<Option<DocumentRecord>>;

    /// List an owner's documents, newest first.
    async fn list_documents(&self, owner_email: &str) -> Result<Vec<DocumentRecord>>;

    /// Remove a document row and its stored bytes. Returns whether a
    /// row existed.
    async fn delete_document(&self, document_id: &str) -> Result<bool>;
}

/// Produces free-form text from a prompt.
///
/// The composer treats generator output as untrusted: it may be clean
/// JSON, fenced JSON, or prose, and is normalized downstream.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Renders an answer to audio for voice mode.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` with the requested delivery `emotion`,
    /// returning a URL for the rendered audio.
    async fn synthesize(&self, text: &str, emotion: &str) -> Result<String>;
}
