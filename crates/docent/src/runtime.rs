//! Runtime wiring: one place that turns a [`Config`] into live
//! collaborators.
//!
//! Nothing here is a singleton. Each orchestrator flow receives a
//! `&Runtime` and reaches its collaborators through it; tests build the
//! struct directly with stub providers instead of going through
//! [`Runtime::open`].

use std::sync::Arc;

use anyhow::Result;
use sqlx::SqlitePool;

use docent_core::chunk::ChunkerConfig;
use docent_core::traits::Generator;

use crate::auth::HmacVerifier;
use crate::config::Config;
use crate::db;
use crate::embedding;
use crate::generate;
use crate::sqlite_store::SqliteIndexStore;
use crate::storage::LocalStorage;

pub struct Runtime {
    pub config: Config,
    pub pool: SqlitePool,
    pub storage: LocalStorage,
    pub index: SqliteIndexStore,
    pub verifier: HmacVerifier,
    pub generator: Arc<dyn Generator>,
}

impl Runtime {
    /// Connect the pool and construct every collaborator from config.
    ///
    /// Disabled providers are constructed too; they fail at call time,
    /// which lets phase one of ingestion run without an embedding
    /// backend.
    pub async fn open(config: &Config) -> Result<Self> {
        let pool = db::connect(&config.db).await?;
        let embedder = embedding::create_embedder(&config.embedding)?;
        let generator = generate::create_generator(&config.generation)?;
        let storage = LocalStorage::new(pool.clone(), config.storage.root.clone());
        let index = SqliteIndexStore::new(pool.clone(), embedder);
        let verifier = HmacVerifier::new(&config.auth.secret);

        Ok(Self {
            config: config.clone(),
            pool,
            storage,
            index,
            verifier,
            generator,
        })
    }

    pub fn chunker(&self) -> ChunkerConfig {
        ChunkerConfig {
            max_chars: self.config.chunking.max_chars,
            overlap_chars: self.config.chunking.overlap_chars,
        }
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}
