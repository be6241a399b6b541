//! # Docent Core
//!
//! Shared logic for docent, a retrieval-augmented answering engine for
//! uploaded study documents: data models, the error taxonomy, the
//! deterministic chunker, the index store abstraction (with an in-memory
//! implementation), the retriever, and the answer composer.
//!
//! This crate contains no tokio, sqlx, filesystem I/O, or network code.
//! Collaborator implementations (SQLite store, embedding and generation
//! providers, document storage, token verification) live in the `docent`
//! app crate and plug in through the traits defined here.

pub mod answer;
pub mod chunk;
pub mod embed;
pub mod error;
pub mod models;
pub mod retrieve;
pub mod store;
pub mod traits;

pub use error::{Result, TutorError};
