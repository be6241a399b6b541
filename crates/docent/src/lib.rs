//! # Docent
//!
//! A document-grounded tutoring engine. Students upload their own study
//! material (PDF or DOCX), docent extracts and chunks the text, indexes
//! it per owner, and answers questions strictly from that material with
//! verbatim supporting quotes.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌───────────────┐
//! │ PDF/DOCX │──▶│   Ingestion   │──▶│    SQLite     │
//! │  upload  │   │ extract+chunk │   │ docs+vectors  │
//! └──────────┘   └───────────────┘   └──────┬────────┘
//!                                           │
//!                   ┌───────────────────────┤
//!                   ▼                       ▼
//!             ┌───────────┐          ┌───────────┐
//!             │ Retrieval │─────────▶│  Answer   │
//!             │  (cosine) │          │ composer  │
//!             └───────────┘          └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docent init                                  # create database and storage
//! docent token ada@example.com                 # mint an access token
//! docent ingest notes.pdf --token <t>          # upload and index a document
//! docent ask "what is ownership?" --document <id> --token <t>
//! docent documents --token <t>                 # list uploads
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`auth`] | HMAC token minting and verification |
//! | [`extract`] | PDF and DOCX text extraction |
//! | [`ingest`] | Two-phase ingestion pipeline |
//! | [`ask`] | Question answering |
//! | [`search`] | Owner-wide document search |
//! | [`modules`] | Module listing and titling |
//! | [`embedding`] | Embedding providers |
//! | [`generate`] | Generation providers |
//! | [`sqlite_store`] | SQLite vector index |
//! | [`storage`] | Document rows and file blobs |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod ask;
pub mod auth;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod generate;
pub mod http;
pub mod ingest;
pub mod migrate;
pub mod modules;
pub mod runtime;
pub mod search;
pub mod sqlite_store;
pub mod storage;
