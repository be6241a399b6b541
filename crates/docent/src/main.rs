//! # docent CLI
//!
//! The `docent` binary exercises every flow of the tutoring engine:
//! database initialization, token minting, document ingestion,
//! question answering, module inspection, search, and deletion.
//!
//! ## Usage
//!
//! ```bash
//! docent --config ./config/docent.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docent init` | Create the SQLite database and run schema migrations |
//! | `docent token <email>` | Mint a signed access token for a user |
//! | `docent ingest <file>` | Ingest a PDF or DOCX document |
//! | `docent reindex <id>` | Re-run indexing for a stored document |
//! | `docent ask "<question>"` | Ask a question against one document |
//! | `docent documents` | List your documents |
//! | `docent modules <id>` | List a document's modules |
//! | `docent module <id> <n>` | Print one module's full text |
//! | `docent search "<query>"` | Search across all your documents |
//! | `docent delete <id>` | Delete a document and its index records |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! docent init --config ./config/docent.toml
//!
//! # Mint a token and ingest a document
//! TOKEN=$(docent token ada@example.com)
//! docent ingest ./notes/biology.pdf --name "Biology Notes" --token "$TOKEN"
//!
//! # Ask a question against it
//! docent ask "What is osmosis?" --document <id> --token "$TOKEN"
//!
//! # Inspect its modules
//! docent modules <id> --token "$TOKEN"
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use docent::auth::HmacVerifier;
use docent::{ask, config, ingest, migrate, modules, search};
use docent_core::TutorError;

/// docent — a retrieval-augmented tutor over your own documents.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docent.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "docent",
    about = "docent — a retrieval-augmented tutor over your own documents",
    version,
    long_about = "docent ingests PDF and DOCX documents, splits them into embedded modules, \
    and answers free-form questions against them with supporting citations. Every document \
    is private to the user whose token ingested it."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/docent.toml`. Database, storage, chunking,
    /// retrieval, provider, and auth settings are read from this file.
    #[arg(long, global = true, default_value = "./config/docent.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables
    /// (documents, chunks, chunk_vectors). Idempotent — running it
    /// multiple times is safe.
    Init,

    /// Mint an access token for an email address.
    ///
    /// The token is signed with `auth.secret` from the config and is
    /// what every other command expects in `--token`.
    Token {
        /// Email address the token identifies.
        email: String,
    },

    /// Ingest a PDF or DOCX document.
    ///
    /// Extracts the text, stores the document durably, then chunks and
    /// indexes it. When indexing fails and `ingestion.on_index_failure`
    /// is `defer`, the document is kept unindexed for a later
    /// `docent reindex`.
    Ingest {
        /// Path to the .pdf or .docx file.
        file: PathBuf,

        /// Display name for the document. Defaults to the file name.
        /// Must be unique among your documents.
        #[arg(long)]
        name: Option<String>,

        /// Access token (see `docent token`).
        #[arg(long)]
        token: String,
    },

    /// Re-run indexing for a stored document.
    ///
    /// Chunks the stored text again and atomically replaces any
    /// existing index records.
    Reindex {
        /// Document id from `docent ingest` or `docent documents`.
        document_id: String,

        /// Access token (see `docent token`).
        #[arg(long)]
        token: String,
    },

    /// Ask a question against one of your documents.
    ///
    /// Retrieves the most relevant modules and composes an answer with
    /// supporting citations. Errors with 404 when nothing relevant is
    /// indexed for the document.
    Ask {
        /// The question to answer.
        question: String,

        /// Document to answer from.
        #[arg(long)]
        document: String,

        /// Access token (see `docent token`).
        #[arg(long)]
        token: String,

        /// Emotional tone for the answer (e.g. `encouraging`, `strict`).
        #[arg(long, default_value = "neutral")]
        emotion: String,
    },

    /// List your documents with their indexing status.
    Documents {
        /// Access token (see `docent token`).
        #[arg(long)]
        token: String,
    },

    /// List the modules of one of your documents.
    Modules {
        /// Document id.
        document_id: String,

        /// Access token (see `docent token`).
        #[arg(long)]
        token: String,
    },

    /// Print the full text of one module.
    Module {
        /// Document id.
        document_id: String,

        /// Module number (0-based, see `docent modules`).
        module_number: i64,

        /// Access token (see `docent token`).
        #[arg(long)]
        token: String,

        /// Also generate a short title for the module.
        #[arg(long)]
        title: bool,
    },

    /// Search across all your documents.
    ///
    /// Returns the best-matching documents with an excerpt from the
    /// most relevant module of each.
    Search {
        /// The search query string.
        query: String,

        /// Access token (see `docent token`).
        #[arg(long)]
        token: String,
    },

    /// Delete a document and everything derived from it.
    Delete {
        /// Document id.
        document_id: String,

        /// Access token (see `docent token`).
        #[arg(long)]
        token: String,
    },
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        // Engine failures carry their HTTP-style status; anything else
        // is CLI plumbing (bad config path, unreadable file).
        match err.downcast_ref::<TutorError>() {
            Some(e) => eprintln!("error[{}]: {}", e.http_status(), e),
            None => eprintln!("error: {:#}", err),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Token { email } => {
            let email = email.trim();
            if email.is_empty() || !email.contains('@') {
                anyhow::bail!("a valid email address is required");
            }
            println!("{}", HmacVerifier::new(&cfg.auth.secret).mint_token(email));
        }
        Commands::Ingest { file, name, token } => {
            ingest::run_ingest(&cfg, &file, name.as_deref(), &token).await?;
        }
        Commands::Reindex { document_id, token } => {
            ingest::run_reindex(&cfg, &document_id, &token).await?;
        }
        Commands::Ask {
            question,
            document,
            token,
            emotion,
        } => {
            ask::run_ask(&cfg, &question, &document, &token, &emotion).await?;
        }
        Commands::Documents { token } => {
            ingest::run_documents(&cfg, &token).await?;
        }
        Commands::Modules { document_id, token } => {
            modules::run_modules(&cfg, &document_id, &token).await?;
        }
        Commands::Module {
            document_id,
            module_number,
            token,
            title,
        } => {
            modules::run_module(&cfg, &document_id, module_number, &token, title).await?;
        }
        Commands::Search { query, token } => {
            search::run_search(&cfg, &query, &token).await?;
        }
        Commands::Delete { document_id, token } => {
            ingest::run_delete(&cfg, &document_id, &token).await?;
        }
    }

    Ok(())
}
