//! Module inspection: list a document's modules, fetch one module's
//! full text, optionally with a generated title.

use docent_core::models::ModuleSummary;
use docent_core::store::IndexStore;
use docent_core::traits::TokenVerifier;
use docent_core::{Result, TutorError};

use crate::config::Config;
use crate::generate::module_title;
use crate::ingest::fetch_owned;
use crate::runtime::Runtime;

/// List the modules of one of the caller's documents, in position
/// order. An unindexed document lists as empty.
pub async fn list_modules(
    rt: &Runtime,
    token: &str,
    document_id: &str,
) -> Result<Vec<ModuleSummary>> {
    let identity = rt.verifier.verify(token).await?;
    fetch_owned(rt, &identity.email, document_id).await?;
    rt.index.list_modules(document_id).await
}

/// Full text of one module of one of the caller's documents.
pub async fn get_module(
    rt: &Runtime,
    token: &str,
    document_id: &str,
    module_number: i64,
) -> Result<String> {
    let identity = rt.verifier.verify(token).await?;
    fetch_owned(rt, &identity.email, document_id).await?;
    rt.index
        .module_text(document_id, module_number)
        .await?
        .ok_or_else(|| {
            TutorError::NotFound(format!(
                "module {} not found for document {}",
                module_number, document_id
            ))
        })
}

pub async fn run_modules(config: &Config, document_id: &str, token: &str) -> anyhow::Result<()> {
    let rt = Runtime::open(config).await?;
    let summaries = list_modules(&rt, token, document_id).await?;

    if summaries.is_empty() {
        println!(
            "No modules. The document is not indexed yet — run `docent reindex {}`.",
            document_id
        );
    } else {
        println!("Modules ({}):\n", summaries.len());
        for m in &summaries {
            println!("  {:>3}  {}", m.module_number, m.preview);
        }
    }

    rt.close().await;
    Ok(())
}

pub async fn run_module(
    config: &Config,
    document_id: &str,
    module_number: i64,
    token: &str,
    title: bool,
) -> anyhow::Result<()> {
    let rt = Runtime::open(config).await?;
    let text = get_module(&rt, token, document_id, module_number).await?;

    if title {
        let heading = module_title(rt.generator.as_ref(), &text).await;
        println!("# {}\n", heading);
    }
    println!("{}", text);

    rt.close().await;
    Ok(())
}
