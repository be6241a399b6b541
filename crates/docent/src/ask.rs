//! Question answering over a single document.
//!
//! The flow is authenticate, validate, retrieve, compose. Retrieval
//! that matches nothing is a `NotFound`, not an empty answer; generation
//! failure inside compose degrades to the fixed fallback answer instead
//! of failing the request.

use docent_core::answer::compose;
use docent_core::models::AnswerResponse;
use docent_core::retrieve::{retrieve, RetrieveRequest};
use docent_core::traits::{SpeechSynthesizer, TokenVerifier};
use docent_core::{Result, TutorError};

use crate::config::Config;
use crate::ingest::fetch_owned;
use crate::runtime::Runtime;

/// Answer a question against one of the caller's documents.
///
/// `synthesizer` switches the response into voice mode when present;
/// synthesis failure falls back to text rather than failing the answer.
pub async fn answer_question(
    rt: &Runtime,
    token: &str,
    question: &str,
    document_id: &str,
    emotion: &str,
    synthesizer: Option<&dyn SpeechSynthesizer>,
) -> Result<AnswerResponse> {
    let identity = rt.verifier.verify(token).await?;

    if question.trim().is_empty() {
        return Err(TutorError::Validation(
            "question must not be empty".to_string(),
        ));
    }
    if document_id.trim().is_empty() {
        return Err(TutorError::Validation(
            "document id must not be empty".to_string(),
        ));
    }

    let document = fetch_owned(rt, &identity.email, document_id).await?;

    let request = RetrieveRequest {
        question,
        owner_email: &identity.email,
        document_id: Some(&document.id),
        top_k: rt.config.retrieval.top_k,
        min_score: rt.config.retrieval.min_score,
    };
    let hits = retrieve(&rt.index, &request).await?;
    if hits.is_empty() {
        return Err(TutorError::NotFound(
            "no relevant content found for this question".to_string(),
        ));
    }

    let composed = compose(rt.generator.as_ref(), question, &hits, emotion).await;

    let (mode, audio_url) = match synthesizer {
        Some(synth) => match synth.synthesize(&composed.answer, emotion).await {
            Ok(url) => ("voice".to_string(), Some(url)),
            Err(err) => {
                tracing::warn!("speech synthesis failed: {}", err);
                ("text".to_string(), None)
            }
        },
        None => ("text".to_string(), None),
    };

    Ok(AnswerResponse {
        answer: composed.answer,
        supporting_texts: composed.supporting_texts,
        emotion: emotion.to_string(),
        mode,
        document_id: document.id,
        audio_url,
    })
}

pub async fn run_ask(
    config: &Config,
    question: &str,
    document_id: &str,
    token: &str,
    emotion: &str,
) -> anyhow::Result<()> {
    let rt = Runtime::open(config).await?;
    let response = answer_question(&rt, token, question, document_id, emotion, None).await?;

    println!("{}", response.answer);
    if !response.supporting_texts.is_empty() {
        println!("\nSupporting passages:");
        for text in &response.supporting_texts {
            println!("  - {}", text);
        }
    }

    rt.close().await;
    Ok(())
}
