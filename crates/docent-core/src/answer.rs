//! Answer composition from retrieved modules.
//!
//! Builds the tutoring prompt, runs the generator, and normalizes
//! whatever comes back into a [`ComposedAnswer`]. Generator output is
//! treated as untrusted text: models asked for JSON still return fenced
//! blocks, prose-wrapped objects, stringified payloads, or plain prose,
//! and each of those shapes is handled here.
//!
//! Parsing runs in three tiers:
//!
//! 1. A ``` fence anywhere in the output, with or without a `json` tag:
//!    parse its contents as an object.
//! 2. Output that itself starts with `{`: parse the whole thing.
//! 3. Anything else: the raw text becomes the answer verbatim, with no
//!    supporting texts.
//!
//! When the generator call itself fails, the caller gets the fixed
//! fallback payload instead of an error; a question must always produce
//! an answer shape the frontend can render.

use serde_json::Value;

use crate::models::{ComposedAnswer, ScoredChunk};
use crate::traits::Generator;

/// Answer text returned when generation fails.
pub const FALLBACK_ANSWER: &str = "Error generating answer.";

/// The fixed payload produced when the generator is unavailable.
pub fn fallback() -> ComposedAnswer {
    ComposedAnswer {
        answer: FALLBACK_ANSWER.to_string(),
        supporting_texts: Vec::new(),
    }
}

/// Concatenate retrieved module texts into the prompt context block.
pub fn build_context(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Build the tutoring prompt for one question.
pub fn build_prompt(question: &str, context: &str, emotion: &str) -> String {
    format!(
        "You are a patient tutor helping a student understand their own study material.\n\
         Answer the question using ONLY the context below. If the context does not\n\
         contain the answer, say so honestly. Deliver the answer in a {} tone.\n\n\
         Respond with a single JSON object and nothing else:\n\
         {{\"answer\": \"<your answer>\", \"supporting_texts\": [\"<verbatim quotes from the context>\"]}}\n\n\
         Context:\n{}\n\n\
         Question: {}",
        emotion, context, question
    )
}

/// Result of normalizing raw generator output.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedAnswer {
    /// The output contained a parseable answer object.
    Structured(ComposedAnswer),
    /// The output was prose; it becomes the answer as-is.
    Plain(String),
}

impl From<ParsedAnswer> for ComposedAnswer {
    fn from(parsed: ParsedAnswer) -> Self {
        match parsed {
            ParsedAnswer::Structured(answer) => answer,
            ParsedAnswer::Plain(text) => ComposedAnswer {
                answer: text,
                supporting_texts: Vec::new(),
            },
        }
    }
}

/// Normalize raw generator output through the three parsing tiers.
pub fn parse_generation(raw: &str) -> ParsedAnswer {
    if let Some(fenced) = extract_fenced(raw) {
        if let Some(answer) = parse_object_str(&fenced) {
            return ParsedAnswer::Structured(answer);
        }
    }
    let trimmed = raw.trim();
    if trimmed.starts_with('{') {
        if let Some(answer) = parse_object_str(trimmed) {
            return ParsedAnswer::Structured(answer);
        }
    }
    ParsedAnswer::Plain(trimmed.to_string())
}

/// Contents of the first ``` fence, if any, with an optional `json`
/// language tag stripped.
fn extract_fenced(raw: &str) -> Option<String> {
    let start = raw.find("```")?;
    let after = &raw[start + 3..];
    let after = after.strip_prefix("json").unwrap_or(after);
    let end = after.find("```")?;
    Some(after[..end].trim().to_string())
}

fn parse_object_str(s: &str) -> Option<ComposedAnswer> {
    let value: Value = serde_json::from_str(s).ok()?;
    parse_object(&value)
}

/// Pull an answer out of a parsed JSON value.
///
/// `answer` may be any JSON type and is coerced to a string;
/// `supporting_texts` keeps only its string elements. Some models
/// stringify the entire payload into the answer field, so a string
/// answer that itself parses to an object with an `answer` key is
/// unwrapped exactly one level.
fn parse_object(value: &Value) -> Option<ComposedAnswer> {
    let answer_value = value.get("answer")?;
    let mut answer = string_or_json(answer_value);
    let mut supporting_texts = string_array(value.get("supporting_texts"));

    if answer.trim_start().starts_with('{') {
        if let Ok(inner) = serde_json::from_str::<Value>(&answer) {
            if let Some(inner_answer) = inner.get("answer") {
                answer = string_or_json(inner_answer);
                if inner.get("supporting_texts").is_some() {
                    supporting_texts = string_array(inner.get("supporting_texts"));
                }
            }
        }
    }

    Some(ComposedAnswer {
        answer,
        supporting_texts,
    })
}

fn string_or_json(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Generate and normalize an answer for a question.
///
/// Never returns an error: a generator failure is logged and replaced
/// with [`fallback`].
pub async fn compose(
    generator: &dyn Generator,
    question: &str,
    chunks: &[ScoredChunk],
    emotion: &str,
) -> ComposedAnswer {
    let context = build_context(chunks);
    let prompt = build_prompt(question, &context, emotion);
    match generator.generate(&prompt).await {
        Ok(raw) => parse_generation(&raw).into(),
        Err(err) => {
            tracing::warn!("answer generation failed: {}", err);
            fallback()
        }
    }
}
