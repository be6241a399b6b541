//! Shared HTTP plumbing for provider calls.
//!
//! Both the embedding and generation providers talk to JSON-over-HTTP
//! endpoints with the same failure profile, so the retry policy lives
//! here once: HTTP 429 and 5xx responses and network errors retry with
//! exponential backoff (1s, 2s, 4s, ... capped at 32s); any other 4xx
//! fails immediately. Upstream response bodies go to the log, never to
//! the caller; callers receive a generic failure naming only `what`.

use std::time::Duration;

use docent_core::{Result, TutorError};
use serde_json::Value;

/// POST a JSON body and return the parsed JSON response, retrying
/// transient failures.
pub async fn post_json_with_retry(
    client: &reqwest::Client,
    url: &str,
    bearer: Option<&str>,
    body: &Value,
    max_retries: u32,
    what: &str,
) -> Result<Value> {
    let mut last_err: Option<TutorError> = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let mut request = client.post(url).json(body);
        if let Some(token) = bearer {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    match response.json::<Value>().await {
                        Ok(json) => return Ok(json),
                        Err(e) => {
                            tracing::warn!("{} returned an unparsable body: {}", what, e);
                            return Err(TutorError::Upstream(format!("{} request failed", what)));
                        }
                    }
                }

                let body_text = response.text().await.unwrap_or_default();
                if status.as_u16() == 429 || status.is_server_error() {
                    tracing::warn!(
                        "{} error {} on attempt {}: {}",
                        what,
                        status,
                        attempt + 1,
                        body_text
                    );
                    last_err = Some(TutorError::Upstream(format!("{} request failed", what)));
                    continue;
                }

                tracing::warn!("{} error {}: {}", what, status, body_text);
                return Err(TutorError::Upstream(format!("{} request failed", what)));
            }
            Err(e) => {
                tracing::warn!("{} connection error on attempt {}: {}", what, attempt + 1, e);
                last_err = Some(TutorError::Upstream(format!("{} unreachable", what)));
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| TutorError::Upstream(format!("{} request failed", what))))
}
