//! Sends a `generateContent` call and maps the reply to an [`EditResult`].

use std::sync::Arc;

use retouch_llm::Error;
use retouch_llm::response::EditResult;

use crate::ProviderState;
use crate::convert::from_gemini_response;
use crate::types::{ErrorEnvelope, GenerateContentRequest, GenerateContentResponse};

pub async fn generate_content(
    state: Arc<ProviderState>,
    model_id: String,
    body: GenerateContentRequest,
) -> Result<EditResult, Error> {
    let url = format!(
        "{}/models/{}:generateContent",
        state.config.base_url.trim_end_matches('/'),
        model_id
    );
    tracing::debug!(model = %model_id, "sending generateContent request");

    let resp = state
        .client
        .post(&url)
        .header("x-goog-api-key", &state.config.api_key)
        .json(&body)
        .send()
        .await
        .map_err(|e| Error::Http(Box::new(e)))?;

    let status = resp.status();
    if !status.is_success() {
        let body_text = resp.text().await.unwrap_or_default();
        tracing::warn!(status = %status, "generateContent returned an error status");
        return Err(Error::Api {
            code: status.as_str().to_string(),
            message: api_error_message(&body_text),
        });
    }

    let text = resp.text().await.map_err(|e| Error::Http(Box::new(e)))?;
    let parsed: GenerateContentResponse = serde_json::from_str(&text)?;
    from_gemini_response(parsed)
}

/// Prefer the structured `error.message`; fall back to the raw body.
fn api_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match envelope.error.status {
            Some(status) => format!("{status}: {}", envelope.error.message),
            None => envelope.error.message,
        },
        Err(_) => body.to_string(),
    }
}
