mod convert;
mod generate;
mod types;

use retouch_llm::request::EditRequest;
use retouch_llm::response::Response;
use retouch_llm::{
    EditModel, EditModelBackend, EditProvider, EditProviderBackend, RequestBuilder,
};
use std::sync::Arc;

pub const PROVIDER_ID: &str = "gemini";
pub const DEFAULT_MODEL_ID: &str = "gemini-2.5-flash-image";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Configuration for the Gemini provider.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.into(),
        }
    }
}

impl GeminiConfig {
    /// Read `GEMINI_API_KEY` (falling back to `API_KEY`) and an optional
    /// `GEMINI_BASE_URL` override from the environment.
    pub fn from_env() -> Self {
        let api_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("API_KEY"))
            .unwrap_or_default();
        let base_url = std::env::var("GEMINI_BASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.into());
        Self { api_key, base_url }
    }
}

/// Create a Gemini provider with the given config.
pub fn provider(config: GeminiConfig) -> EditProvider {
    EditProvider::new(GeminiProvider {
        state: Arc::new(ProviderState {
            client: reqwest::Client::new(),
            config,
        }),
    })
}

/// Create a Gemini provider configured from the environment.
pub fn from_env() -> EditProvider {
    provider(GeminiConfig::from_env())
}

// ---------------------------------------------------------------------------
// Extension trait for Gemini-specific request options
// ---------------------------------------------------------------------------

/// Extension methods for [`RequestBuilder`] that set Gemini-specific options.
///
/// ```ignore
/// use retouch_llm_gemini::GeminiRequestExt;
///
/// let mut req = retouch_llm::request("make it a watercolor", image);
/// req.aspect_ratio("4:5");
/// model.edit(req);
/// ```
pub trait GeminiRequestExt {
    /// Ask for a specific output aspect ratio (e.g. `"1:1"`, `"16:9"`).
    fn aspect_ratio(&mut self, ratio: &str) -> &mut Self;
}

impl GeminiRequestExt for RequestBuilder {
    fn aspect_ratio(&mut self, ratio: &str) -> &mut Self {
        self.meta("aspect_ratio", ratio)
    }
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

struct ProviderState {
    client: reqwest::Client,
    config: GeminiConfig,
}

struct GeminiProvider {
    state: Arc<ProviderState>,
}

impl EditProviderBackend for GeminiProvider {
    fn name(&self) -> &str {
        PROVIDER_ID
    }

    fn model(&self, model_id: &str) -> EditModel {
        EditModel::new(GeminiModel {
            model_id: model_id.to_string(),
            state: Arc::clone(&self.state),
        })
    }
}

struct GeminiModel {
    model_id: String,
    state: Arc<ProviderState>,
}

impl EditModelBackend for GeminiModel {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn provider(&self) -> &str {
        PROVIDER_ID
    }

    fn edit(&self, request: EditRequest) -> Response {
        if self.state.config.api_key.is_empty() {
            return Response::failed(retouch_llm::Error::Other(
                "missing Gemini API key (set GEMINI_API_KEY)".into(),
            ));
        }
        let body = convert::to_gemini_request(&request);
        let state = Arc::clone(&self.state);
        Response::new(generate::generate_content(
            state,
            self.model_id.clone(),
            body,
        ))
    }
}
