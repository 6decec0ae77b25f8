use crate::model::EditModel;

/// An image-edit service (e.g. Gemini) holding the credentials and HTTP
/// client shared by every model it hands out.
///
/// ```ignore
/// let model = retouch_llm_gemini::from_env().model("gemini-2.5-flash-image");
/// let result = model.edit(retouch_llm::request("add a red hat", image)).await?;
/// ```
pub struct EditProvider {
    inner: Box<dyn EditProviderBackend>,
}

impl EditProvider {
    /// Wrap any backend implementation into a provider.
    pub fn new(backend: impl EditProviderBackend + 'static) -> Self {
        Self {
            inner: Box::new(backend),
        }
    }

    /// The provider name (e.g. `"gemini"`).
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Create a model handle for the given model ID.
    pub fn model(&self, model_id: &str) -> EditModel {
        self.inner.model(model_id)
    }
}

/// Implemented by provider crates. Models created by `model` share the
/// provider's client and configuration.
pub trait EditProviderBackend: Send + Sync {
    fn name(&self) -> &str;
    fn model(&self, model_id: &str) -> EditModel;
}
