use crate::request::EditRequest;
use crate::response::Response;

/// Handle to one image-edit model: takes a prompt, a primary image and any
/// reference images, and answers with exactly one edited image.
///
/// Every call is independent; the model keeps no history. Undo, variations
/// and retries live with the caller, which replays an [`EditRequest`] by
/// sending it again.
pub struct EditModel {
    inner: Box<dyn EditModelBackend>,
}

impl EditModel {
    /// Wrap any backend implementation into a model.
    pub fn new(backend: impl EditModelBackend + 'static) -> Self {
        Self {
            inner: Box::new(backend),
        }
    }

    /// The model identifier (e.g. `"gemini-2.5-flash-image"`).
    pub fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    /// The provider name this model belongs to.
    pub fn provider(&self) -> &str {
        self.inner.provider()
    }

    /// Send one edit request. The returned [`Response`] resolves to exactly
    /// one image or an error.
    pub fn edit(&self, request: impl Into<EditRequest>) -> Response {
        self.inner.edit(request.into())
    }
}

/// Implemented by provider crates for one model. `edit` must not block: do
/// the network work inside the returned [`Response`], and report a refused
/// or empty generation as [`Error::Blocked`](crate::Error::Blocked) or
/// [`Error::NoImage`](crate::Error::NoImage) rather than as a transport error.
pub trait EditModelBackend: Send + Sync {
    fn model_id(&self) -> &str;
    fn provider(&self) -> &str;
    fn edit(&self, request: EditRequest) -> Response;
}
