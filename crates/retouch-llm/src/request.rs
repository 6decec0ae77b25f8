use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Image payloads
// ---------------------------------------------------------------------------

/// Raw image bytes tagged with their media type (e.g. `image/png`).
///
/// Bytes are reference counted, so cloning a payload to replay a request is
/// cheap.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Arc<[u8]>,
    pub media_type: String,
}

impl ImagePayload {
    pub fn new(bytes: impl Into<Arc<[u8]>>, media_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            media_type: media_type.into(),
        }
    }

    /// Whether the media type names an image (`image/*`).
    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImagePayload")
            .field("media_type", &self.media_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Top-level request
// ---------------------------------------------------------------------------

/// The frozen, built request: one prompt, one primary image and zero or more
/// reference images.
#[derive(Debug, Clone, PartialEq)]
pub struct EditRequest {
    pub prompt: String,
    pub image: ImagePayload,
    pub references: Vec<ImagePayload>,
    pub options: EditOptions,
    /// Provider-specific metadata. Passed through to the backend as-is.
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Knobs that control generation behavior.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditOptions {
    pub temperature: Option<f32>,
    pub seed: Option<i64>,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Provider-agnostic request builder. Provider crates add typed options via
/// extension traits that write into [`meta`](RequestBuilder::meta).
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    pub(crate) prompt: String,
    pub(crate) image: ImagePayload,
    pub(crate) references: Vec<ImagePayload>,
    pub(crate) options: EditOptions,
    pub(crate) metadata: HashMap<String, serde_json::Value>,
}

/// Convenience entry point: `retouch_llm::request(prompt, image)`.
pub fn request(prompt: impl Into<String>, image: ImagePayload) -> RequestBuilder {
    RequestBuilder {
        prompt: prompt.into(),
        image,
        references: Vec::new(),
        options: EditOptions::default(),
        metadata: HashMap::new(),
    }
}

impl RequestBuilder {
    // -- images --

    pub fn reference(&mut self, image: ImagePayload) -> &mut Self {
        self.references.push(image);
        self
    }

    pub fn references(&mut self, images: impl IntoIterator<Item = ImagePayload>) -> &mut Self {
        self.references.extend(images);
        self
    }

    // -- options --

    pub fn temperature(&mut self, t: f32) -> &mut Self {
        self.options.temperature = Some(t);
        self
    }

    pub fn seed(&mut self, seed: i64) -> &mut Self {
        self.options.seed = Some(seed);
        self
    }

    // -- metadata --

    pub fn meta(
        &mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> &mut Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    // -- build --

    pub fn build(self) -> EditRequest {
        self.into()
    }
}

impl From<RequestBuilder> for EditRequest {
    fn from(b: RequestBuilder) -> Self {
        EditRequest {
            prompt: b.prompt,
            image: b.image,
            references: b.references,
            options: b.options,
            metadata: b.metadata,
        }
    }
}
