//! Conversion between request-ready payloads and the displayable form of an
//! image.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use retouch_llm::ImagePayload;

/// Media type assumed for data URLs that do not name one.
const FALLBACK_MEDIA_TYPE: &str = "image/png";

// ---------------------------------------------------------------------------
// DisplayImage
// ---------------------------------------------------------------------------

/// The displayable representation of an image: a `data:` URL.
///
/// Every variation in the edit history is held in this form. Turning one back
/// into an [`ImagePayload`] for a follow-up request goes through a
/// [`PayloadConverter`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DisplayImage(Arc<str>);

impl DisplayImage {
    /// Encode a payload as a base64 data URL.
    pub fn from_payload(payload: &ImagePayload) -> Self {
        let url = format!(
            "data:{};base64,{}",
            payload.media_type,
            STANDARD.encode(&payload.bytes)
        );
        Self(url.into())
    }

    /// Wrap an existing data URL without validating it.
    pub fn from_data_url(url: impl Into<Arc<str>>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The media type named in the URL header, if any.
    pub fn media_type(&self) -> Option<&str> {
        let header = self.0.strip_prefix("data:")?.split(',').next()?;
        let media_type = header.split(';').next()?;
        (!media_type.is_empty()).then_some(media_type)
    }
}

impl fmt::Debug for DisplayImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisplayImage")
            .field("media_type", &self.media_type())
            .field("len", &self.0.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Converters
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("image is not a data url")]
    NotDataUrl,

    #[error("only base64 data urls are supported")]
    NotBase64,

    #[error("invalid base64 image data: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("{0}")]
    Other(String),
}

/// Turns a displayed image back into a payload that can be sent with a new
/// request.
#[async_trait]
pub trait PayloadConverter: Send + Sync {
    async fn to_payload(&self, image: &DisplayImage) -> Result<ImagePayload, ConvertError>;
}

/// Decodes base64 `data:` URLs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataUrlConverter;

#[async_trait]
impl PayloadConverter for DataUrlConverter {
    async fn to_payload(&self, image: &DisplayImage) -> Result<ImagePayload, ConvertError> {
        decode_data_url(image.as_str())
    }
}

pub fn decode_data_url(url: &str) -> Result<ImagePayload, ConvertError> {
    let rest = url.strip_prefix("data:").ok_or(ConvertError::NotDataUrl)?;
    let (header, data) = rest.split_once(',').ok_or(ConvertError::NotDataUrl)?;

    let mut params = header.split(';');
    let media_type = params
        .next()
        .filter(|m| !m.is_empty())
        .unwrap_or(FALLBACK_MEDIA_TYPE);
    if !params.any(|p| p.eq_ignore_ascii_case("base64")) {
        return Err(ConvertError::NotBase64);
    }

    let bytes = STANDARD.decode(data.trim())?;
    Ok(ImagePayload::new(bytes, media_type))
}

#[cfg(test)]
mod tests {
    use super::{ConvertError, DataUrlConverter, DisplayImage, PayloadConverter, decode_data_url};
    use retouch_llm::ImagePayload;

    #[tokio::test]
    async fn displayed_image_converts_back_to_the_same_payload() {
        let payload = ImagePayload::new(vec![0x89, b'P', b'N', b'G'], "image/png");
        let display = DisplayImage::from_payload(&payload);

        assert!(display.as_str().starts_with("data:image/png;base64,"));
        assert_eq!(display.media_type(), Some("image/png"));

        let back = DataUrlConverter.to_payload(&display).await.expect("payload");
        assert_eq!(back, payload);
    }

    #[test]
    fn missing_media_type_falls_back_to_png() {
        let payload = decode_data_url("data:;base64,AQI=").expect("payload");
        assert_eq!(payload.media_type, "image/png");
        assert_eq!(&*payload.bytes, &[1u8, 2]);
    }

    #[test]
    fn rejects_non_data_urls() {
        assert!(matches!(
            decode_data_url("https://example.com/a.png"),
            Err(ConvertError::NotDataUrl)
        ));
        assert!(matches!(
            decode_data_url("data:image/svg+xml,<svg/>"),
            Err(ConvertError::NotBase64)
        ));
        assert!(matches!(
            decode_data_url("data:image/png;base64,***"),
            Err(ConvertError::Base64(_))
        ));
    }
}
