use crate::error::Error;
use crate::request::ImagePayload;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::future::{Future, IntoFuture};

/// A pending edit response.
///
/// Await it directly, or call [`into_result()`](Response::into_result).
pub struct Response {
    inner: BoxFuture<'static, Result<EditResult, Error>>,
}

impl Response {
    pub fn new(future: impl Future<Output = Result<EditResult, Error>> + Send + 'static) -> Self {
        Self {
            inner: Box::pin(future),
        }
    }

    /// A response that fails immediately, for backends that reject a request
    /// before sending it.
    pub fn failed(error: Error) -> Self {
        Self::new(async move { Err(error) })
    }

    /// Wait for the model to finish and return its result.
    pub async fn into_result(self) -> Result<EditResult, Error> {
        self.inner.await
    }
}

impl IntoFuture for Response {
    type Output = Result<EditResult, Error>;
    type IntoFuture = BoxFuture<'static, Result<EditResult, Error>>;

    fn into_future(self) -> Self::IntoFuture {
        self.inner
    }
}

/// The result of a successful edit: exactly one image.
#[derive(Debug, Clone)]
pub struct EditResult {
    pub image: ImagePayload,
    /// Any commentary the model returned next to the image.
    pub text: Option<String>,
    pub finish_reason: FinishReason,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Safety,
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::{EditResult, FinishReason, Response};
    use crate::error::Error;
    use crate::request::ImagePayload;

    #[tokio::test]
    async fn response_resolves_to_backend_result() {
        let image = ImagePayload::new(vec![9u8, 9], "image/png");
        let expected = image.clone();
        let response = Response::new(async move {
            Ok(EditResult {
                image,
                text: None,
                finish_reason: FinishReason::Stop,
            })
        });

        let result = response.await.expect("edit result");
        assert_eq!(result.image, expected);
    }

    #[tokio::test]
    async fn failed_response_yields_error() {
        let result = Response::failed(Error::NoImage).into_result().await;
        assert!(matches!(result, Err(Error::NoImage)));
    }
}
