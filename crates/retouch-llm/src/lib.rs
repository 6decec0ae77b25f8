pub mod error;
pub mod model;
pub mod provider;
pub mod request;
pub mod response;

pub use error::Error;
pub use model::{EditModel, EditModelBackend};
pub use provider::{EditProvider, EditProviderBackend};
pub use request::{EditOptions, EditRequest, ImagePayload, RequestBuilder, request};
pub use response::{EditResult, FinishReason, Response};
