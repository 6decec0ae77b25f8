use crate::convert::ConvertError;
use crate::mode::EditMode;
use crate::session::SessionError;

#[derive(Debug, thiserror::Error)]
pub enum StudioError {
    #[error("cannot submit empty prompt")]
    EmptyPrompt,

    #[error("upload an image first")]
    NoUpload,

    #[error("there is no generated image to work from")]
    NoCurrentImage,

    #[error("there is no previous prompt to regenerate")]
    NoPromptToRegenerate,

    #[error("the {mode} mode does not take reference images")]
    ReferencesNotSupported { mode: EditMode },

    #[error("'{media_type}' is not an image type")]
    NotAnImage { media_type: String },

    #[error("a generation is already in progress")]
    Busy,

    #[error("there is no failed request to retry")]
    NothingToRetry,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Request(#[from] retouch_llm::Error),

    #[error("could not prepare image: {0}")]
    Conversion(#[from] ConvertError),
}

impl StudioError {
    /// Failures that happened while talking to the model or preparing its
    /// input. These are the only ones a retry can change.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StudioError::Request(_) | StudioError::Conversion(_))
    }

    /// Rejections that are reported to the caller but never stored as the
    /// visible notice.
    pub(crate) fn is_transient(&self) -> bool {
        matches!(self, StudioError::Busy | StudioError::NothingToRetry)
    }
}

#[cfg(test)]
mod tests {
    use super::StudioError;
    use crate::convert::ConvertError;
    use crate::session::SessionError;

    #[test]
    fn only_request_and_conversion_failures_are_retryable() {
        assert!(StudioError::Request(retouch_llm::Error::NoImage).is_retryable());
        assert!(StudioError::Conversion(ConvertError::NotDataUrl).is_retryable());
        assert!(!StudioError::EmptyPrompt.is_retryable());
        assert!(!StudioError::Session(SessionError::CannotUndo).is_retryable());
    }

    #[test]
    fn session_errors_keep_their_message() {
        let err = StudioError::from(SessionError::CannotRedo);
        assert_eq!(err.to_string(), "nothing to redo");
    }
}
