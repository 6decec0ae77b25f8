/// Errors that can occur when asking a model to edit an image.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("http error: {0}")]
    Http(Box<dyn std::error::Error + Send + Sync>),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("api error ({code}): {message}")]
    Api { code: String, message: String },

    /// The request was rejected by a policy or safety filter.
    #[error("{}", blocked_message(.reason, .categories))]
    Blocked {
        reason: String,
        categories: Vec<String>,
    },

    /// The model answered without producing an image and gave no reason.
    #[error(
        "No image was generated. The model may have refused the request. Please try a different prompt or image."
    )]
    NoImage,

    #[error("{0}")]
    Other(String),
}

fn blocked_message(reason: &str, categories: &[String]) -> String {
    let mut message = format!("Request was blocked due to {reason}.");
    if !categories.is_empty() {
        message.push_str(&format!(
            " The content was flagged for: {}.",
            categories.join(", ")
        ));
    }
    message.push_str(" Please adjust your prompt or use a different image.");
    message
}

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn blocked_message_lists_flagged_categories() {
        let err = Error::Blocked {
            reason: "safety".into(),
            categories: vec!["harassment".into(), "dangerous content".into()],
        };

        assert_eq!(
            err.to_string(),
            "Request was blocked due to safety. The content was flagged for: harassment, dangerous content. Please adjust your prompt or use a different image."
        );
    }

    #[test]
    fn blocked_message_without_categories() {
        let err = Error::Blocked {
            reason: "other".into(),
            categories: Vec::new(),
        };

        assert_eq!(
            err.to_string(),
            "Request was blocked due to other. Please adjust your prompt or use a different image."
        );
    }
}
