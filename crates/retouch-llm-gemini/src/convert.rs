//! Converts between retouch-llm generic types and the Gemini wire format.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use retouch_llm::request::{EditRequest, ImagePayload};
use retouch_llm::response::{EditResult, FinishReason};
use retouch_llm::Error;

use crate::types::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, ImageConfig,
    InlineData, Modality, Part, PromptFeedback,
};

pub fn to_gemini_request(req: &EditRequest) -> GenerateContentRequest {
    // Primary image first, then references in order, then the instruction.
    let mut parts = Vec::with_capacity(req.references.len() + 2);
    parts.push(inline_part(&req.image));
    parts.extend(req.references.iter().map(inline_part));
    parts.push(Part {
        text: Some(req.prompt.clone()),
        inline_data: None,
    });

    let image_config = req
        .metadata
        .get("aspect_ratio")
        .and_then(|v| v.as_str())
        .map(|ratio| ImageConfig {
            aspect_ratio: ratio.to_string(),
        });

    GenerateContentRequest {
        contents: vec![Content { role: None, parts }],
        generation_config: GenerationConfig {
            response_modalities: vec![Modality::Image],
            temperature: req.options.temperature,
            seed: req.options.seed,
            image_config,
        },
    }
}

fn inline_part(image: &ImagePayload) -> Part {
    Part {
        text: None,
        inline_data: Some(InlineData {
            mime_type: image.media_type.clone(),
            data: STANDARD.encode(&image.bytes),
        }),
    }
}

/// Pull the first image out of a response, or explain why there is none.
pub fn from_gemini_response(resp: GenerateContentResponse) -> Result<EditResult, Error> {
    let candidate = resp.candidates.into_iter().next();
    let finish_reason = candidate
        .as_ref()
        .and_then(|c| c.finish_reason.as_deref())
        .map(map_finish_reason)
        .unwrap_or(FinishReason::Stop);

    let parts = candidate
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default();

    let mut text: Option<String> = None;
    for part in parts {
        if let Some(inline) = part.inline_data {
            let bytes = STANDARD
                .decode(inline.data.as_bytes())
                .map_err(|e| Error::Other(format!("invalid image data in response: {e}")))?;
            return Ok(EditResult {
                image: ImagePayload::new(bytes, inline.mime_type),
                text,
                finish_reason,
            });
        }
        if let Some(t) = part.text {
            text.get_or_insert_with(String::new).push_str(&t);
        }
    }

    match resp.prompt_feedback {
        Some(feedback) if feedback.block_reason.is_some() => Err(blocked(feedback)),
        _ => Err(Error::NoImage),
    }
}

fn blocked(feedback: PromptFeedback) -> Error {
    let reason = feedback
        .block_reason
        .as_deref()
        .map(humanize)
        .unwrap_or_default();
    let categories = feedback
        .safety_ratings
        .iter()
        .filter(|rating| matches!(rating.probability.as_str(), "MEDIUM" | "HIGH"))
        .map(|rating| {
            let category = rating
                .category
                .strip_prefix("HARM_CATEGORY_")
                .unwrap_or(&rating.category);
            humanize(category)
        })
        .collect();

    Error::Blocked { reason, categories }
}

fn humanize(value: &str) -> String {
    value.to_lowercase().replace('_', " ")
}

fn map_finish_reason(value: &str) -> FinishReason {
    match value {
        "STOP" => FinishReason::Stop,
        "SAFETY" | "IMAGE_SAFETY" | "PROHIBITED_CONTENT" => FinishReason::Safety,
        other => FinishReason::Other(other.to_string()),
    }
}
