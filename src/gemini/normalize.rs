//! Pulls the payload the caller asked for out of a `generateContent` response.

use serde::Serialize;

use crate::error::{BoothError, Result};

use super::types::GenerateContentResponse;

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeneratedResult {
    Image { data: String, mime_type: String },
    Text { data: String },
}

/// A generated picture, still base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub data: String,
    pub mime_type: String,
}

impl From<GeneratedImage> for GeneratedResult {
    fn from(image: GeneratedImage) -> Self {
        GeneratedResult::Image {
            data: image.data,
            mime_type: image.mime_type,
        }
    }
}

const FALLBACK_IMAGE_MIME: &str = "image/png";

/// All text parts of the first candidate, joined.
pub fn text_of(response: &GenerateContentResponse) -> Result<String> {
    let text: String = response
        .first_candidate_parts()
        .iter()
        .filter_map(|part| part.text.as_deref())
        .collect();

    if !text.trim().is_empty() {
        return Ok(text);
    }

    match response.block_reason() {
        Some(reason) => Err(BoothError::EmptyResponse(format!(
            "The request was blocked by the service ({reason})."
        ))),
        None => Err(BoothError::empty_response()),
    }
}

/// The first part carrying inline image data. Text and any later images in the
/// same response are dropped.
pub fn first_image_of(response: &GenerateContentResponse) -> Result<GeneratedImage> {
    let inline = response
        .first_candidate_parts()
        .iter()
        .filter_map(|part| part.inline_data.as_ref())
        .find(|inline| !inline.data.is_empty())
        .ok_or(BoothError::NoImageGenerated)?;

    let mime_type = if inline.mime_type.trim().is_empty() {
        FALLBACK_IMAGE_MIME.to_string()
    } else {
        inline.mime_type.clone()
    };

    Ok(GeneratedImage {
        data: inline.data.clone(),
        mime_type,
    })
}
