use crate::encoder::EncodedImage;
use crate::error::{BoothError, Result};

use super::types::{Content, GenerateContentRequest, GenerationConfig, Modality, Part};

pub const ANALYSIS_PROMPT: &str = "Analyze this image in detail. Describe the main subject, \
the background, and any notable features. What is the overall mood or theme of the photo?";

fn user_turn(image: &EncodedImage, instruction: impl Into<String>) -> Content {
    Content {
        role: Some("user".to_string()),
        parts: vec![
            Part::inline(image.mime_type.clone(), image.data.clone()),
            Part::text(instruction),
        ],
    }
}

/// Image followed by the fixed analysis instruction; the model answers in text.
pub fn describe_request(image: &EncodedImage) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![user_turn(image, ANALYSIS_PROMPT)],
        generation_config: None,
    }
}

/// Image followed by the user's edit instruction, asking for image output.
pub fn transform_request(image: &EncodedImage, prompt: &str) -> Result<GenerateContentRequest> {
    if prompt.trim().is_empty() {
        return Err(BoothError::BlankPrompt);
    }

    Ok(GenerateContentRequest {
        contents: vec![user_turn(image, prompt)],
        generation_config: Some(GenerationConfig {
            response_modalities: vec![Modality::Image],
        }),
    })
}
