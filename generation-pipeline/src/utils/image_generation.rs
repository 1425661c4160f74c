use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use common::{
    error::AppError,
    types::generation::{GeneratedImage, ImageConfig},
    utils::config::AppConfig,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::pipeline::API_KEY_HEADER;

pub fn image_request_body(visual_prompt: &str, image_config: &ImageConfig) -> Value {
    json!({
        "contents": [ { "parts": [ { "text": visual_prompt } ] } ],
        "generationConfig": {
            "responseModalities": ["IMAGE"],
            "imageConfig": {
                "aspectRatio": image_config.aspect_ratio.as_str(),
                "imageSize": image_config.image_size.as_str()
            }
        }
    })
}

/// Returns the first inline image of the first candidate.
pub fn extract_inline_image(response: &Value) -> Result<GeneratedImage, AppError> {
    let parts = response
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .map_or(&[][..], Vec::as_slice);

    let inline = parts
        .iter()
        .find_map(|part| part.get("inlineData"))
        .ok_or_else(|| AppError::LLMParsing("No image generated".into()))?;

    let data = inline
        .get("data")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::LLMParsing("Inline image had no data".into()))?;
    let mime_type = inline
        .get("mimeType")
        .and_then(Value::as_str)
        .unwrap_or("image/png")
        .to_string();

    let bytes = STANDARD
        .decode(data)
        .map_err(|e| AppError::LLMParsing(format!("Inline image was not valid base64: {e}")))?;

    Ok(GeneratedImage {
        mime_type,
        bytes: Bytes::from(bytes),
    })
}

pub async fn generate_dream_image(
    client: &reqwest::Client,
    config: &AppConfig,
    visual_prompt: &str,
    image_config: &ImageConfig,
) -> Result<GeneratedImage, AppError> {
    let url = format!(
        "{}/models/{}:generateContent",
        config.gemini_base_url.trim_end_matches('/'),
        config.image_model
    );

    let response = client
        .post(url)
        .header(API_KEY_HEADER, &config.gemini_api_key)
        .json(&image_request_body(visual_prompt, image_config))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Service(format!("{status} - {body}")));
    }

    let body: Value = response.json().await?;
    let image = extract_inline_image(&body)?;

    debug!(
        mime_type = %image.mime_type,
        bytes = image.bytes.len(),
        "dream image generated"
    );

    Ok(image)
}
