use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use common::types::generation::{AspectRatio, ImageConfig, ImageSize};
use serde::Deserialize;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ImageRequest {
    pub visual_prompt: String,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub image_size: ImageSize,
}

/// Renders a still image and returns the raw bytes with their content type.
pub async fn generate_image(
    State(state): State<ApiState>,
    Json(input): Json<ImageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let image_config = ImageConfig {
        aspect_ratio: input.aspect_ratio,
        image_size: input.image_size,
    };

    let image = state
        .studio
        .generate_image(&input.visual_prompt, &image_config)
        .await?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, image.mime_type)],
        image.bytes,
    ))
}
