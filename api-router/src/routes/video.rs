use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use common::types::generation::{AspectRatio, Resolution, VideoConfig};
use serde::Deserialize;
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct VideoRequest {
    pub visual_prompt: String,
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
}

/// Runs a video job to completion and streams back the downloaded clip.
///
/// The request stays open for the whole job; the poll budget from the
/// configuration bounds how long that can take.
pub async fn generate_video(
    State(state): State<ApiState>,
    Json(input): Json<VideoRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let video_config = VideoConfig {
        resolution: input.resolution,
        aspect_ratio: input.aspect_ratio,
        ..VideoConfig::default()
    };

    let video = state
        .studio
        .generate_video(&input.visual_prompt, &video_config)
        .await?;

    info!(result_ref = %video.result_ref, bytes = video.bytes.len(), "Video delivered");

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, video.mime_type)],
        video.bytes,
    ))
}
