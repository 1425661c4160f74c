use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart};
use common::types::attachment::DreamAttachment;
use futures::future::try_join_all;
use tempfile::NamedTempFile;
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, TryFromMultipart)]
pub struct AnalyzeParams {
    pub text: Option<String>,
    // Per-file size is checked against the configured attachment limit.
    #[form_data(limit = "unlimited")]
    #[form_data(default)]
    pub files: Vec<FieldData<NamedTempFile>>,
}

pub async fn analyze_dream(
    State(state): State<ApiState>,
    TypedMultipart(input): TypedMultipart<AnalyzeParams>,
) -> Result<impl IntoResponse, ApiError> {
    let text = input.text.unwrap_or_default();
    let max_bytes = state.studio.config().attachment_max_bytes;

    info!(
        text_bytes = text.len(),
        file_count = input.files.len(),
        "Received dream analysis request"
    );

    let attachments = try_join_all(
        input
            .files
            .into_iter()
            .map(|file| DreamAttachment::from_field_data(file, max_bytes)),
    )
    .await?;

    let analysis = state.studio.analyze(&text, &attachments).await?;

    Ok((StatusCode::OK, Json(analysis)))
}
