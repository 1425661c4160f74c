use std::sync::Arc;

use async_openai::{config::OpenAIConfig, Client};
use common::{
    error::AppError,
    types::{
        attachment::DreamAttachment,
        dream_analysis::DreamAnalysis,
        generation::{GeneratedImage, GeneratedVideo, ImageConfig, VideoConfig},
    },
    utils::config::AppConfig,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    pipeline::{VideoJobPipeline, API_KEY_HEADER},
    utils::{dream_analysis::analyze_dream, image_generation::generate_dream_image},
};

/// Entry point for the three dream operations: analysis, still image, video.
#[derive(Clone)]
pub struct DreamStudio {
    config: AppConfig,
    openai_client: Arc<Client<OpenAIConfig>>,
    http_client: reqwest::Client,
    video_pipeline: Arc<VideoJobPipeline>,
}

impl DreamStudio {
    pub fn new(config: AppConfig) -> Result<Self, AppError> {
        if !config.has_api_key() {
            return Err(AppError::Auth("API key not found in configuration".into()));
        }

        let openai_client = Arc::new(Client::with_config(
            OpenAIConfig::new()
                .with_api_key(&config.gemini_api_key)
                .with_api_base(config.openai_compat_base_url()),
        ));
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        let video_pipeline = Arc::new(VideoJobPipeline::new(http_client.clone(), &config));

        Ok(Self::with_parts(
            config,
            openai_client,
            http_client,
            video_pipeline,
        ))
    }

    pub fn with_parts(
        config: AppConfig,
        openai_client: Arc<Client<OpenAIConfig>>,
        http_client: reqwest::Client,
        video_pipeline: Arc<VideoJobPipeline>,
    ) -> Self {
        Self {
            config,
            openai_client,
            http_client,
            video_pipeline,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Confirms the service is reachable and accepts the configured key.
    pub async fn check_service(&self) -> Result<(), AppError> {
        let url = format!(
            "{}/models/{}",
            self.config.gemini_base_url.trim_end_matches('/'),
            self.config.video_model
        );
        let response = self
            .http_client
            .get(url)
            .header(API_KEY_HEADER, &self.config.gemini_api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Service(format!(
                "model lookup returned {status}"
            )));
        }
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(text_chars = dream_text.chars().count(), attachments = attachments.len()))]
    pub async fn analyze(
        &self,
        dream_text: &str,
        attachments: &[DreamAttachment],
    ) -> Result<DreamAnalysis, AppError> {
        if dream_text.trim().is_empty() && attachments.is_empty() {
            return Err(AppError::Validation(
                "Describe the dream or attach at least one file".into(),
            ));
        }

        let analysis = analyze_dream(
            &self.openai_client,
            &self.config.analysis_model,
            dream_text,
            attachments,
        )
        .await?;

        info!(
            title = %analysis.title,
            symbols = analysis.symbolism.len(),
            attachment_bytes = attachments
                .iter()
                .map(|attachment| attachment.byte_len)
                .sum::<usize>(),
            "dream analysis completed"
        );

        Ok(analysis)
    }

    pub async fn generate_image(
        &self,
        visual_prompt: &str,
        image_config: &ImageConfig,
    ) -> Result<GeneratedImage, AppError> {
        ensure_prompt(visual_prompt)?;
        generate_dream_image(&self.http_client, &self.config, visual_prompt, image_config).await
    }

    pub async fn generate_video(
        &self,
        visual_prompt: &str,
        video_config: &VideoConfig,
    ) -> Result<GeneratedVideo, AppError> {
        ensure_prompt(visual_prompt)?;
        Ok(self
            .video_pipeline
            .generate_video(visual_prompt, video_config)
            .await?)
    }

    pub async fn generate_video_with_cancel(
        &self,
        visual_prompt: &str,
        video_config: &VideoConfig,
        cancel: &CancellationToken,
    ) -> Result<GeneratedVideo, AppError> {
        ensure_prompt(visual_prompt)?;
        Ok(self
            .video_pipeline
            .generate_video_with_cancel(visual_prompt, video_config, cancel)
            .await?)
    }
}

fn ensure_prompt(visual_prompt: &str) -> Result<(), AppError> {
    if visual_prompt.trim().is_empty() {
        return Err(AppError::Validation("A visual prompt is required".into()));
    }
    Ok(())
}
