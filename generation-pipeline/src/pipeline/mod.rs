mod config;
mod context;
mod job_result;
mod services;
mod stages;
mod state;

pub use config::{PollTuning, VideoJobConfig};
pub use context::GenerationJob;
pub use job_result::{extract_result_ref, GenerationResult, JobHandle, JobStatus, RESULT_URI_POINTER};
#[allow(clippy::module_name_repetitions)]
pub use services::{DefaultGenerationServices, GenerationServices, API_KEY_HEADER};

use std::sync::Arc;

use common::{
    error::JobError,
    types::generation::{GeneratedVideo, VideoConfig},
    utils::config::AppConfig,
};
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use self::{
    context::JobContext,
    stages::{download_artifact, duration_millis, extract_result, poll_until_done, submit_job},
    state::idle,
};

const VIDEO_MIME_TYPE: &str = "video/mp4";

/// Submits a video generation job and waits for it to finish.
#[allow(clippy::module_name_repetitions)]
pub struct VideoJobPipeline {
    pipeline_config: VideoJobConfig,
    services: Arc<dyn GenerationServices>,
}

impl VideoJobPipeline {
    pub fn new(client: reqwest::Client, config: &AppConfig) -> Self {
        let services = DefaultGenerationServices::new(client, config);
        Self::with_services(
            VideoJobConfig::from_app_config(config),
            Arc::new(services),
        )
    }

    pub fn with_services(
        pipeline_config: VideoJobConfig,
        services: Arc<dyn GenerationServices>,
    ) -> Self {
        Self {
            pipeline_config,
            services,
        }
    }

    /// Polls until the job reports done, a query fails, or a configured bound is hit.
    pub async fn run_job_to_completion(
        &self,
        prompt: &str,
        video_config: &VideoConfig,
    ) -> Result<GenerationResult, JobError> {
        let mut ctx = self.context(None);
        self.drive_job(&mut ctx, prompt, video_config).await
    }

    pub async fn run_job_to_completion_with_cancel(
        &self,
        prompt: &str,
        video_config: &VideoConfig,
        cancel: &CancellationToken,
    ) -> Result<GenerationResult, JobError> {
        let mut ctx = self.context(Some(cancel));
        self.drive_job(&mut ctx, prompt, video_config).await
    }

    /// Runs the job and downloads the produced video.
    pub async fn generate_video(
        &self,
        prompt: &str,
        video_config: &VideoConfig,
    ) -> Result<GeneratedVideo, JobError> {
        let mut ctx = self.context(None);
        self.drive_download(&mut ctx, prompt, video_config).await
    }

    pub async fn generate_video_with_cancel(
        &self,
        prompt: &str,
        video_config: &VideoConfig,
        cancel: &CancellationToken,
    ) -> Result<GeneratedVideo, JobError> {
        let mut ctx = self.context(Some(cancel));
        self.drive_download(&mut ctx, prompt, video_config).await
    }

    fn context<'a>(&'a self, cancel: Option<&'a CancellationToken>) -> JobContext<'a> {
        JobContext::new(
            Uuid::new_v4().to_string(),
            &self.pipeline_config,
            self.services.as_ref(),
            cancel,
        )
    }

    #[tracing::instrument(skip_all, fields(job_id = %ctx.job_id))]
    async fn drive_job(
        &self,
        ctx: &mut JobContext<'_>,
        prompt: &str,
        video_config: &VideoConfig,
    ) -> Result<GenerationResult, JobError> {
        let machine = idle();

        let machine = submit_job(machine, ctx, prompt, video_config)
            .await
            .map_err(|err| ctx.abort(err))?;
        let machine = poll_until_done(machine, ctx)
            .await
            .map_err(|err| ctx.abort(err))?;
        let result = extract_result(machine, ctx).map_err(|err| ctx.abort(err))?;

        info!(
            job_id = %ctx.job_id,
            handle = %result.handle,
            attempts = result.attempts,
            total_ms = duration_millis(result.elapsed),
            "generation job finished"
        );

        Ok(result)
    }

    async fn drive_download(
        &self,
        ctx: &mut JobContext<'_>,
        prompt: &str,
        video_config: &VideoConfig,
    ) -> Result<GeneratedVideo, JobError> {
        let result = self.drive_job(ctx, prompt, video_config).await?;
        let bytes = download_artifact(ctx, &result)
            .await
            .map_err(|err| ctx.abort(err))?;

        Ok(GeneratedVideo {
            result_ref: result.result_ref,
            mime_type: VIDEO_MIME_TYPE.to_string(),
            bytes,
        })
    }
}

#[cfg(test)]
mod tests;
