use std::future::Future;

use common::error::JobError;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::error;

use super::{
    config::VideoJobConfig,
    job_result::{JobHandle, JobStatus},
    services::GenerationServices,
};

/// A submitted job as seen by the poll loop.
#[derive(Debug, Clone)]
pub struct GenerationJob {
    pub handle: JobHandle,
    pub done: bool,
    pub result_ref: Option<String>,
}

impl GenerationJob {
    pub fn new(handle: JobHandle) -> Self {
        Self {
            handle,
            done: false,
            result_ref: None,
        }
    }
}

pub struct JobContext<'a> {
    pub job_id: String,
    pub pipeline_config: &'a VideoJobConfig,
    pub services: &'a dyn GenerationServices,
    pub cancel: Option<&'a CancellationToken>,
    pub job: Option<GenerationJob>,
    pub terminal: Option<JobStatus>,
    pub attempts: u32,
    pub started: Instant,
}

impl<'a> JobContext<'a> {
    pub fn new(
        job_id: String,
        pipeline_config: &'a VideoJobConfig,
        services: &'a dyn GenerationServices,
        cancel: Option<&'a CancellationToken>,
    ) -> Self {
        Self {
            job_id,
            pipeline_config,
            services,
            cancel,
            job: None,
            terminal: None,
            attempts: 0,
            started: Instant::now(),
        }
    }

    pub fn job(&self) -> Result<&GenerationJob, JobError> {
        self.job
            .as_ref()
            .ok_or_else(|| JobError::Internal("job expected to be submitted".into()))
    }

    pub fn job_mut(&mut self) -> Result<&mut GenerationJob, JobError> {
        self.job
            .as_mut()
            .ok_or_else(|| JobError::Internal("job expected to be submitted".into()))
    }

    pub fn take_terminal(&mut self) -> Result<JobStatus, JobError> {
        self.terminal.take().ok_or_else(|| {
            JobError::Internal("terminal status expected to be available for extraction".into())
        })
    }

    pub fn abort(&mut self, err: JobError) -> JobError {
        error!(
            job_id = %self.job_id,
            handle = self.job.as_ref().map_or("unsubmitted", |job| job.handle.as_str()),
            attempts = self.attempts,
            error = %err,
            "generation job aborted"
        );
        err
    }
}

/// Runs `fut` to completion unless the token fires first.
pub async fn cancellable<T, F>(cancel: Option<&CancellationToken>, fut: F) -> Result<T, JobError>
where
    F: Future<Output = Result<T, JobError>>,
{
    match cancel {
        Some(token) => {
            tokio::select! {
                biased;
                () = token.cancelled() => Err(JobError::Cancelled),
                result = fut => result,
            }
        }
        None => fut.await,
    }
}
