use bytes::Bytes;
use common::{error::JobError, types::generation::VideoConfig};
use state_machines::core::GuardError;
use tokio::time::{sleep, timeout_at};
use tracing::{debug, info, instrument};

use super::{
    context::{cancellable, GenerationJob, JobContext},
    job_result::{extract_result_ref, GenerationResult},
    state::{Done, GenerationMachine, Idle, Polling, Submitted},
};

#[instrument(level = "trace", skip_all, fields(job_id = %ctx.job_id))]
pub async fn submit_job(
    machine: GenerationMachine<(), Idle>,
    ctx: &mut JobContext<'_>,
    prompt: &str,
    video_config: &VideoConfig,
) -> Result<GenerationMachine<(), Submitted>, JobError> {
    if prompt.trim().is_empty() {
        return Err(JobError::Submission("prompt must not be empty".into()));
    }

    let handle = cancellable(ctx.cancel, ctx.services.submit(prompt, video_config)).await?;

    info!(
        job_id = %ctx.job_id,
        handle = %handle,
        prompt_chars = prompt.chars().count(),
        output_count = video_config.output_count,
        resolution = video_config.resolution.as_str(),
        aspect_ratio = video_config.aspect_ratio.as_str(),
        "generation job submitted"
    );

    ctx.job = Some(GenerationJob::new(handle));

    machine
        .submit()
        .map_err(|(_, guard)| map_guard_error("submit", &guard))
}

#[instrument(level = "trace", skip_all, fields(job_id = %ctx.job_id))]
pub async fn poll_until_done(
    machine: GenerationMachine<(), Submitted>,
    ctx: &mut JobContext<'_>,
) -> Result<GenerationMachine<(), Done>, JobError> {
    let machine = machine
        .start_polling()
        .map_err(|(_, guard)| map_guard_error("start_polling", &guard))?;
    let handle = ctx.job()?.handle.clone();
    let pipeline_config = ctx.pipeline_config;
    let services = ctx.services;
    let tuning = &pipeline_config.tuning;
    let deadline = tuning
        .max_wait
        .and_then(|max_wait| ctx.started.checked_add(max_wait));

    loop {
        ctx.attempts = ctx.attempts.saturating_add(1);
        let query = services.query_status(&handle);
        // A hung query must not outlive the wait budget.
        let status = match deadline {
            Some(deadline) => {
                match cancellable(ctx.cancel, async { Ok(timeout_at(deadline, query).await) })
                    .await?
                {
                    Ok(result) => result?,
                    Err(_) => return Err(timeout(ctx)),
                }
            }
            None => cancellable(ctx.cancel, query).await?,
        };

        debug!(
            job_id = %ctx.job_id,
            handle = %handle,
            attempt = ctx.attempts,
            done = status.done,
            elapsed_ms = duration_millis(ctx.started.elapsed()),
            "generation job status"
        );

        if status.done {
            ctx.job_mut()?.done = true;
            ctx.terminal = Some(status);
            return complete(machine);
        }

        if let Some(max_attempts) = tuning.max_poll_attempts {
            if ctx.attempts >= max_attempts {
                return Err(timeout(ctx));
            }
        }
        if let Some(max_wait) = tuning.max_wait {
            if ctx.started.elapsed().saturating_add(tuning.poll_interval) > max_wait {
                return Err(timeout(ctx));
            }
        }

        let interval = tuning.poll_interval;
        cancellable(ctx.cancel, async {
            sleep(interval).await;
            Ok(())
        })
        .await?;
    }
}

#[instrument(level = "trace", skip_all, fields(job_id = %ctx.job_id))]
pub fn extract_result(
    _machine: GenerationMachine<(), Done>,
    ctx: &mut JobContext<'_>,
) -> Result<GenerationResult, JobError> {
    let terminal = ctx.take_terminal()?;
    let result_ref = extract_result_ref(terminal.payload.as_ref())?;

    let job = ctx.job_mut()?;
    job.result_ref = Some(result_ref.clone());
    let handle = job.handle.clone();

    Ok(GenerationResult {
        handle,
        result_ref,
        attempts: ctx.attempts,
        elapsed: ctx.started.elapsed(),
    })
}

#[instrument(level = "trace", skip_all, fields(job_id = %ctx.job_id))]
pub async fn download_artifact(
    ctx: &mut JobContext<'_>,
    result: &GenerationResult,
) -> Result<Bytes, JobError> {
    let bytes = cancellable(ctx.cancel, ctx.services.download(&result.result_ref)).await?;

    debug!(
        job_id = %ctx.job_id,
        handle = %result.handle,
        bytes = bytes.len(),
        "generated artifact downloaded"
    );

    Ok(bytes)
}

fn complete(
    machine: GenerationMachine<(), Polling>,
) -> Result<GenerationMachine<(), Done>, JobError> {
    machine
        .complete()
        .map_err(|(_, guard)| map_guard_error("complete", &guard))
}

fn timeout(ctx: &JobContext<'_>) -> JobError {
    JobError::Timeout {
        attempts: ctx.attempts,
        elapsed: ctx.started.elapsed(),
    }
}

pub(crate) fn duration_millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn map_guard_error(event: &str, guard: &GuardError) -> JobError {
    JobError::Internal(format!(
        "invalid generation job transition during {event}: {guard:?}"
    ))
}
