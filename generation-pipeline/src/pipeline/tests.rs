use std::{collections::VecDeque, sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use common::{
    error::JobError,
    types::generation::{AspectRatio, Resolution, VideoConfig},
};
use serde_json::json;
use tokio::{sync::Mutex, time::Instant};
use tokio_util::sync::CancellationToken;

use super::{
    config::{PollTuning, VideoJobConfig},
    job_result::{JobHandle, JobStatus},
    services::GenerationServices,
    VideoJobPipeline,
};

const POLL_INTERVAL: Duration = Duration::from_millis(5_000);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Submit(String),
    Query(Duration),
    Download(String),
}

struct ScriptedServices {
    submit_result: Result<JobHandle, JobError>,
    statuses: Mutex<VecDeque<Result<JobStatus, JobError>>>,
    download_result: Result<Bytes, JobError>,
    calls: Mutex<Vec<Call>>,
    query_delay: Duration,
    created: Instant,
}

impl ScriptedServices {
    fn new(statuses: Vec<Result<JobStatus, JobError>>) -> Self {
        Self {
            submit_result: Ok(JobHandle::new("models/veo/operations/h")),
            statuses: Mutex::new(statuses.into()),
            download_result: Ok(Bytes::from_static(b"mp4-bytes")),
            calls: Mutex::new(Vec::new()),
            query_delay: Duration::ZERO,
            created: Instant::now(),
        }
    }

    fn failing_submission(err: JobError) -> Self {
        Self {
            submit_result: Err(err),
            ..Self::new(Vec::new())
        }
    }

    fn with_query_delay(mut self, delay: Duration) -> Self {
        self.query_delay = delay;
        self
    }

    fn with_download(mut self, result: Result<Bytes, JobError>) -> Self {
        self.download_result = result;
        self
    }

    async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    async fn query_times(&self) -> Vec<Duration> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                Call::Query(at) => Some(*at),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl GenerationServices for ScriptedServices {
    async fn submit(&self, prompt: &str, _config: &VideoConfig) -> Result<JobHandle, JobError> {
        self.calls.lock().await.push(Call::Submit(prompt.to_string()));
        self.submit_result.clone()
    }

    async fn query_status(&self, _handle: &JobHandle) -> Result<JobStatus, JobError> {
        self.calls
            .lock()
            .await
            .push(Call::Query(self.created.elapsed()));
        if !self.query_delay.is_zero() {
            tokio::time::sleep(self.query_delay).await;
        }
        // An exhausted script keeps the job pending.
        self.statuses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(JobStatus::pending()))
    }

    async fn download(&self, uri: &str) -> Result<Bytes, JobError> {
        self.calls.lock().await.push(Call::Download(uri.to_string()));
        self.download_result.clone()
    }
}

fn finished_with(uri: &str) -> JobStatus {
    JobStatus::finished(json!({
        "name": "models/veo/operations/h",
        "done": true,
        "response": {
            "generateVideoResponse": {
                "generatedSamples": [ { "video": { "uri": uri } } ]
            }
        }
    }))
}

fn pipeline_with(services: &Arc<ScriptedServices>, tuning: PollTuning) -> VideoJobPipeline {
    VideoJobPipeline::with_services(
        VideoJobConfig { tuning },
        Arc::clone(services) as Arc<dyn GenerationServices>,
    )
}

fn default_pipeline(services: &Arc<ScriptedServices>) -> VideoJobPipeline {
    pipeline_with(
        services,
        PollTuning {
            poll_interval: POLL_INTERVAL,
            ..PollTuning::default()
        },
    )
}

fn forest_config() -> VideoConfig {
    VideoConfig {
        output_count: 1,
        resolution: Resolution::P720,
        aspect_ratio: AspectRatio::Landscape,
    }
}

#[tokio::test(start_paused = true)]
async fn surreal_forest_scenario_polls_three_times() {
    let services = Arc::new(ScriptedServices::new(vec![
        Ok(JobStatus::pending()),
        Ok(JobStatus::pending()),
        Ok(finished_with("https://example/video123")),
    ]));
    let pipeline = default_pipeline(&services);

    let result = pipeline
        .run_job_to_completion("a surreal forest", &forest_config())
        .await
        .expect("job should succeed");

    assert_eq!(result.result_ref, "https://example/video123");
    assert_eq!(result.handle, JobHandle::new("models/veo/operations/h"));
    assert_eq!(result.attempts, 3);
    assert_eq!(result.elapsed, POLL_INTERVAL * 2);
    assert_eq!(
        services.query_times().await,
        vec![Duration::ZERO, POLL_INTERVAL, POLL_INTERVAL * 2]
    );
}

#[tokio::test(start_paused = true)]
async fn success_always_carries_a_result_ref() {
    let services = Arc::new(ScriptedServices::new(vec![Ok(finished_with(
        "https://example/immediate",
    ))]));
    let pipeline = default_pipeline(&services);

    let result = pipeline
        .run_job_to_completion("instant dream", &VideoConfig::default())
        .await
        .expect("job should succeed");

    assert!(!result.result_ref.is_empty());
    assert_eq!(result.attempts, 1);
    assert_eq!(result.elapsed, Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn failed_submission_never_polls() {
    let services = Arc::new(ScriptedServices::failing_submission(JobError::Submission(
        "429 - quota exceeded".into(),
    )));
    let pipeline = default_pipeline(&services);

    let err = pipeline
        .run_job_to_completion("a surreal forest", &forest_config())
        .await
        .expect_err("submission fails");

    assert_eq!(err, JobError::Submission("429 - quota exceeded".into()));
    assert_eq!(
        services.calls().await,
        vec![Call::Submit("a surreal forest".into())]
    );
}

#[tokio::test(start_paused = true)]
async fn blank_prompt_is_rejected_before_submission() {
    let services = Arc::new(ScriptedServices::new(Vec::new()));
    let pipeline = default_pipeline(&services);

    let err = pipeline
        .run_job_to_completion("   ", &forest_config())
        .await
        .expect_err("blank prompt");

    assert!(matches!(err, JobError::Submission(_)));
    assert!(services.calls().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn poll_error_stops_the_loop() {
    let services = Arc::new(ScriptedServices::new(vec![
        Ok(JobStatus::pending()),
        Err(JobError::Poll("503 - backend unavailable".into())),
        Ok(finished_with("https://example/never")),
    ]));
    let pipeline = default_pipeline(&services);

    let err = pipeline
        .run_job_to_completion("a surreal forest", &forest_config())
        .await
        .expect_err("poll fails");

    assert_eq!(err, JobError::Poll("503 - backend unavailable".into()));
    assert_eq!(services.query_times().await.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn done_without_artifact_is_missing_result() {
    let services = Arc::new(ScriptedServices::new(vec![Ok(JobStatus::finished(
        json!({ "name": "models/veo/operations/h", "done": true, "response": {} }),
    ))]));
    let pipeline = default_pipeline(&services);

    let err = pipeline
        .run_job_to_completion("a surreal forest", &forest_config())
        .await
        .expect_err("no artifact");

    assert!(matches!(err, JobError::MissingResult(_)));
    assert_eq!(services.query_times().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn default_tuning_keeps_polling_past_many_attempts() {
    let mut statuses: Vec<Result<JobStatus, JobError>> =
        (0..40).map(|_| Ok(JobStatus::pending())).collect();
    statuses.push(Ok(finished_with("https://example/slow")));
    let services = Arc::new(ScriptedServices::new(statuses));
    let pipeline = default_pipeline(&services);

    let result = pipeline
        .run_job_to_completion("slow dream", &forest_config())
        .await
        .expect("unbounded polling eventually succeeds");

    assert_eq!(result.attempts, 41);
    assert_eq!(result.elapsed, POLL_INTERVAL * 40);
}

#[tokio::test(start_paused = true)]
async fn attempt_bound_times_out_without_extra_query() {
    let services = Arc::new(ScriptedServices::new(Vec::new()));
    let pipeline = pipeline_with(
        &services,
        PollTuning {
            poll_interval: POLL_INTERVAL,
            max_poll_attempts: Some(3),
            max_wait: None,
        },
    );

    let err = pipeline
        .run_job_to_completion("a surreal forest", &forest_config())
        .await
        .expect_err("times out");

    assert_eq!(
        err,
        JobError::Timeout {
            attempts: 3,
            elapsed: POLL_INTERVAL * 2,
        }
    );
    assert_eq!(services.query_times().await.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn wait_bound_times_out_before_overshooting() {
    let services = Arc::new(ScriptedServices::new(Vec::new()));
    let pipeline = pipeline_with(
        &services,
        PollTuning {
            poll_interval: POLL_INTERVAL,
            max_poll_attempts: None,
            max_wait: Some(Duration::from_secs(12)),
        },
    );

    let err = pipeline
        .run_job_to_completion("a surreal forest", &forest_config())
        .await
        .expect_err("times out");

    assert!(matches!(err, JobError::Timeout { attempts: 3, .. }));
    assert_eq!(
        services.query_times().await,
        vec![Duration::ZERO, POLL_INTERVAL, POLL_INTERVAL * 2]
    );
}

#[tokio::test(start_paused = true)]
async fn hung_query_is_cut_off_at_the_wait_bound() {
    let services = Arc::new(
        ScriptedServices::new(vec![Ok(finished_with("https://example/late"))])
            .with_query_delay(Duration::from_secs(3_600)),
    );
    let pipeline = pipeline_with(
        &services,
        PollTuning {
            poll_interval: POLL_INTERVAL,
            max_poll_attempts: None,
            max_wait: Some(Duration::from_secs(12)),
        },
    );

    let started = Instant::now();
    let err = pipeline
        .run_job_to_completion("a surreal forest", &forest_config())
        .await
        .expect_err("times out");

    assert_eq!(
        err,
        JobError::Timeout {
            attempts: 1,
            elapsed: Duration::from_secs(12),
        }
    );
    assert_eq!(started.elapsed(), Duration::from_secs(12));
    assert_eq!(services.query_times().await, vec![Duration::ZERO]);
}

#[tokio::test(start_paused = true)]
async fn slow_query_within_the_wait_bound_still_completes() {
    let services = Arc::new(
        ScriptedServices::new(vec![Ok(finished_with("https://example/slow"))])
            .with_query_delay(Duration::from_secs(3)),
    );
    let pipeline = pipeline_with(
        &services,
        PollTuning {
            poll_interval: POLL_INTERVAL,
            max_poll_attempts: None,
            max_wait: Some(Duration::from_secs(12)),
        },
    );

    let result = pipeline
        .run_job_to_completion("a surreal forest", &forest_config())
        .await
        .expect("job finishes");

    assert_eq!(result.result_ref, "https://example/slow");
    assert_eq!(result.elapsed, Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_the_wait() {
    let services = Arc::new(ScriptedServices::new(Vec::new()));
    let pipeline = default_pipeline(&services);
    let token = CancellationToken::new();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(7)).await;
        canceller.cancel();
    });

    let err = pipeline
        .run_job_to_completion_with_cancel("a surreal forest", &forest_config(), &token)
        .await
        .expect_err("cancelled");

    assert_eq!(err, JobError::Cancelled);
    assert_eq!(
        services.query_times().await,
        vec![Duration::ZERO, POLL_INTERVAL]
    );
}

#[tokio::test(start_paused = true)]
async fn cancelled_token_prevents_submission() {
    let services = Arc::new(ScriptedServices::new(Vec::new()));
    let pipeline = default_pipeline(&services);
    let token = CancellationToken::new();
    token.cancel();

    let err = pipeline
        .run_job_to_completion_with_cancel("a surreal forest", &forest_config(), &token)
        .await
        .expect_err("cancelled");

    assert_eq!(err, JobError::Cancelled);
    assert!(services.calls().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn generate_video_downloads_the_artifact() {
    let services = Arc::new(ScriptedServices::new(vec![
        Ok(JobStatus::pending()),
        Ok(finished_with("https://example/video123")),
    ]));
    let pipeline = default_pipeline(&services);

    let video = pipeline
        .generate_video("a surreal forest", &forest_config())
        .await
        .expect("video downloaded");

    assert_eq!(video.result_ref, "https://example/video123");
    assert_eq!(video.mime_type, "video/mp4");
    assert_eq!(video.bytes, Bytes::from_static(b"mp4-bytes"));
    assert_eq!(
        services.calls().await.last(),
        Some(&Call::Download("https://example/video123".into()))
    );
}

#[tokio::test(start_paused = true)]
async fn failed_download_is_reported() {
    let services = Arc::new(
        ScriptedServices::new(vec![Ok(finished_with("https://example/video123"))])
            .with_download(Err(JobError::Download("service responded with 404".into()))),
    );
    let pipeline = default_pipeline(&services);

    let err = pipeline
        .generate_video("a surreal forest", &forest_config())
        .await
        .expect_err("download fails");

    assert_eq!(err, JobError::Download("service responded with 404".into()));
}

#[tokio::test(start_paused = true)]
async fn concurrent_jobs_are_independent() {
    let services = Arc::new(ScriptedServices::new(vec![
        Ok(finished_with("https://example/a")),
        Ok(finished_with("https://example/b")),
    ]));
    let pipeline = default_pipeline(&services);
    let config = forest_config();

    let (first, second) = tokio::join!(
        pipeline.run_job_to_completion("first", &config),
        pipeline.run_job_to_completion("second", &config),
    );

    let mut refs = vec![
        first.expect("first job").result_ref,
        second.expect("second job").result_ref,
    ];
    refs.sort();
    assert_eq!(refs, vec!["https://example/a", "https://example/b"]);

    let submissions = services
        .calls()
        .await
        .into_iter()
        .filter(|call| matches!(call, Call::Submit(_)))
        .count();
    assert_eq!(submissions, 2);
}
