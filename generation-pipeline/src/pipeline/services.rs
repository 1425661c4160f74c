use async_trait::async_trait;
use bytes::Bytes;
use common::{error::JobError, types::generation::VideoConfig, utils::config::AppConfig};
use serde::Serialize;
use serde_json::Value;

use super::job_result::{JobHandle, JobStatus};

pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// Remote calls the video job pipeline depends on.
#[async_trait]
pub trait GenerationServices: Send + Sync {
    async fn submit(&self, prompt: &str, config: &VideoConfig) -> Result<JobHandle, JobError>;

    async fn query_status(&self, handle: &JobHandle) -> Result<JobStatus, JobError>;

    async fn download(&self, uri: &str) -> Result<Bytes, JobError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters<'a> {
    number_of_videos: u32,
    resolution: &'a str,
    aspect_ratio: &'a str,
}

#[derive(Serialize)]
struct PredictInstance<'a> {
    prompt: &'a str,
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    instances: [PredictInstance<'a>; 1],
    parameters: PredictParameters<'a>,
}

/// Talks to the hosted service's REST API with the credentials in [`AppConfig`].
pub struct DefaultGenerationServices {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    video_model: String,
}

impl DefaultGenerationServices {
    pub fn new(client: reqwest::Client, config: &AppConfig) -> Self {
        Self {
            client,
            api_key: config.gemini_api_key.clone(),
            base_url: config.gemini_base_url.trim_end_matches('/').to_string(),
            video_model: config.video_model.clone(),
        }
    }

    fn submit_url(&self) -> String {
        format!(
            "{}/models/{}:predictLongRunning",
            self.base_url, self.video_model
        )
    }

    fn operation_url(&self, handle: &JobHandle) -> String {
        format!("{}/{}", self.base_url, handle.as_str().trim_start_matches('/'))
    }
}

#[async_trait]
impl GenerationServices for DefaultGenerationServices {
    async fn submit(&self, prompt: &str, config: &VideoConfig) -> Result<JobHandle, JobError> {
        let request = PredictRequest {
            instances: [PredictInstance { prompt }],
            parameters: PredictParameters {
                number_of_videos: config.output_count,
                resolution: config.resolution.as_str(),
                aspect_ratio: config.aspect_ratio.as_str(),
            },
        };

        let response = self
            .client
            .post(self.submit_url())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| JobError::Submission(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JobError::Submission(format!("{status} - {body}")));
        }

        let operation: Value = response
            .json()
            .await
            .map_err(|e| JobError::Submission(format!("unreadable operation: {e}")))?;

        operation
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .map(JobHandle::new)
            .ok_or_else(|| JobError::Submission("service returned no operation name".into()))
    }

    async fn query_status(&self, handle: &JobHandle) -> Result<JobStatus, JobError> {
        let response = self
            .client
            .get(self.operation_url(handle))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| JobError::Poll(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(JobError::Poll(format!("{status} - {body}")));
        }

        let operation: Value = response
            .json()
            .await
            .map_err(|e| JobError::Poll(format!("unreadable operation: {e}")))?;

        Ok(JobStatus::from_operation(operation))
    }

    async fn download(&self, uri: &str) -> Result<Bytes, JobError> {
        let response = self
            .client
            .get(uri)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| JobError::Download(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(JobError::Download(format!("service responded with {status}")));
        }

        response
            .bytes()
            .await
            .map_err(|e| JobError::Download(e.to_string()))
    }
}
