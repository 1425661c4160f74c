use std::{fmt, time::Duration};

use common::error::JobError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON pointer to the first generated video inside a finished operation.
pub const RESULT_URI_POINTER: &str = "/response/generateVideoResponse/generatedSamples/0/video/uri";

/// Opaque identifier of a remote long-running operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One status query response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobStatus {
    pub done: bool,
    pub payload: Option<Value>,
}

impl JobStatus {
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn finished(payload: Value) -> Self {
        Self {
            done: true,
            payload: Some(payload),
        }
    }

    /// Reads an operation body as returned by the service's operations endpoint.
    pub fn from_operation(operation: Value) -> Self {
        let done = operation
            .get("done")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Self {
            done,
            payload: Some(operation),
        }
    }
}

/// Terminal success of a generation job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationResult {
    pub handle: JobHandle,
    pub result_ref: String,
    pub attempts: u32,
    pub elapsed: Duration,
}

pub fn extract_result_ref(payload: Option<&Value>) -> Result<String, JobError> {
    let Some(payload) = payload else {
        return Err(JobError::MissingResult(
            "operation finished without a payload".into(),
        ));
    };

    match payload.pointer(RESULT_URI_POINTER).and_then(Value::as_str) {
        Some(uri) if !uri.trim().is_empty() => Ok(uri.to_string()),
        _ => {
            let reason = payload
                .pointer("/error/message")
                .and_then(Value::as_str)
                .map_or_else(
                    || "no video uri in the terminal payload".to_string(),
                    |message| format!("service reported: {message}"),
                );
            Err(JobError::MissingResult(reason))
        }
    }
}
