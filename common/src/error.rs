use std::time::Duration;

use async_openai::error::OpenAIError;
use config::ConfigError;
use thiserror::Error;

/// Failures of a single long-running generation job. Every variant is terminal
/// for the job that produced it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("Job submission failed: {0}")]
    Submission(String),
    #[error("Job status query failed: {0}")]
    Poll(String),
    #[error("Generation completed but no result was returned: {0}")]
    MissingResult(String),
    #[error("Failed to download generated artifact: {0}")]
    Download(String),
    #[error("Job did not finish after {attempts} status queries ({elapsed:?})")]
    Timeout { attempts: u32, elapsed: Duration },
    #[error("Job was cancelled")]
    Cancelled,
    #[error("Internal job error: {0}")]
    Internal(String),
}

// Core internal errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Generation job error: {0}")]
    Job(#[from] JobError),
    #[error("OpenAI error: {0}")]
    OpenAI(#[from] OpenAIError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Authorization error: {0}")]
    Auth(String),
    #[error("Generation service error: {0}")]
    Service(String),
    #[error("LLM parsing error: {0}")]
    LLMParsing(String),
    #[error("IoError: {0}")]
    Io(#[from] std::io::Error),
    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
    #[error("Internal service error: {0}")]
    InternalError(String),
}
