#![allow(clippy::missing_docs_in_private_items)]

pub mod pipeline;
pub mod studio;
pub mod utils;

pub use pipeline::{
    GenerationResult, GenerationServices, JobHandle, JobStatus, PollTuning, VideoJobConfig,
    VideoJobPipeline,
};
pub use studio::DreamStudio;
