use std::time::Duration;

use common::utils::config::AppConfig;

/// Timing of the status poll loop. Without bounds a job is polled until the
/// service reports it done or a query fails.
#[derive(Debug, Clone)]
pub struct PollTuning {
    pub poll_interval: Duration,
    pub max_poll_attempts: Option<u32>,
    pub max_wait: Option<Duration>,
}

impl Default for PollTuning {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(5_000),
            max_poll_attempts: None,
            max_wait: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VideoJobConfig {
    pub tuning: PollTuning,
}

impl VideoJobConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            tuning: PollTuning {
                poll_interval: config.video_poll_interval(),
                max_poll_attempts: config.video_max_poll_attempts,
                max_wait: config.video_max_wait(),
            },
        }
    }
}
