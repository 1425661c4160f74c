use common::{error::AppError, utils::config::AppConfig};
use generation_pipeline::DreamStudio;

#[derive(Clone)]
pub struct ApiState {
    pub studio: DreamStudio,
}

impl ApiState {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let studio = DreamStudio::new(config.clone())?;

        Ok(Self { studio })
    }
}
