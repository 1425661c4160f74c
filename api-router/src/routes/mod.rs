pub mod analyze;
pub mod image;
pub mod liveness;
pub mod readiness;
pub mod video;
