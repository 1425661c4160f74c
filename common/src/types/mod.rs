pub mod attachment;
pub mod dream_analysis;
pub mod generation;
