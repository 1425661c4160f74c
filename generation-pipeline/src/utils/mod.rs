pub mod dream_analysis;
pub mod image_generation;
pub mod llm_instructions;
