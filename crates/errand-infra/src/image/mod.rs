//! Image generation backend.

pub mod openai;

pub use openai::OpenAiImageGenerator;
