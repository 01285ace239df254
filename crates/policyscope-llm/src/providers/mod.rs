//! Hosted provider implementations.

pub mod common;
pub mod gemini;
pub mod openai;

pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;
