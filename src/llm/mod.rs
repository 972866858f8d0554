//! Text-generation backends.

pub mod backend;
pub mod openai;

pub use backend::{Completion, TextBackend};
pub use openai::OpenAiCompatibleBackend;
