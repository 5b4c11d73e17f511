//! Concrete implementations of the collaborator interfaces

pub mod openai;
pub mod writer;

pub use openai::OpenAiCompletion;
pub use writer::MarkdownWriter;
