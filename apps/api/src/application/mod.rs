//! Application assistant: posting text, LLM analysis, cover-letter
//! composition and archiving.

pub mod assistant;
pub mod handlers;
pub mod prompts;
pub mod service;
pub mod storage;

pub use assistant::{ApplicationAssistant, LlmApplicationAssistant};
pub use service::ApplicationService;
pub use storage::{DocumentArchive, S3Archive, StorageService};
