pub mod batcher;
pub mod chunker;
pub mod error_log;
pub mod llm_service;
pub mod outline_builder;
pub mod script_classifier;

pub use chunker::ChunkPolicy;
pub use error_log::ErrorLog;
pub use llm_service::LlmService;
pub use script_classifier::{ScriptClassifier, ScriptRanges};
