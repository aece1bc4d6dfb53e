pub mod llm_client;
pub mod notion_client;

pub use llm_client::{Generation, Generator, LlmClient, TokenUsage};
pub use notion_client::{DocumentStore, NotionClient};
