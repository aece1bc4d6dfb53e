//! 编排层：资源准备、分块调度、顺序发布与失败回滚

pub mod app;
pub mod generation_runner;
pub mod page_processor;

pub use app::App;
pub use generation_runner::GenerationRunner;
pub use page_processor::{PageProcessor, RunReport};
