//! 流程层：定义"一个分块"与"一次运行收尾"的处理流程

pub mod chunk_ctx;
pub mod chunk_flow;
pub mod finalize_flow;

pub use chunk_ctx::ChunkCtx;
pub use chunk_flow::{ChunkFlow, MAX_CONFORMANCE_RETRIES};
pub use finalize_flow::{Finalization, FinalizeFlow};
