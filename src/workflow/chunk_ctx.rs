//! 分块处理上下文
//!
//! 封装"我正在处理第几个分块"这一信息，仅用于日志

use std::fmt::Display;

#[derive(Debug, Clone, Copy)]
pub struct ChunkCtx {
    /// 分块索引（从 0 开始）
    pub chunk_index: usize,

    /// 本次运行的分块总数
    pub chunk_count: usize,
}

impl ChunkCtx {
    pub fn new(chunk_index: usize, chunk_count: usize) -> Self {
        Self {
            chunk_index,
            chunk_count,
        }
    }
}

impl Display for ChunkCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[分块 {}/{}]", self.chunk_index + 1, self.chunk_count)
    }
}
