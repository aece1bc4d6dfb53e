//! 分块处理流程 - 流程层
//!
//! 核心职责：定义"一个分块"的完整处理流程
//!
//! 流程顺序：
//! 1. 标题 + 分块原文 → 要点大纲
//! 2. 不含目标语言时，用分块原文重新翻译（最多 3 次）
//! 3. 第 3 次重试的结果无论是否合格都接受

use tracing::{debug, info, warn};

use crate::clients::Generator;
use crate::error::AppResult;
use crate::models::{Chunk, GenerationResult};
use crate::services::LlmService;
use crate::workflow::chunk_ctx::ChunkCtx;

/// 目标语言不合格时的最大重试次数
pub const MAX_CONFORMANCE_RETRIES: usize = 3;

/// 分块处理流程
///
/// - 决定何时重试、何时接受
/// - 不持有任何资源（文件、页面）
/// - 不关心其他分块，也不关心并发方式
pub struct ChunkFlow<G> {
    llm: LlmService<G>,
    title: String,
}

impl<G: Generator> ChunkFlow<G> {
    pub fn new(llm: LlmService<G>, title: impl Into<String>) -> Self {
        Self {
            llm,
            title: title.into(),
        }
    }

    pub async fn run(&self, chunk: &Chunk, ctx: &ChunkCtx) -> AppResult<GenerationResult> {
        debug!(
            "{} 开始生成，{} 字符 / {} 词",
            ctx,
            chunk.char_count(),
            chunk.word_count()
        );

        let mut text = self.llm.summarize_chunk(&self.title, &chunk.text).await?;
        let mut retries_used = 0;

        // 重试总是基于分块原文，而不是上一次不合格的结果
        while !self.llm.is_conformant(&text) && retries_used < MAX_CONFORMANCE_RETRIES {
            retries_used += 1;
            warn!(
                "{} ⚠️ 结果不含目标语言，重新翻译 (第 {}/{} 次)",
                ctx, retries_used, MAX_CONFORMANCE_RETRIES
            );
            text = self.llm.translate_chunk(&chunk.text).await?;
        }

        if self.llm.is_conformant(&text) {
            info!("{} ✓ 生成完成 (重试 {} 次)", ctx, retries_used);
        } else {
            warn!("{} ⚠️ 重试已用尽，接受最后一次结果", ctx);
        }

        Ok(GenerationResult {
            chunk_index: chunk.index,
            text,
            retries_used,
        })
    }
}
