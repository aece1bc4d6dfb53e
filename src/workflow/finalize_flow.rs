//! 收尾流程 - 流程层
//!
//! 所有批次发布成功后，基于全部生成结果（按分块顺序拼接）计算：
//! - 一句话摘要：不含目标语言时换问法重试，最多 3 次
//! - 最多 5 个关键词：少于 2 个时换问法重试，最多 3 次，仍不足则不打标签
//!
//! 两个请求可并发也可顺序执行，结果相同

use tracing::{info, warn};

use crate::clients::Generator;
use crate::config::ConcurrencyMode;
use crate::error::AppResult;
use crate::models::GenerationResult;
use crate::services::LlmService;

/// 摘要 / 关键词的最大重试次数
pub const MAX_FINALIZE_RETRIES: usize = 3;

/// 关键词少于该数量视为提取失败
pub const MIN_KEYWORDS: usize = 2;

/// 收尾结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finalization {
    pub summary: String,
    pub tags: Vec<String>,
}

pub struct FinalizeFlow<G> {
    llm: LlmService<G>,
    mode: ConcurrencyMode,
}

impl<G: Generator> FinalizeFlow<G> {
    pub fn new(llm: LlmService<G>, mode: ConcurrencyMode) -> Self {
        Self { llm, mode }
    }

    pub async fn run(&self, results: &[GenerationResult]) -> AppResult<Finalization> {
        let full_text = results
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let (summary, tags) = match self.mode {
            ConcurrencyMode::Concurrent => {
                futures::future::try_join(self.summary(&full_text), self.keywords(&full_text))
                    .await?
            }
            ConcurrencyMode::Sequential => {
                let summary = self.summary(&full_text).await?;
                let tags = self.keywords(&full_text).await?;
                (summary, tags)
            }
        };

        info!("📝 摘要: {}", summary);
        Ok(Finalization { summary, tags })
    }

    async fn summary(&self, text: &str) -> AppResult<String> {
        let mut summary = self.llm.summarize_document(text, false).await?;
        let mut retries = 0;
        while !self.llm.is_conformant(&summary) && retries < MAX_FINALIZE_RETRIES {
            retries += 1;
            warn!("⚠️ 摘要不含目标语言，换问法重试 (第 {} 次)", retries);
            summary = self.llm.summarize_document(text, true).await?;
        }
        Ok(summary)
    }

    async fn keywords(&self, text: &str) -> AppResult<Vec<String>> {
        let mut keywords = self.llm.extract_keywords(text, false).await?;
        let mut retries = 0;
        while keywords.len() < MIN_KEYWORDS && retries < MAX_FINALIZE_RETRIES {
            retries += 1;
            warn!(
                "⚠️ 只提取到 {} 个关键词，换问法重试 (第 {} 次)",
                keywords.len(),
                retries
            );
            keywords = self.llm.extract_keywords(text, true).await?;
        }

        if keywords.len() < MIN_KEYWORDS {
            warn!("⚠️ 关键词提取失败，不设置标签");
            return Ok(Vec::new());
        }
        Ok(keywords)
    }
}
