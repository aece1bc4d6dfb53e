use serde::{Deserialize, Serialize};

use crate::utils::logging::truncate_text;

/// 待处理的原始文档
///
/// 由 ingestor 生成后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// 截断后的标题，可安全用于页面标题与文件名
    pub title: String,
    pub url: String,
    /// 按原文顺序排列的词 / 字幕片段 / 页
    pub tokens: Vec<String>,
}

impl SourceDocument {
    /// 创建文档，标题超过 `title_max_chars` 个字符时截断
    pub fn new(
        title: impl AsRef<str>,
        url: impl Into<String>,
        tokens: Vec<String>,
        title_max_chars: usize,
    ) -> Self {
        let title = title.as_ref().split_whitespace().collect::<Vec<_>>().join(" ");
        Self {
            title: truncate_text(&title, title_max_chars),
            url: url.into(),
            tokens,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.iter().all(|t| t.trim().is_empty())
    }
}
