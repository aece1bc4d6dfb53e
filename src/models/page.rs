use std::fmt::Display;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// 文档库中的页面 ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageId(pub String);

impl PageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// 文档库中的页面
///
/// 在处理任何分块之前创建，结束时更新一次，失败时归档
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub title: String,
    pub url: String,
    pub summary: String,
    /// 最多 5 个，按重要度排序
    pub tags: Vec<String>,
}

impl Page {
    pub fn new(id: PageId, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            url: url.into(),
            summary: String::new(),
            tags: Vec::new(),
        }
    }
}

/// 错误日志中的一条记录（只追加）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub timestamp: DateTime<Local>,
    pub url: String,
    pub message: String,
}

impl ErrorRecord {
    pub fn now(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            url: url.into(),
            message: message.into(),
        }
    }
}
