use serde::{Deserialize, Serialize};

/// 原文中连续的一段，生成请求的最小单位
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// 从 0 开始，贯穿后续所有阶段的顺序
    pub index: usize,
    /// 以单个空格连接的 token
    pub text: String,
}

impl Chunk {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}
