use serde::{Deserialize, Serialize};

/// 单个分块的生成结果
///
/// 结果列表与分块一一对应，按 `chunk_index` 排序
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub chunk_index: usize,
    pub text: String,
    /// 因不符合目标语言而重试的次数（0–3）
    pub retries_used: usize,
}
