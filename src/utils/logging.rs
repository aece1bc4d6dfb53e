/// 日志工具模块
///
/// 提供日志初始化、运行阶段输出和文本截断的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// 初始化日志
///
/// 优先使用 `RUST_LOG`；否则详细模式为 debug，普通模式为 info。
/// 重复调用不会报错。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config, source: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 长文摘要并发布到 Notion");
    info!("🔗 来源: {}", source);
    info!(
        "🤖 模型: {:?} / {} | 调度: {:?}",
        config.llm_backend, config.llm_model_name, config.concurrency_mode
    );
    info!("{}", "=".repeat(60));
}

/// 记录分块信息
pub fn log_chunks_ready(title: &str, token_count: usize, chunk_count: usize) {
    info!("📄 文档: {}", truncate_text(title, 60));
    info!("✓ 共 {} 个 token，切分为 {} 个分块", token_count, chunk_count);
}

/// 记录发布批次信息
pub fn log_batches_ready(node_count: usize, batch_count: usize, cap: usize) {
    info!(
        "📦 大纲共 {} 个节点，分 {} 批发布 (每批上限 {})",
        node_count, batch_count, cap
    );
}

/// 打印最终统计信息
pub fn print_final_stats(
    chunk_count: usize,
    total_retries: usize,
    batch_count: usize,
    tags: &[String],
    output_path: &str,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 分块: {} | 语言重试: {} | 发布批次: {}", chunk_count, total_retries, batch_count);
    info!("🏷️ 标签: {}", tags.join(", "));
    info!("{}", "=".repeat(60));
    info!("\n摘要原文已保存至: {}", output_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
///
/// # 返回
/// 返回截断后的文本，省略号计入 `max_len`，结果不超过 `max_len` 个字符
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    if max_len <= ELLIPSIS.len() {
        return text.chars().take(max_len).collect();
    }
    let kept: String = text.chars().take(max_len - ELLIPSIS.len()).collect();
    format!("{}{}", kept.trim_end(), ELLIPSIS)
}

const ELLIPSIS: &str = "...";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("こんにちは世界", 5), "こん...");
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("exactly", 7), "exactly");
        assert_eq!(truncate_text("abcdef", 2), "ab");
        for max in 0..12 {
            assert!(truncate_text("a long sentence here", max).chars().count() <= max);
        }
    }

    #[test]
    fn test_init_is_idempotent() {
        init(false);
        init(true);
    }
}
