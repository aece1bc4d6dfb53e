use anyhow::{Context, Result};
use notion_digest::utils::logging;
use notion_digest::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load().context("加载配置失败")?;

    // 初始化日志
    logging::init(config.verbose_logging);

    let source = std::env::args()
        .nth(1)
        .context("用法: notion_digest <URL 或文本文件路径>")?;

    // 初始化并运行应用
    App::new(config, source)
        .run()
        .await
        .context("处理失败")?;

    Ok(())
}
