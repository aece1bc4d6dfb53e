//! 应用入口 - 编排层
//!
//! 负责一次运行的资源准备：校验配置、获取内容、创建客户端（只创建一次），
//! 然后委托 [`PageProcessor`] 处理，最后输出统计。

use std::sync::Arc;

use tracing::error;

use crate::clients::{LlmClient, NotionClient};
use crate::config::Config;
use crate::error::AppResult;
use crate::ingest::{self, Ingestor};
use crate::orchestrator::page_processor::{PageProcessor, RunReport};
use crate::utils::logging;

/// 应用主结构
pub struct App {
    config: Config,
    source: String,
}

impl App {
    pub fn new(config: Config, source: impl Into<String>) -> Self {
        Self {
            config,
            source: source.into(),
        }
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> AppResult<RunReport> {
        logging::log_startup(&self.config, &self.source);
        self.config.validate()?;

        // 获取失败时直接结束，不创建页面
        let ingestor = ingest::ingestor_for(&self.source, &self.config)?;
        let doc = match ingestor.ingest(&self.source).await {
            Ok(doc) => doc,
            Err(e) => {
                error!("❌ 获取内容失败: {}", e);
                return Err(e.into());
            }
        };

        let generator = Arc::new(LlmClient::new(&self.config)?);
        let store = Arc::new(NotionClient::new(&self.config)?);
        let processor = PageProcessor::new(generator, store, self.config.clone());
        let report = processor.process(&doc).await?;

        logging::print_final_stats(
            report.chunk_count,
            report.total_retries,
            report.batch_count,
            &report.tags,
            &report.output_path.display().to_string(),
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, ConfigError};

    #[tokio::test]
    async fn test_invalid_config_stops_before_ingest() {
        let app = App::new(Config::default(), "does/not/exist.txt");
        let err = app.run().await.unwrap_err();
        assert!(matches!(err, AppError::Config(ConfigError::MissingValue { .. })));
    }

    #[tokio::test]
    async fn test_acquisition_failure_is_reported() {
        let config = Config {
            llm_api_key: "k".into(),
            notion_api_key: "k".into(),
            notion_database_id: "db".into(),
            ..Config::default()
        };
        let app = App::new(config, "does/not/exist.txt");
        let err = app.run().await.unwrap_err();
        assert!(err.is_acquisition());
    }
}
