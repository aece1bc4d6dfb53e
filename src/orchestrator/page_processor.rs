//! 单篇文档处理器 - 编排层
//!
//! ## 职责
//!
//! 把一个 [`SourceDocument`] 变成一个 Notion 页面：
//!
//! 1. **切分**：token → 分块
//! 2. **建页**：先创建页面（带目录块）
//! 3. **生成**：调度所有分块，结果逐个写入输出文件
//! 4. **发布**：大纲分批，严格按顺序追加到页面
//! 5. **收尾**：摘要 + 标签，只在全部批次成功后更新一次
//!
//! ## 失败处理
//!
//! 建页到收尾之间只有一个失败边界：任何错误都会归档页面、追加错误日志、
//! 关闭输出文件，然后把错误原样返回。已发布的批次不会撤回。

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::clients::{DocumentStore, Generator};
use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::OutputFile;
use crate::models::outline::forest_node_count;
use crate::models::{Chunk, ErrorRecord, Page, PageId, SourceDocument};
use crate::orchestrator::generation_runner::GenerationRunner;
use crate::services::{batcher, chunker, outline_builder};
use crate::services::{ChunkPolicy, ErrorLog, LlmService, ScriptClassifier, ScriptRanges};
use crate::utils::logging;
use crate::workflow::{ChunkFlow, FinalizeFlow};

/// 一次运行的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub page_id: PageId,
    pub chunk_count: usize,
    pub batch_count: usize,
    pub node_count: usize,
    pub total_retries: usize,
    pub summary: String,
    pub tags: Vec<String>,
    pub output_path: PathBuf,
}

/// 单篇文档处理器
///
/// 客户端在构造时注入，整个运行期间共享
pub struct PageProcessor<G, S> {
    generator: Arc<G>,
    store: Arc<S>,
    classifier: Arc<dyn ScriptClassifier>,
    error_log: ErrorLog,
    config: Config,
}

impl<G, S> PageProcessor<G, S>
where
    G: Generator + 'static,
    S: DocumentStore,
{
    pub fn new(generator: Arc<G>, store: Arc<S>, config: Config) -> Self {
        Self {
            generator,
            store,
            classifier: Arc::new(ScriptRanges::new(&config.script_ranges)),
            error_log: ErrorLog::new(&config.error_log_file),
            config,
        }
    }

    /// 处理一篇文档
    pub async fn process(&self, doc: &SourceDocument) -> AppResult<RunReport> {
        let policy = ChunkPolicy::from_config(&self.config, Arc::clone(&self.classifier));
        let chunks = chunker::segment(&doc.tokens, &policy);
        logging::log_chunks_ready(&doc.title, doc.tokens.len(), chunks.len());

        info!("📄 创建 Notion 页面...");
        let page_id = match self.store.create_page(&doc.title, &doc.url).await {
            Ok(id) => id,
            Err(e) => {
                error!("❌ 创建页面失败: {}", e);
                self.record_failure(doc, &e.to_string());
                return Err(e);
            }
        };
        info!("✓ 页面已创建: {}", page_id);

        let mut page = Page::new(page_id, &doc.title, &doc.url);
        let mut output: Option<OutputFile> = None;
        let outcome = self.run_pipeline(&mut page, chunks, &mut output).await;

        if let Some(file) = output.as_mut() {
            if let Err(e) = file.close() {
                warn!("⚠️ 关闭输出文件失败: {}", e);
            }
        }

        match outcome {
            Ok(report) => Ok(report),
            Err(e) => {
                error!("❌ 处理失败，归档页面 {}: {}", page.id, e);
                if let Err(archive_err) = self.store.archive_page(&page.id).await {
                    warn!("⚠️ 归档页面失败: {}", archive_err);
                }
                self.record_failure(doc, &e.to_string());
                Err(e)
            }
        }
    }

    async fn run_pipeline(
        &self,
        page: &mut Page,
        chunks: Vec<Chunk>,
        output: &mut Option<OutputFile>,
    ) -> AppResult<RunReport> {
        let file = output.insert(OutputFile::create(&self.config.output_dir, &page.title)?);
        let output_path = file.path().to_path_buf();
        let chunk_count = chunks.len();

        // ========== 生成 ==========
        let llm = LlmService::new(Arc::clone(&self.generator), Arc::clone(&self.classifier));
        let runner = GenerationRunner::new(
            ChunkFlow::new(llm.clone(), &page.title),
            self.config.concurrency_mode,
            self.config.max_concurrent_chunks,
        );
        let results = runner.run(chunks, |result| file.append(result)).await?;
        let total_retries = results.iter().map(|r| r.retries_used).sum();

        // ========== 发布 ==========
        let forest = outline_builder::build_forest(&results);
        let node_count = forest_node_count(&forest);
        let cap = self.config.notion_block_request_limit;
        let batches = batcher::batch(forest, cap);
        logging::log_batches_ready(node_count, batches.len(), cap);

        for (i, batch) in batches.iter().enumerate() {
            self.store.append_blocks(&page.id, batch).await?;
            info!(
                "✓ 批次 {}/{} 已发布 ({} 个节点)",
                i + 1,
                batches.len(),
                batch.node_count()
            );
        }

        // ========== 收尾 ==========
        let finalization = FinalizeFlow::new(llm, self.config.concurrency_mode)
            .run(&results)
            .await?;
        self.store
            .update_page(&page.id, &finalization.summary, &finalization.tags)
            .await?;
        page.summary = finalization.summary;
        page.tags = finalization.tags;

        Ok(RunReport {
            page_id: page.id.clone(),
            chunk_count,
            batch_count: batches.len(),
            node_count,
            total_retries,
            summary: page.summary.clone(),
            tags: page.tags.clone(),
            output_path,
        })
    }

    fn record_failure(&self, doc: &SourceDocument, message: &str) {
        let record = ErrorRecord::now(&doc.url, message);
        match self.error_log.append(&record) {
            Ok(()) => info!("错误已记录到 {}", self.error_log.path().display()),
            Err(e) => error!("❌ 写入错误日志失败: {}", e),
        }
    }
}
