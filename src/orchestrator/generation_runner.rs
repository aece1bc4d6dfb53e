//! 分块生成调度 - 编排层
//!
//! ## 职责
//!
//! 把所有分块交给 [`ChunkFlow`]，支持两种等价的调度方式：
//!
//! 1. **并发**：每个分块一个任务（`JoinSet`），共享同一个客户端，
//!    用 Semaphore 限制同时进行的请求数；任一任务失败立即中止其余任务
//! 2. **顺序**：按分块顺序逐个处理
//!
//! 无论完成顺序如何，返回的结果总是按 `chunk_index` 排序，下游看不到并发。
//! 每个结果完成时立即交给 `on_result`（用于增量写入输出文件）。

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::clients::Generator;
use crate::config::ConcurrencyMode;
use crate::error::{AppError, AppResult};
use crate::models::{Chunk, GenerationResult};
use crate::workflow::{ChunkCtx, ChunkFlow};

pub struct GenerationRunner<G> {
    flow: Arc<ChunkFlow<G>>,
    mode: ConcurrencyMode,
    max_concurrent: usize,
}

impl<G: Generator + 'static> GenerationRunner<G> {
    pub fn new(flow: ChunkFlow<G>, mode: ConcurrencyMode, max_concurrent: usize) -> Self {
        Self {
            flow: Arc::new(flow),
            mode,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// 处理全部分块，返回按分块顺序排列的结果
    pub async fn run<F>(&self, chunks: Vec<Chunk>, on_result: F) -> AppResult<Vec<GenerationResult>>
    where
        F: FnMut(&GenerationResult) -> AppResult<()>,
    {
        info!(
            "🤖 开始生成，共 {} 个分块 ({:?})",
            chunks.len(),
            self.mode
        );
        match self.mode {
            ConcurrencyMode::Concurrent => self.run_concurrent(chunks, on_result).await,
            ConcurrencyMode::Sequential => self.run_sequential(chunks, on_result).await,
        }
    }

    async fn run_sequential<F>(
        &self,
        chunks: Vec<Chunk>,
        mut on_result: F,
    ) -> AppResult<Vec<GenerationResult>>
    where
        F: FnMut(&GenerationResult) -> AppResult<()>,
    {
        let chunk_count = chunks.len();
        let mut results = Vec::with_capacity(chunk_count);

        for chunk in &chunks {
            let ctx = ChunkCtx::new(chunk.index, chunk_count);
            let result = self.flow.run(chunk, &ctx).await?;
            on_result(&result)?;
            results.push(result);
        }

        Ok(results)
    }

    async fn run_concurrent<F>(
        &self,
        chunks: Vec<Chunk>,
        mut on_result: F,
    ) -> AppResult<Vec<GenerationResult>>
    where
        F: FnMut(&GenerationResult) -> AppResult<()>,
    {
        let chunk_count = chunks.len();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = JoinSet::new();

        for chunk in chunks {
            let flow = Arc::clone(&self.flow);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| AppError::Task(e.to_string()))?;
                let ctx = ChunkCtx::new(chunk.index, chunk_count);
                flow.run(&chunk, &ctx).await
            });
        }

        let mut results = Vec::with_capacity(chunk_count);
        while let Some(joined) = tasks.join_next().await {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => Err(AppError::Task(e.to_string())),
            };
            let handled = outcome.and_then(|result| {
                on_result(&result)?;
                Ok(result)
            });

            match handled {
                Ok(result) => results.push(result),
                Err(e) => {
                    error!("❌ 分块生成失败，中止其余 {} 个任务: {}", tasks.len(), e);
                    tasks.abort_all();
                    return Err(e);
                }
            }
        }

        results.sort_by_key(|r| r.chunk_index);
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::Generation;
    use crate::services::{LlmService, ScriptRanges};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// 按分块原文决定延迟和回复，末尾编号越小完成得越晚
    struct Delayed;

    impl Generator for Delayed {
        async fn generate(&self, _system: &str, user_prompt: &str) -> AppResult<Generation> {
            let n: u64 = user_prompt
                .rsplit('c')
                .next()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(50 - n * 10)).await;
            Ok(Generation::text(format!("- 要点{}", n)))
        }
    }

    fn runner(mode: ConcurrencyMode) -> GenerationRunner<Delayed> {
        let llm = LlmService::new(Arc::new(Delayed), Arc::new(ScriptRanges::japanese()));
        GenerationRunner::new(ChunkFlow::new(llm, "t"), mode, 4)
    }

    fn chunks() -> Vec<Chunk> {
        (0..4).map(|i| Chunk::new(i, format!("c{}", i))).collect()
    }

    #[tokio::test]
    async fn test_concurrent_results_reordered() {
        let mut seen = Vec::new();
        let results = runner(ConcurrencyMode::Concurrent)
            .run(chunks(), |r| {
                seen.push(r.chunk_index);
                Ok(())
            })
            .await
            .unwrap();

        let indices: Vec<usize> = results.iter().map(|r| r.chunk_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_eq!(results[2].text, "- 要点2");
        // 回调按完成顺序触发
        assert_eq!(seen, vec![3, 2, 1, 0]);
    }

    #[tokio::test]
    async fn test_sequential_matches_concurrent() {
        let concurrent = runner(ConcurrencyMode::Concurrent)
            .run(chunks(), |_| Ok(()))
            .await
            .unwrap();
        let sequential = runner(ConcurrencyMode::Sequential)
            .run(chunks(), |_| Ok(()))
            .await
            .unwrap();
        assert_eq!(concurrent, sequential);
    }

    /// 第一个分块立即失败，其余分块等待后计数
    struct FailFirst {
        completed: Arc<AtomicUsize>,
    }

    impl Generator for FailFirst {
        async fn generate(&self, _system: &str, user_prompt: &str) -> AppResult<Generation> {
            if user_prompt.trim_end().ends_with("c0") {
                return Err(AppError::Task("chunk 0 failed".into()));
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
            self.completed.fetch_add(1, Ordering::SeqCst);
            Ok(Generation::text("- 要点"))
        }
    }

    #[tokio::test]
    async fn test_first_failure_aborts_in_flight_chunks() {
        let completed = Arc::new(AtomicUsize::new(0));
        let generator = FailFirst {
            completed: Arc::clone(&completed),
        };
        let llm = LlmService::new(Arc::new(generator), Arc::new(ScriptRanges::japanese()));
        let runner =
            GenerationRunner::new(ChunkFlow::new(llm, "t"), ConcurrencyMode::Concurrent, 4);

        let result = runner.run(chunks(), |_| Ok(())).await;
        assert!(matches!(result, Err(AppError::Task(_))));

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(completed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_callback_failure_stops_run() {
        let result = runner(ConcurrencyMode::Concurrent)
            .run(chunks(), |_| Err(AppError::Task("disk full".into())))
            .await;
        assert!(matches!(result, Err(AppError::Task(_))));
    }
}
