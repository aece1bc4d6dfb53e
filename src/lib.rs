//! # Notion Digest
//!
//! 把一篇长文（视频字幕、网页或本地文本）切块、逐块生成日文要点大纲，并发布为 Notion 页面
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有本次运行的稀缺资源
//! - `OutputFile` - 唯一的本地输出文件，按分块顺序增量写入
//!
//! ### ② 外部协作层（Clients / Ingest）
//! - `clients/` - `Generator`（OpenAI 兼容 / Anthropic）与 `DocumentStore`（Notion）
//! - `ingest/` - 网页与本地文件的内容获取
//!
//! ### ③ 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，每个能力只处理一个输入
//! - `chunker` - 切块
//! - `ScriptClassifier` - 目标语言判定
//! - `LlmService` - 提示词与关键词解析
//! - `outline_builder` / `batcher` - 大纲解析与分批
//! - `ErrorLog` - 追加错误记录
//!
//! ### ④ 流程层（Workflow）
//! - `workflow/` - 定义"一个分块"和"一次收尾"的完整流程
//! - `ChunkFlow` - 生成 → 语言判定 → 基于原文重试
//! - `FinalizeFlow` - 摘要 + 关键词
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/generation_runner` - 并发 / 顺序调度，结果按分块顺序重排
//! - `orchestrator/page_processor` - 建页、发布、收尾，唯一的失败边界
//! - `orchestrator/app` - 校验配置、获取内容、创建客户端
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod ingest;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{DocumentStore, Generation, Generator, LlmClient, NotionClient};
pub use config::{ConcurrencyMode, Config, ModelBackend};
pub use error::{AppError, AppResult};
pub use infrastructure::OutputFile;
pub use models::{Chunk, GenerationResult, OutlineNode, PublishBatch, SourceDocument};
pub use orchestrator::{App, PageProcessor, RunReport};
pub use workflow::{ChunkCtx, ChunkFlow, FinalizeFlow};
