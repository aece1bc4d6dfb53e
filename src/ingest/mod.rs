//! 内容获取
//!
//! 把来源（视频 ID / 观看页 URL、网页 URL 或本地文本文件）变成 [`SourceDocument`]。
//! 获取失败以 [`AcquisitionError`] 返回，调用方在切分之前检查，失败时不会创建页面。

pub mod text_file;
pub mod transcript;
pub mod web;

use std::future::Future;

use crate::config::Config;
use crate::error::AcquisitionError;
use crate::models::SourceDocument;

pub use text_file::TextFileIngestor;
pub use transcript::TranscriptIngestor;
pub use web::WebIngestor;

/// 内容获取能力
pub trait Ingestor: Send + Sync {
    fn ingest(
        &self,
        source: &str,
    ) -> impl Future<Output = Result<SourceDocument, AcquisitionError>> + Send;
}

/// 按来源形态选出的获取方式
pub enum SourceIngestor {
    Transcript(TranscriptIngestor),
    Web(WebIngestor),
    TextFile(TextFileIngestor),
}

impl Ingestor for SourceIngestor {
    async fn ingest(&self, source: &str) -> Result<SourceDocument, AcquisitionError> {
        match self {
            SourceIngestor::Transcript(ingestor) => ingestor.ingest(source).await,
            SourceIngestor::Web(ingestor) => ingestor.ingest(source).await,
            SourceIngestor::TextFile(ingestor) => ingestor.ingest(source).await,
        }
    }
}

/// 视频 ID 或观看页 URL 走字幕，其余 http(s) 来源走网页，剩下的按本地路径处理
pub fn ingestor_for(source: &str, config: &Config) -> Result<SourceIngestor, AcquisitionError> {
    if transcript::video_id(source).is_some() {
        Ok(SourceIngestor::Transcript(TranscriptIngestor::new(config)?))
    } else if is_web_source(source) {
        Ok(SourceIngestor::Web(WebIngestor::new(config)?))
    } else {
        Ok(SourceIngestor::TextFile(TextFileIngestor::new(
            config.title_max_chars,
        )))
    }
}

fn is_web_source(source: &str) -> bool {
    let lower = source.trim().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// 按空白切成 token
pub(crate) fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split_whitespace().map(str::to_string)
}
