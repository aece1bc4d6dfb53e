//! 本地文本文件（`.txt` / `.md`）

use std::path::Path;

use tracing::debug;

use crate::error::AcquisitionError;
use crate::ingest::{words, Ingestor};
use crate::models::SourceDocument;

pub struct TextFileIngestor {
    title_max_chars: usize,
}

impl TextFileIngestor {
    pub fn new(title_max_chars: usize) -> Self {
        Self { title_max_chars }
    }
}

impl Ingestor for TextFileIngestor {
    async fn ingest(&self, source: &str) -> Result<SourceDocument, AcquisitionError> {
        let path = Path::new(source);
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| AcquisitionError::ReadFailed {
                path: path.to_path_buf(),
                source,
            })?;

        let title = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| source.to_string());
        let tokens: Vec<String> = words(&content).collect();
        debug!("读取本地文件 {}: {} 个 token", path.display(), tokens.len());

        let doc = SourceDocument::new(title, source, tokens, self.title_max_chars);
        if doc.is_empty() {
            return Err(AcquisitionError::EmptyContent {
                source_id: source.to_string(),
            });
        }
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_words_and_title_from_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rust notes.md");
        std::fs::write(&path, "# Ownership\n\nEvery value has\tan owner.\n").unwrap();

        let doc = TextFileIngestor::new(100)
            .ingest(path.to_str().unwrap())
            .await
            .unwrap();
        assert_eq!(doc.title, "rust notes");
        assert_eq!(
            doc.tokens,
            vec!["#", "Ownership", "Every", "value", "has", "an", "owner."]
        );
    }

    #[tokio::test]
    async fn test_missing_and_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let ingestor = TextFileIngestor::new(100);

        let missing = dir.path().join("missing.txt");
        let err = ingestor.ingest(missing.to_str().unwrap()).await.unwrap_err();
        assert!(matches!(err, AcquisitionError::ReadFailed { .. }));

        let empty = dir.path().join("empty.txt");
        std::fs::write(&empty, "  \n").unwrap();
        let err = ingestor.ingest(empty.to_str().unwrap()).await.unwrap_err();
        assert!(matches!(err, AcquisitionError::EmptyContent { .. }));
    }
}
