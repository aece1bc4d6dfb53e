//! 错误日志服务 - 业务能力层
//!
//! 只负责"追加一条错误记录"能力，不关心流程

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{AppError, AppResult, FileError};
use crate::models::ErrorRecord;

/// 错误日志
///
/// 每行一条 JSON 记录，只追加不覆盖
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一条错误记录
    pub fn append(&self, record: &ErrorRecord) -> AppResult<()> {
        debug!("写入错误日志: {} | {}", record.url, record.message);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::file_write_failed(parent, e))?;
        }

        let mut line = serde_json::to_string(record).map_err(|source| FileError::RecordParseFailed {
            path: self.path.clone(),
            source,
        })?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AppError::file_write_failed(&self.path, e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| AppError::file_write_failed(&self.path, e))?;

        Ok(())
    }

    /// 读取全部记录，文件不存在时返回空列表
    pub fn read_all(&self) -> AppResult<Vec<ErrorRecord>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::file_read_failed(&self.path, e)),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| -> AppResult<ErrorRecord> {
                serde_json::from_str(line).map_err(|source| {
                    FileError::RecordParseFailed {
                        path: self.path.clone(),
                        source,
                    }
                    .into()
                })
            })
            .collect()
    }
}
