//! 输出文件 - 基础设施层
//!
//! 本次运行唯一的本地产物 `"<标题> <时间戳>.md"`。
//! 每个分块结果到达后立即写入并 flush，发布失败也不会丢失内容。
//! 并发模式下结果乱序到达，先缓存，凑齐前面的分块后再按顺序落盘。

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::debug;

use crate::error::{AppError, AppResult, FileError};
use crate::models::GenerationResult;

/// 文件名中不允许出现的字符
const FORBIDDEN_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// 输出文件
pub struct OutputFile {
    path: PathBuf,
    file: Option<File>,
    next_index: usize,
    pending: BTreeMap<usize, String>,
}

impl OutputFile {
    /// 在 `dir` 下创建 `"<标题> <时间戳>.md"`
    pub fn create(dir: impl AsRef<Path>, title: &str) -> AppResult<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|source| FileError::CreateFailed {
            path: dir.to_path_buf(),
            source,
        })?;

        let timestamp = Local::now().format("%Y-%m-%d %H-%M-%S");
        let path = dir.join(format!("{} {}.md", sanitize_file_name(title), timestamp));
        let file = File::create(&path).map_err(|source| FileError::CreateFailed {
            path: path.clone(),
            source,
        })?;

        debug!("创建输出文件: {}", path.display());
        Ok(Self {
            path,
            file: Some(file),
            next_index: 0,
            pending: BTreeMap::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.file.is_none()
    }

    /// 写入一个分块结果
    ///
    /// 只有前面的分块都已写入时才真正落盘，其余暂存
    pub fn append(&mut self, result: &GenerationResult) -> AppResult<()> {
        if self.file.is_none() {
            return Err(FileError::Closed {
                path: self.path.clone(),
            }
            .into());
        }

        self.pending.insert(result.chunk_index, result.text.clone());
        while let Some(text) = self.pending.remove(&self.next_index) {
            self.write_chunk(&text)?;
            self.next_index += 1;
        }
        Ok(())
    }

    fn write_chunk(&mut self, text: &str) -> AppResult<()> {
        let Some(file) = self.file.as_mut() else {
            return Err(FileError::Closed {
                path: self.path.clone(),
            }
            .into());
        };

        file.write_all(text.as_bytes())
            .and_then(|_| file.write_all(b"\n\n"))
            .and_then(|_| file.flush())
            .map_err(|e| AppError::file_write_failed(&self.path, e))
    }

    /// 关闭文件，重复调用无副作用
    ///
    /// 仍在等待前序分块的结果按顺序补写，缺失的分块写入占位注释
    pub fn close(&mut self) -> AppResult<()> {
        if self.file.is_none() {
            return Ok(());
        }

        let remaining = std::mem::take(&mut self.pending);
        let outcome = self.flush_remaining(remaining);

        if let Some(file) = self.file.take() {
            file.sync_all()
                .map_err(|e| AppError::file_write_failed(&self.path, e))?;
        }
        debug!("输出文件已关闭: {}", self.path.display());
        outcome
    }

    fn flush_remaining(&mut self, remaining: BTreeMap<usize, String>) -> AppResult<()> {
        for (index, text) in remaining {
            while self.next_index < index {
                self.write_chunk(&gap_marker(self.next_index))?;
                self.next_index += 1;
            }
            self.write_chunk(&text)?;
            self.next_index = index + 1;
        }
        Ok(())
    }
}

/// 缺失分块的占位注释（序号从 1 开始，与日志一致）
fn gap_marker(index: usize) -> String {
    format!("<!-- 分块 {} 缺失 -->", index + 1)
}

/// 把标题变成可用的文件名
pub fn sanitize_file_name(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| {
            if FORBIDDEN_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let cleaned = cleaned.trim().trim_matches('.');
    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned.to_string()
    }
}
