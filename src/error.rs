use std::path::PathBuf;

/// 应用程序错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 内容获取错误（网页、本地文件）
    #[error("内容获取错误: {0}")]
    Acquisition(#[from] AcquisitionError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 文档库（Notion）错误
    #[error("文档库错误: {0}")]
    Store(#[from] StoreError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 并发任务异常退出（panic / 被取消）
    #[error("任务错误: {0}")]
    Task(String),
}

/// 内容获取错误
///
/// 在切分之前发生，流程直接终止，不会创建页面
#[derive(Debug, thiserror::Error)]
pub enum AcquisitionError {
    /// 来源拒绝访问
    #[error("来源拒绝访问 ({url}): HTTP {status}")]
    Blocked { url: String, status: u16 },
    /// 网络请求失败
    #[error("请求失败 ({url}): {source}")]
    RequestFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// 读取本地文件失败
    #[error("读取文件失败 ({}): {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 来源没有可用正文
    #[error("来源没有可用正文: {source_id}")]
    EmptyContent { source_id: String },
}

/// LLM 服务错误
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {source}")]
    ApiCallFailed {
        model: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// API 返回错误响应
    #[error("LLM API返回错误响应 (模型: {model}): HTTP {status}: {body}")]
    BadResponse {
        model: String,
        status: u16,
        body: String,
    },
    /// 频率限制重试耗尽
    #[error("LLM API请求频率限制 (模型: {model}), 已重试 {attempts} 次")]
    RateLimited { model: String, attempts: usize },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
}

/// 文档库错误
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// 网络请求失败
    #[error("文档库请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// API 返回错误响应
    #[error("文档库返回错误响应 ({endpoint}): HTTP {status}: {message}")]
    BadResponse {
        endpoint: String,
        status: u16,
        message: String,
    },
    /// 响应中缺少页面 ID
    #[error("文档库响应缺少页面ID ({endpoint})")]
    MissingPageId { endpoint: String },
    /// 操作被拒绝
    #[error("文档库拒绝操作 {operation}: {message}")]
    Rejected { operation: String, message: String },
}

/// 文件操作错误
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// 创建文件失败
    #[error("创建文件失败 ({}): {source}", .path.display())]
    CreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({}): {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 读取文件失败
    #[error("读取文件失败 ({}): {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 文件已关闭
    #[error("文件已关闭: {}", .path.display())]
    Closed { path: PathBuf },
    /// TOML 解析失败
    #[error("TOML解析失败 ({}): {source}", .path.display())]
    TomlParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    /// 错误日志记录解析失败
    #[error("记录解析失败 ({}): {source}", .path.display())]
    RecordParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// 配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 必填项缺失
    #[error("配置项 {name} 不能为空")]
    MissingValue { name: String },
    /// 配置值非法
    #[error("配置项 {name} 的值 '{value}' 无效，期望 {expected}")]
    InvalidValue {
        name: String,
        value: String,
        expected: String,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建LLM API调用错误
    pub fn llm_api_failed(
        model: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Llm(LlmError::ApiCallFailed {
            model: model.into(),
            source: Box::new(source),
        })
    }

    /// 创建文档库请求失败错误
    pub fn store_request_failed(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        AppError::Store(StoreError::RequestFailed {
            endpoint: endpoint.into(),
            source,
        })
    }

    /// 创建文档库拒绝操作错误
    pub fn store_rejected(operation: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Store(StoreError::Rejected {
            operation: operation.into(),
            message: message.into(),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 是否为内容获取阶段的错误
    pub fn is_acquisition(&self) -> bool {
        matches!(self, AppError::Acquisition(_))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_category() {
        let err = AppError::store_rejected("append_blocks", "rate limited");
        let text = err.to_string();
        assert!(text.starts_with("文档库错误"));
        assert!(text.contains("append_blocks"));
    }

    #[test]
    fn test_source_chain() {
        use std::error::Error;

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = AppError::file_write_failed("out.md", io);
        let file_err = err.source().expect("应包含 FileError");
        assert!(file_err.source().is_some());
    }

    #[test]
    fn test_is_acquisition() {
        let err: AppError = AcquisitionError::Blocked {
            url: "https://example.com".into(),
            status: 403,
        }
        .into();
        assert!(err.is_acquisition());
        assert!(!AppError::Task("x".into()).is_acquisition());
    }
}
