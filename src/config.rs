//! 程序配置
//!
//! 加载顺序：默认值 → TOML 文件（`DIGEST_CONFIG` 指定时）→ 环境变量

use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::error::{AppResult, ConfigError, FileError};

/// 指定配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "DIGEST_CONFIG";

/// 生成后端
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    /// 兼容 OpenAI Chat Completions 的服务
    OpenAi,
    /// Anthropic Messages API
    Anthropic,
}

impl ModelBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "anthropic" | "claude" => Some(Self::Anthropic),
            _ => None,
        }
    }
}

/// 分块生成的调度方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcurrencyMode {
    /// 所有分块同时派发，共享同一个网络会话
    Concurrent,
    /// 按顺序逐个处理
    Sequential,
}

impl ConcurrencyMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "concurrent" | "async" => Some(Self::Concurrent),
            "sequential" | "sync" => Some(Self::Sequential),
            _ => None,
        }
    }
}

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_backend: ModelBackend,
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_max_tokens: u32,
    // --- Notion 配置 ---
    pub notion_api_key: String,
    pub notion_api_base_url: String,
    pub notion_version: String,
    pub notion_database_id: String,
    pub notion_title_property: String,
    pub notion_url_property: String,
    pub notion_summary_property: String,
    pub notion_tags_property: String,
    /// 单次追加请求的最大块数（含子块）
    pub notion_block_request_limit: usize,
    // --- 切分配置 ---
    /// 目标语言分块的字符数软上限
    pub jp_limit: usize,
    /// 其他语言分块的单词数软上限
    pub en_limit: usize,
    /// 目标语言文字范围（闭区间码点）
    pub script_ranges: Vec<[u32; 2]>,
    // --- 调度配置 ---
    pub concurrency_mode: ConcurrencyMode,
    /// 并发模式下同时进行的分块数量
    pub max_concurrent_chunks: usize,
    // --- 输出配置 ---
    pub output_dir: String,
    pub error_log_file: String,
    pub title_max_chars: usize,
    pub http_timeout_secs: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_backend: ModelBackend::Anthropic,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.anthropic.com/v1".to_string(),
            llm_model_name: "claude-3-haiku-20240307".to_string(),
            llm_max_tokens: 1024,
            notion_api_key: String::new(),
            notion_api_base_url: "https://api.notion.com/v1".to_string(),
            notion_version: "2022-06-28".to_string(),
            notion_database_id: String::new(),
            notion_title_property: "Name".to_string(),
            notion_url_property: "URL".to_string(),
            notion_summary_property: "Summary".to_string(),
            notion_tags_property: "Tags".to_string(),
            notion_block_request_limit: 100,
            jp_limit: 2000,
            en_limit: 1000,
            script_ranges: vec![[0x3040, 0x309F], [0x30A0, 0x30FF], [0x4E00, 0x9FFF]],
            concurrency_mode: ConcurrencyMode::Concurrent,
            max_concurrent_chunks: 8,
            output_dir: "output".to_string(),
            error_log_file: "error_log.jsonl".to_string(),
            title_max_chars: 100,
            http_timeout_secs: 120,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 默认值 + 配置文件 + 环境变量
    pub fn load() -> AppResult<Self> {
        let base = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(path.trim()))?,
            _ => Self::default(),
        };
        Ok(base.with_env_overrides())
    }

    /// 默认值 + 环境变量
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件加载，未出现的字段使用默认值
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| FileError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| {
            FileError::TomlParseFailed {
                path: path.to_path_buf(),
                source,
            }
            .into()
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 用环境变量覆盖当前配置；无法解析的值保留原值
    pub fn with_env_overrides(self) -> Self {
        let c = self;
        Self {
            llm_backend: env_parsed("LLM_BACKEND", ModelBackend::parse).unwrap_or(c.llm_backend),
            llm_api_key: env_string("LLM_API_KEY").unwrap_or(c.llm_api_key),
            llm_api_base_url: env_string("LLM_API_BASE_URL").unwrap_or(c.llm_api_base_url),
            llm_model_name: env_string("LLM_MODEL_NAME").unwrap_or(c.llm_model_name),
            llm_max_tokens: env_parsed("LLM_MAX_TOKENS", |v| v.parse().ok()).unwrap_or(c.llm_max_tokens),
            notion_api_key: env_string("NOTION_API_KEY").unwrap_or(c.notion_api_key),
            notion_api_base_url: env_string("NOTION_API_BASE_URL").unwrap_or(c.notion_api_base_url),
            notion_version: env_string("NOTION_VERSION").unwrap_or(c.notion_version),
            notion_database_id: env_string("NOTION_DATABASE_ID").unwrap_or(c.notion_database_id),
            notion_title_property: c.notion_title_property,
            notion_url_property: c.notion_url_property,
            notion_summary_property: c.notion_summary_property,
            notion_tags_property: c.notion_tags_property,
            notion_block_request_limit: env_parsed("NOTION_BLOCK_REQUEST_LIMIT", |v| v.parse().ok())
                .unwrap_or(c.notion_block_request_limit),
            jp_limit: env_parsed("JP_LIMIT", |v| v.parse().ok()).unwrap_or(c.jp_limit),
            en_limit: env_parsed("EN_LIMIT", |v| v.parse().ok()).unwrap_or(c.en_limit),
            script_ranges: env_parsed("SCRIPT_RANGES", parse_script_ranges).unwrap_or(c.script_ranges),
            concurrency_mode: env_parsed("CONCURRENCY_MODE", ConcurrencyMode::parse)
                .unwrap_or(c.concurrency_mode),
            max_concurrent_chunks: env_parsed("MAX_CONCURRENT_CHUNKS", |v| v.parse().ok())
                .unwrap_or(c.max_concurrent_chunks),
            output_dir: env_string("OUTPUT_DIR").unwrap_or(c.output_dir),
            error_log_file: env_string("ERROR_LOG_FILE").unwrap_or(c.error_log_file),
            title_max_chars: env_parsed("TITLE_MAX_CHARS", |v| v.parse().ok()).unwrap_or(c.title_max_chars),
            http_timeout_secs: env_parsed("HTTP_TIMEOUT_SECS", |v| v.parse().ok())
                .unwrap_or(c.http_timeout_secs),
            verbose_logging: env_parsed("VERBOSE_LOGGING", |v| v.parse().ok()).unwrap_or(c.verbose_logging),
        }
    }

    /// 在发起任何网络请求前检查必填项
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("llm_api_key", &self.llm_api_key),
            ("llm_model_name", &self.llm_model_name),
            ("notion_api_key", &self.notion_api_key),
            ("notion_database_id", &self.notion_database_id),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingValue { name: name.to_string() });
            }
        }
        if self.script_ranges.is_empty() {
            return Err(ConfigError::MissingValue {
                name: "script_ranges".to_string(),
            });
        }
        if let Some([start, end]) = self.script_ranges.iter().find(|[s, e]| s > e) {
            return Err(ConfigError::InvalidValue {
                name: "script_ranges".to_string(),
                value: format!("{start:X}-{end:X}"),
                expected: "起点不大于终点的码点区间".to_string(),
            });
        }
        if self.notion_block_request_limit == 0 {
            return Err(ConfigError::InvalidValue {
                name: "notion_block_request_limit".to_string(),
                value: "0".to_string(),
                expected: "正整数".to_string(),
            });
        }
        Ok(())
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parsed<T>(name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
    let raw = env_string(name)?;
    let parsed = parse(&raw);
    if parsed.is_none() {
        warn!("环境变量 {} 的值 '{}' 无法解析，使用默认值", name, raw);
    }
    parsed
}

/// 解析 `3040-309F,30A0-30FF` 形式的十六进制码点区间
pub fn parse_script_ranges(value: &str) -> Option<Vec<[u32; 2]>> {
    let mut ranges = Vec::new();
    for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (start, end) = part.split_once('-')?;
        let start = u32::from_str_radix(start.trim().trim_start_matches("0x"), 16).ok()?;
        let end = u32::from_str_radix(end.trim().trim_start_matches("0x"), 16).ok()?;
        ranges.push([start, end]);
    }
    (!ranges.is_empty()).then_some(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_script_ranges() {
        assert_eq!(
            parse_script_ranges("3040-309F, 0x30A0-0x30FF"),
            Some(vec![[0x3040, 0x309F], [0x30A0, 0x30FF]])
        );
        assert_eq!(parse_script_ranges("3040"), None);
        assert_eq!(parse_script_ranges("zz-10"), None);
        assert_eq!(parse_script_ranges(""), None);
    }

    #[test]
    fn test_toml_partial_uses_defaults() {
        let config = Config::from_toml_str(
            r#"
            llm_backend = "openai"
            concurrency_mode = "sequential"
            notion_block_request_limit = 50
            script_ranges = [[0x3040, 0x309F]]
            "#,
        )
        .unwrap();

        assert_eq!(config.llm_backend, ModelBackend::OpenAi);
        assert_eq!(config.concurrency_mode, ConcurrencyMode::Sequential);
        assert_eq!(config.notion_block_request_limit, 50);
        assert_eq!(config.script_ranges, vec![[0x3040, 0x309F]]);
        assert_eq!(config.en_limit, 1000);
        assert_eq!(config.notion_version, "2022-06-28");
    }

    #[test]
    fn test_validate_reports_missing_credentials() {
        let config = Config::default();
        match config.validate() {
            Err(ConfigError::MissingValue { name }) => assert_eq!(name, "llm_api_key"),
            other => panic!("unexpected: {:?}", other),
        }

        let config = Config {
            llm_api_key: "k".into(),
            notion_api_key: "n".into(),
            notion_database_id: "db".into(),
            ..Config::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let config = Config {
            llm_api_key: "k".into(),
            notion_api_key: "n".into(),
            notion_database_id: "db".into(),
            script_ranges: vec![[0x309F, 0x3040]],
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(ConcurrencyMode::parse("Sequential"), Some(ConcurrencyMode::Sequential));
        assert_eq!(ConcurrencyMode::parse("async"), Some(ConcurrencyMode::Concurrent));
        assert_eq!(ModelBackend::parse("claude"), Some(ModelBackend::Anthropic));
        assert_eq!(ModelBackend::parse("gpt"), None);
    }
}
