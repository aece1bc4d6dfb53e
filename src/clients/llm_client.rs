/// LLM API 客户端
///
/// 封装所有与生成模型 API 相关的调用逻辑。一次运行只创建一个客户端，
/// 由同一阶段的所有并发任务通过 `Arc` 共享。
use std::future::Future;
use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::{Config, ModelBackend};
use crate::error::{AppError, AppResult, LlmError};

/// 频率限制时的最大尝试次数
const RATE_LIMIT_ATTEMPTS: usize = 3;
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(2);
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// token 用量
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// 一次生成的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

impl Generation {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }
}

/// 文本生成能力
///
/// 传输层自己的重试（频率限制等）由实现负责；持续失败时返回错误
pub trait Generator: Send + Sync {
    fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> impl Future<Output = AppResult<Generation>> + Send;
}

enum Backend {
    OpenAi(Client<OpenAIConfig>),
    Anthropic {
        http: reqwest::Client,
        api_key: String,
        api_base_url: String,
    },
}

/// LLM 客户端
pub struct LlmClient {
    backend: Backend,
    model_name: String,
    max_tokens: u32,
}

impl LlmClient {
    /// 按配置创建客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let backend = match config.llm_backend {
            ModelBackend::OpenAi => {
                // 兼容 OpenAI API 的服务
                let openai_config = OpenAIConfig::new()
                    .with_api_key(&config.llm_api_key)
                    .with_api_base(&config.llm_api_base_url);
                Backend::OpenAi(Client::with_config(openai_config))
            }
            ModelBackend::Anthropic => {
                let http = reqwest::Client::builder()
                    .timeout(Duration::from_secs(config.http_timeout_secs))
                    .build()
                    .map_err(|e| AppError::llm_api_failed(&config.llm_model_name, e))?;
                Backend::Anthropic {
                    http,
                    api_key: config.llm_api_key.clone(),
                    api_base_url: config.llm_api_base_url.trim_end_matches('/').to_string(),
                }
            }
        };

        Ok(Self {
            backend,
            model_name: config.llm_model_name.clone(),
            max_tokens: config.llm_max_tokens,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn send_openai(
        &self,
        client: &Client<OpenAIConfig>,
        system_prompt: &str,
        user_prompt: &str,
    ) -> AppResult<Generation> {
        let model = &self.model_name;
        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(system_prompt)
            .build()
            .map_err(|e| AppError::llm_api_failed(model, e))?;
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_prompt)
            .build()
            .map_err(|e| AppError::llm_api_failed(model, e))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ])
            .max_completion_tokens(self.max_tokens)
            .build()
            .map_err(|e| AppError::llm_api_failed(model, e))?;

        let response = client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            AppError::llm_api_failed(model, e)
        })?;

        let text = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| LlmError::EmptyContent {
                model: model.clone(),
            })?;
        let usage = response.usage.map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });

        Ok(Generation {
            text: text.trim().to_string(),
            usage,
        })
    }

    async fn send_anthropic(
        &self,
        http: &reqwest::Client,
        api_key: &str,
        api_base_url: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> AppResult<Generation> {
        let model = &self.model_name;
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key.trim()).map_err(|e| AppError::llm_api_failed(model, e))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let body = AnthropicRequest {
            model,
            max_tokens: self.max_tokens,
            system: system_prompt,
            messages: vec![AnthropicMessage {
                role: "user",
                content: user_prompt,
            }],
        };
        let endpoint = format!("{}/messages", api_base_url);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let resp = http
                .post(&endpoint)
                .headers(headers.clone())
                .json(&body)
                .send()
                .await
                .map_err(|e| AppError::llm_api_failed(model, e))?;

            let status = resp.status();
            if let Some(delay) = rate_limit_backoff(model, status.as_u16(), attempt)? {
                warn!(
                    "LLM API 请求频率限制 (尝试 {}/{}), 等待后重试...",
                    attempt, RATE_LIMIT_ATTEMPTS
                );
                sleep(delay).await;
                continue;
            }
            if !status.is_success() {
                let body = resp
                    .text()
                    .await
                    .unwrap_or_else(|_| "<body unavailable>".to_string());
                return Err(LlmError::BadResponse {
                    model: model.clone(),
                    status: status.as_u16(),
                    body,
                }
                .into());
            }

            let parsed: AnthropicResponse = resp
                .json()
                .await
                .map_err(|e| AppError::llm_api_failed(model, e))?;
            let text = parsed
                .content
                .into_iter()
                .filter_map(|block| match block {
                    AnthropicResponseBlock::Text { text } => Some(text),
                    AnthropicResponseBlock::Other => None,
                })
                .collect::<Vec<_>>()
                .join("\n");
            if text.trim().is_empty() {
                return Err(LlmError::EmptyContent {
                    model: model.clone(),
                }
                .into());
            }

            return Ok(Generation {
                text: text.trim().to_string(),
                usage: parsed.usage.map(|u| TokenUsage {
                    input_tokens: u.input_tokens,
                    output_tokens: u.output_tokens,
                }),
            });
        }
    }
}

/// 频率限制（429）与服务过载（529）的处理
///
/// 其他状态返回 `Ok(None)`；还有剩余次数时返回等待时间；第 3 次仍被限制时返回错误
fn rate_limit_backoff(
    model: &str,
    status: u16,
    attempt: usize,
) -> Result<Option<Duration>, LlmError> {
    if status != 429 && status != 529 {
        return Ok(None);
    }
    if attempt >= RATE_LIMIT_ATTEMPTS {
        return Err(LlmError::RateLimited {
            model: model.to_string(),
            attempts: attempt,
        });
    }
    Ok(Some(RATE_LIMIT_BACKOFF * attempt as u32))
}

impl Generator for LlmClient {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> AppResult<Generation> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_prompt.chars().count());

        let generation = match &self.backend {
            Backend::OpenAi(client) => self.send_openai(client, system_prompt, user_prompt).await?,
            Backend::Anthropic {
                http,
                api_key,
                api_base_url,
            } => {
                self.send_anthropic(http, api_key, api_base_url, system_prompt, user_prompt)
                    .await?
            }
        };

        if let Some(usage) = generation.usage {
            debug!(
                "LLM API 调用成功, 输入 {} / 输出 {} tokens",
                usage.input_tokens, usage.output_tokens
            );
        }
        Ok(generation)
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicResponseBlock>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicResponseBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}
