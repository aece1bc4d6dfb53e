//! LLM 服务 - 业务能力层
//!
//! 只负责"让模型写一段文字"的能力，不关心流程：
//! 分块要点、按原文重新翻译、全文摘要、关键词。
//! 目标语言判定与重试次数由流程层决定。

use std::sync::Arc;

use tracing::debug;

use crate::clients::Generator;
use crate::error::AppResult;
use crate::services::script_classifier::ScriptClassifier;

/// 关键词上限
pub const MAX_KEYWORDS: usize = 5;

const CHUNK_SYSTEM_PROMPT: &str = "あなたは長文を日本語の構造化されたノートにまとめる編集者です。\
見出しには #、##、### を、要点には - で始まる箇条書きを使い、\
詳細は半角スペース4つで字下げして最大3階層までにしてください。\
前置きや結びの文は書かず、必ず日本語で出力してください。";

const TRANSLATE_SYSTEM_PROMPT: &str = "あなたはプロの翻訳者です。\
与えられた文章の要点を日本語の箇条書きに翻訳してください。\
見出しには #、##、### を、要点には - を使い、詳細は半角スペース4つで字下げしてください。\
出力は必ず日本語のみとし、原文の言語を残さないでください。";

const SUMMARY_SYSTEM_PROMPT: &str = "あなたは要約の専門家です。\
与えられたノート全体の内容を日本語の一文で要約してください。要約文のみを出力してください。";

const SUMMARY_FALLBACK_SYSTEM_PROMPT: &str = "次の文章が何について書かれているかを、\
日本語で一文だけ書いてください。英語は使わないでください。";

const KEYWORD_SYSTEM_PROMPT: &str = "あなたは文書に付けるタグを選ぶ編集者です。\
与えられたノートの内容を最もよく表すキーワードを重要な順に最大5つ、\
カンマ区切りの一行で出力してください。キーワード以外は出力しないでください。";

const KEYWORD_FALLBACK_SYSTEM_PROMPT: &str = "次の文章に出てくる重要な用語を3つから5つ選び、\
「用語1, 用語2, 用語3」の形式でカンマ区切りにして一行で出力してください。";

/// LLM 服务
///
/// 职责：
/// - 拼接提示词并调用 [`Generator`]
/// - 解析关键词列表
/// - 只处理单个分块或单篇文档的全文
/// - 不关心分块顺序和并发方式
pub struct LlmService<G> {
    generator: Arc<G>,
    classifier: Arc<dyn ScriptClassifier>,
}

impl<G> Clone for LlmService<G> {
    fn clone(&self) -> Self {
        Self {
            generator: Arc::clone(&self.generator),
            classifier: Arc::clone(&self.classifier),
        }
    }
}

impl<G: Generator> LlmService<G> {
    pub fn new(generator: Arc<G>, classifier: Arc<dyn ScriptClassifier>) -> Self {
        Self {
            generator,
            classifier,
        }
    }

    /// 是否含有目标语言文字
    pub fn is_conformant(&self, text: &str) -> bool {
        self.classifier.is_conformant(text)
    }

    /// 为一个分块生成要点大纲
    pub async fn summarize_chunk(&self, title: &str, text: &str) -> AppResult<String> {
        let user_prompt = format!("タイトル: {}\n\n本文:\n{}", title, text);
        self.send(CHUNK_SYSTEM_PROMPT, &user_prompt).await
    }

    /// 基于原文重新生成，用于目标语言不符合时的重试
    pub async fn translate_chunk(&self, text: &str) -> AppResult<String> {
        let user_prompt = format!("次の文章を翻訳してください:\n\n{}", text);
        self.send(TRANSLATE_SYSTEM_PROMPT, &user_prompt).await
    }

    /// 全文一句话摘要，`fallback` 时换一种问法
    pub async fn summarize_document(&self, text: &str, fallback: bool) -> AppResult<String> {
        let system_prompt = if fallback {
            SUMMARY_FALLBACK_SYSTEM_PROMPT
        } else {
            SUMMARY_SYSTEM_PROMPT
        };
        let summary = self.send(system_prompt, text).await?;
        Ok(summary.trim().to_string())
    }

    /// 提取关键词，`fallback` 时换一种问法
    pub async fn extract_keywords(&self, text: &str, fallback: bool) -> AppResult<Vec<String>> {
        let system_prompt = if fallback {
            KEYWORD_FALLBACK_SYSTEM_PROMPT
        } else {
            KEYWORD_SYSTEM_PROMPT
        };
        let raw = self.send(system_prompt, text).await?;
        Ok(parse_keywords(&raw))
    }

    async fn send(&self, system_prompt: &str, user_prompt: &str) -> AppResult<String> {
        debug!("调用 LLM，用户消息长度: {} 字符", user_prompt.chars().count());
        let generation = self.generator.generate(system_prompt, user_prompt).await?;
        if let Some(usage) = generation.usage {
            debug!(
                "LLM token 用量: 输入 {} / 输出 {}",
                usage.input_tokens, usage.output_tokens
            );
        }
        Ok(generation.text)
    }
}

/// 解析关键词列表
///
/// 按 `,` `、` `，` 和换行分隔，去掉列表标记和引号，去重后最多保留 5 个
pub fn parse_keywords(raw: &str) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    for item in raw.split([',', '、', '，', '\n']) {
        let item = item.trim().trim_start_matches(['-', '*', '・', '#']).trim();
        let item = match item.split_once(['.', ')']) {
            Some((number, rest))
                if !number.is_empty() && number.chars().all(|c| c.is_ascii_digit()) =>
            {
                rest
            }
            _ => item,
        };
        let keyword = item.trim().trim_matches(['"', '\'', '「', '」', '`']).trim();
        if keyword.is_empty() || keywords.iter().any(|k| k == keyword) {
            continue;
        }
        keywords.push(keyword.to_string());
        if keywords.len() == MAX_KEYWORDS {
            break;
        }
    }
    keywords
}
