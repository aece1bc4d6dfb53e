/// Notion API 客户端
///
/// 封装所有与文档库相关的调用逻辑：创建页面、追加块、更新摘要与标签、归档。
/// 大纲节点只在这里转换成 Notion 的块结构。
use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, StoreError};
use crate::models::{NodeLevel, OutlineNode, PageId, PublishBatch};

/// 单个 rich_text 的最大字符数
const RICH_TEXT_LIMIT: usize = 2000;

/// 文档库能力
pub trait DocumentStore: Send + Sync {
    /// 创建页面并立即追加目录块
    fn create_page(
        &self,
        title: &str,
        url: &str,
    ) -> impl Future<Output = AppResult<PageId>> + Send;

    /// 追加一批大纲块
    fn append_blocks(
        &self,
        page_id: &PageId,
        batch: &PublishBatch,
    ) -> impl Future<Output = AppResult<()>> + Send;

    /// 更新摘要和标签
    fn update_page(
        &self,
        page_id: &PageId,
        summary: &str,
        tags: &[String],
    ) -> impl Future<Output = AppResult<()>> + Send;

    /// 归档（软删除）页面
    fn archive_page(&self, page_id: &PageId) -> impl Future<Output = AppResult<()>> + Send;
}

/// Notion 客户端
pub struct NotionClient {
    http: reqwest::Client,
    base_url: String,
    database_id: String,
    title_property: String,
    url_property: String,
    summary_property: String,
    tags_property: String,
}

impl NotionClient {
    /// 创建新的 Notion 客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.notion_api_key.trim()))
            .map_err(|e| AppError::store_rejected("configure", e.to_string()))?;
        let version = HeaderValue::from_str(&config.notion_version)
            .map_err(|e| AppError::store_rejected("configure", e.to_string()))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert("Notion-Version", version);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| AppError::store_request_failed("client", e))?;

        Ok(Self {
            http,
            base_url: config.notion_api_base_url.trim_end_matches('/').to_string(),
            database_id: config.notion_database_id.clone(),
            title_property: config.notion_title_property.clone(),
            url_property: config.notion_url_property.clone(),
            summary_property: config.notion_summary_property.clone(),
            tags_property: config.notion_tags_property.clone(),
        })
    }

    /// 发送请求并检查响应状态
    async fn send(&self, method: reqwest::Method, path: &str, body: Value) -> AppResult<Value> {
        let endpoint = format!("{}/{}", self.base_url, path);
        debug!("Notion API {} {}", method, endpoint);

        let resp = self
            .http
            .request(method, &endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::store_request_failed(&endpoint, e))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .json::<Value>()
                .await
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| status.to_string());
            warn!("Notion API 返回错误: {} {}", status, message);
            return Err(StoreError::BadResponse {
                endpoint,
                status: status.as_u16(),
                message,
            }
            .into());
        }

        resp.json::<Value>()
            .await
            .map_err(|e| AppError::store_request_failed(&endpoint, e))
    }
}

impl DocumentStore for NotionClient {
    async fn create_page(&self, title: &str, url: &str) -> AppResult<PageId> {
        let body = json!({
            "parent": { "database_id": self.database_id },
            "properties": {
                self.title_property.as_str(): { "title": rich_text(title) },
                self.url_property.as_str(): { "url": url },
            },
            "children": [
                { "object": "block", "type": "table_of_contents", "table_of_contents": { "color": "default" } }
            ],
        });

        let resp = self.send(reqwest::Method::POST, "pages", body).await?;
        let id = resp
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::MissingPageId {
                endpoint: "pages".to_string(),
            })?;
        Ok(PageId(id.to_string()))
    }

    async fn append_blocks(&self, page_id: &PageId, batch: &PublishBatch) -> AppResult<()> {
        let children: Vec<Value> = batch.nodes.iter().map(to_notion_block).collect();
        let path = format!("blocks/{}/children", page_id);
        self.send(reqwest::Method::PATCH, &path, json!({ "children": children }))
            .await?;
        Ok(())
    }

    async fn update_page(&self, page_id: &PageId, summary: &str, tags: &[String]) -> AppResult<()> {
        let body = json!({
            "properties": {
                self.summary_property.as_str(): { "rich_text": rich_text(summary) },
                self.tags_property.as_str(): { "multi_select": tag_options(tags) },
            }
        });
        let path = format!("pages/{}", page_id);
        self.send(reqwest::Method::PATCH, &path, body).await?;
        Ok(())
    }

    async fn archive_page(&self, page_id: &PageId) -> AppResult<()> {
        let path = format!("pages/{}", page_id);
        self.send(reqwest::Method::PATCH, &path, json!({ "archived": true }))
            .await?;
        Ok(())
    }
}

/// 大纲节点 → Notion 块
pub fn to_notion_block(node: &OutlineNode) -> Value {
    let block_type = match node.level {
        NodeLevel::Heading1 => "heading_1",
        NodeLevel::Heading2 => "heading_2",
        NodeLevel::Heading3 => "heading_3",
        NodeLevel::Bullet => "bulleted_list_item",
    };

    let mut content = json!({ "rich_text": rich_text(&node.text) });
    if node.level.is_heading() {
        // 标题只有在可折叠时才能包含子块
        content["is_toggleable"] = json!(!node.children.is_empty());
    }
    if !node.children.is_empty() {
        content["children"] = Value::Array(node.children.iter().map(to_notion_block).collect());
    }

    json!({
        "object": "block",
        "type": block_type,
        block_type: content,
    })
}

fn rich_text(text: &str) -> Value {
    let content: String = text.chars().take(RICH_TEXT_LIMIT).collect();
    json!([{ "type": "text", "text": { "content": content } }])
}

/// Notion 的多选项名称不能包含逗号
fn tag_options(tags: &[String]) -> Value {
    Value::Array(
        tags.iter()
            .map(|tag| tag.replace(',', " ").trim().to_string())
            .filter(|tag| !tag.is_empty())
            .map(|name| json!({ "name": name }))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_with_children_is_toggleable() {
        let node = OutlineNode::new(NodeLevel::Heading2, "背景")
            .with_children(vec![OutlineNode::bullet("理由")]);
        let block = to_notion_block(&node);

        assert_eq!(block["type"], "heading_2");
        assert_eq!(block["heading_2"]["is_toggleable"], true);
        assert_eq!(block["heading_2"]["rich_text"][0]["text"]["content"], "背景");
        let child = &block["heading_2"]["children"][0];
        assert_eq!(child["type"], "bulleted_list_item");
        assert!(child["bulleted_list_item"].get("children").is_none());
    }

    #[test]
    fn test_plain_heading_is_not_toggleable() {
        let block = to_notion_block(&OutlineNode::new(NodeLevel::Heading1, "概要"));
        assert_eq!(block["heading_1"]["is_toggleable"], false);
    }

    #[test]
    fn test_rich_text_is_truncated() {
        let long = "あ".repeat(RICH_TEXT_LIMIT + 10);
        let value = rich_text(&long);
        let content = value[0]["text"]["content"].as_str().unwrap();
        assert_eq!(content.chars().count(), RICH_TEXT_LIMIT);
    }

    #[test]
    fn test_tag_options_strip_commas() {
        let tags = vec!["Rust, 言語".to_string(), " ".to_string(), "並行処理".to_string()];
        let value = tag_options(&tags);
        assert_eq!(value, json!([{ "name": "Rust  言語" }, { "name": "並行処理" }]));
    }

    #[test]
    fn test_client_rejects_invalid_header() {
        let config = Config {
            notion_api_key: "bad\nkey".into(),
            ..Config::default()
        };
        assert!(NotionClient::new(&config).is_err());
    }
}
