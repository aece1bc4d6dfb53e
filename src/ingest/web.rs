//! 网页来源
//!
//! GET 页面后用 `scraper` 抽取标题与正文（标题、段落、列表项），按空白切成 token。
//! 401 / 403 / 429 视为来源拒绝访问。

use std::sync::LazyLock;
use std::time::Duration;

use reqwest::StatusCode;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::AcquisitionError;
use crate::ingest::{words, Ingestor};
use crate::models::SourceDocument;

pub(crate) const USER_AGENT: &str = concat!("notion_digest/", env!("CARGO_PKG_VERSION"));

static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title, h1").expect("title selector is valid"));
static BODY_TEXT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h1, h2, h3, h4, h5, h6, p, li, blockquote, pre")
        .expect("body selector is valid")
});

pub struct WebIngestor {
    http: reqwest::Client,
    title_max_chars: usize,
}

impl WebIngestor {
    pub fn new(config: &Config) -> Result<Self, AcquisitionError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|source| AcquisitionError::RequestFailed {
                url: String::new(),
                source,
            })?;
        Ok(Self {
            http,
            title_max_chars: config.title_max_chars,
        })
    }
}

impl Ingestor for WebIngestor {
    async fn ingest(&self, url: &str) -> Result<SourceDocument, AcquisitionError> {
        debug!("抓取网页: {}", url);
        let request_failed = |source: reqwest::Error| AcquisitionError::RequestFailed {
            url: url.to_string(),
            source,
        };

        let resp = self.http.get(url).send().await.map_err(request_failed)?;
        let status = resp.status();
        if is_blocked(status) {
            warn!("⚠️ 来源拒绝访问: {} (HTTP {})", url, status);
            return Err(AcquisitionError::Blocked {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let resp = resp.error_for_status().map_err(request_failed)?;
        let html = resp.text().await.map_err(request_failed)?;

        let (title, tokens) = extract(&html);
        let doc = SourceDocument::new(
            title.unwrap_or_else(|| url.to_string()),
            url,
            tokens,
            self.title_max_chars,
        );
        if doc.is_empty() {
            return Err(AcquisitionError::EmptyContent {
                source_id: url.to_string(),
            });
        }
        Ok(doc)
    }
}

pub(crate) fn is_blocked(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
    )
}

/// 从 HTML 中取出标题和正文 token
///
/// 嵌套在列表项里的段落只取最外层，避免同一段文字出现两次
fn extract(html: &str) -> (Option<String>, Vec<String>) {
    let doc = Html::parse_document(html);

    let title = doc
        .select(&TITLE)
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|text| !text.is_empty());

    let mut tokens = Vec::new();
    for el in doc.select(&BODY_TEXT) {
        let nested = el
            .ancestors()
            .filter_map(scraper::ElementRef::wrap)
            .any(|ancestor| BODY_TEXT.matches(&ancestor));
        if nested {
            continue;
        }
        for text in el.text() {
            tokens.extend(words(text));
        }
    }

    (title, tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_title_and_body() {
        let html = r#"
            <html><head><title> Rust の
              所有権 </title></head>
            <body>
              <nav>menu items</nav>
              <h1>所有権</h1>
              <p>Every value has <b>an owner</b>.</p>
              <ul><li>move <p>semantics</p></li></ul>
              <script>var ignored = 1;</script>
            </body></html>"#;

        let (title, tokens) = extract(html);
        assert_eq!(title.as_deref(), Some("Rust の 所有権"));
        assert_eq!(
            tokens,
            vec!["所有権", "Every", "value", "has", "an", "owner", ".", "move", "semantics"]
        );
    }

    #[test]
    fn test_extract_without_title() {
        let (title, tokens) = extract("<p>only text</p>");
        assert_eq!(title, None);
        assert_eq!(tokens, vec!["only", "text"]);
    }

    #[test]
    fn test_blocked_statuses() {
        assert!(is_blocked(StatusCode::FORBIDDEN));
        assert!(is_blocked(StatusCode::UNAUTHORIZED));
        assert!(is_blocked(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_blocked(StatusCode::NOT_FOUND));
        assert!(!is_blocked(StatusCode::OK));
    }
}
