//! 视频字幕来源
//!
//! 接受 YouTube 视频 ID 或观看页 URL。观看页提供标题和字幕轨道列表，
//! 再下载字幕 XML，每个字幕片段作为一个 token。

use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use scraper::{Html, Selector};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::AcquisitionError;
use crate::ingest::web::{is_blocked, USER_AGENT};
use crate::ingest::Ingestor;
use crate::models::SourceDocument;

const TITLE_SUFFIX: &str = "- YouTube";
const CAPTION_TRACKS_KEY: &str = "\"captionTracks\":";

static VIDEO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:youtube\.com/(?:watch\?(?:.*&)?v=|shorts/|embed/|live/)|youtu\.be/)([A-Za-z0-9_-]{11})",
    )
    .expect("video url regex is valid")
});
static BARE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{11}$").expect("video id regex is valid"));
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("title selector is valid"));
static SEGMENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("text, p").expect("segment selector is valid"));

/// 观看页里的字幕轨道
#[derive(Debug, Deserialize)]
struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode", default)]
    language_code: String,
    #[serde(default)]
    kind: Option<String>,
}

pub struct TranscriptIngestor {
    http: reqwest::Client,
    title_max_chars: usize,
}

impl TranscriptIngestor {
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

    async fn fetch_text(&self, url: &str) -> Result<String, AcquisitionError> {
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
        resp.text().await.map_err(request_failed)
    }
}

impl Ingestor for TranscriptIngestor {
    async fn ingest(&self, source: &str) -> Result<SourceDocument, AcquisitionError> {
        let empty = || AcquisitionError::EmptyContent {
            source_id: source.to_string(),
        };
        let id = video_id(source).ok_or_else(empty)?;
        let watch_url = watch_url(&id);
        debug!("抓取视频页面: {}", watch_url);

        let page = self.fetch_text(&watch_url).await?;
        let title = page_title(&page);
        let track = pick_track(caption_tracks(&page)).ok_or_else(empty)?;
        debug!("字幕轨道: {} ({:?})", track.language_code, track.kind);

        let xml = self.fetch_text(&track.base_url).await?;
        let doc = SourceDocument::new(
            title.unwrap_or_else(|| id.clone()),
            watch_url,
            parse_transcript(&xml),
            self.title_max_chars,
        );
        if doc.is_empty() {
            return Err(empty());
        }
        Ok(doc)
    }
}

/// 从观看页 URL 或裸 ID 中取出视频 ID
///
/// 裸 ID 与本地已有的文件同名时按文件处理
pub fn video_id(source: &str) -> Option<String> {
    let source = source.trim();
    if let Some(caps) = VIDEO_URL.captures(source) {
        return Some(caps[1].to_string());
    }
    if BARE_ID.is_match(source) && !Path::new(source).exists() {
        return Some(source.to_string());
    }
    None
}

pub fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", id)
}

fn page_title(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let title = doc
        .select(&TITLE)
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .find(|text| !text.is_empty())?;
    let title = title.strip_suffix(TITLE_SUFFIX).unwrap_or(&title).trim_end();
    (!title.is_empty()).then(|| title.to_string())
}

/// 观看页内嵌的播放器配置里 `"captionTracks":[...]` 一段
fn caption_tracks(html: &str) -> Vec<CaptionTrack> {
    let Some(start) = html.find(CAPTION_TRACKS_KEY) else {
        return Vec::new();
    };
    let rest = &html[start + CAPTION_TRACKS_KEY.len()..];
    match serde_json::Deserializer::from_str(rest)
        .into_iter::<Vec<CaptionTrack>>()
        .next()
    {
        Some(Ok(tracks)) => tracks,
        Some(Err(e)) => {
            warn!("⚠️ 字幕轨道解析失败: {}", e);
            Vec::new()
        }
        None => Vec::new(),
    }
}

/// 人工字幕优先，没有时使用自动生成（asr）字幕
fn pick_track(mut tracks: Vec<CaptionTrack>) -> Option<CaptionTrack> {
    let manual = tracks
        .iter()
        .position(|track| track.kind.as_deref() != Some("asr"));
    match manual {
        Some(index) => Some(tracks.swap_remove(index)),
        None => tracks.into_iter().next(),
    }
}

/// 字幕 XML，每个 `<text>`（或 srv3 格式的 `<p>`）片段一个 token
fn parse_transcript(xml: &str) -> Vec<String> {
    let doc = Html::parse_fragment(xml);
    doc.select(&SEGMENT)
        .map(|el| unescape(&el.text().collect::<String>()))
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|text| !text.is_empty())
        .collect()
}

/// 字幕正文里的实体是二次转义的，解析器只还原了一层
fn unescape(text: &str) -> String {
    text.replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}
