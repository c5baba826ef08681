//! YouTube Data API v3 client
//!
//! Video metadata and channel listings come from the Data API. Captions come
//! from the public `timedtext` endpoint, which answers with an empty body when
//! a video has no captions in the requested language.

use super::error::SourceError;
use super::{ChannelInfo, VideoSource};
use crate::pipeline::{Transcript, VideoMetadata};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const TIMEDTEXT_BASE: &str = "https://video.google.com/timedtext";
const PAGE_SIZE: usize = 50;

pub struct YouTubeClient {
    http: Client,
    api_key: Option<String>,
    api_base: String,
    timedtext_base: String,
    transcript_language: String,
}

impl YouTubeClient {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self, SourceError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            api_base: API_BASE.to_string(),
            timedtext_base: TIMEDTEXT_BASE.to_string(),
            transcript_language: "en".to_string(),
        })
    }

    /// Points the client at another host, e.g. a local stub server
    pub fn with_base_urls(mut self, api_base: impl Into<String>, timedtext_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self.timedtext_base = timedtext_base.into();
        self
    }

    pub fn with_transcript_language(mut self, language: impl Into<String>) -> Self {
        self.transcript_language = language.into();
        self
    }

    fn key(&self) -> Result<&str, SourceError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| SourceError::configuration("YOUTUBE_API_KEY is not set"))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T, SourceError> {
        let key = self.key()?;
        let url = format!("{}/{}", self.api_base, endpoint);
        debug!(endpoint, "YouTube API request");

        let response = self
            .http
            .get(&url)
            .query(query)
            .query(&[("key", key)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status.as_u16(), &body));
        }

        Ok(response.json::<T>().await?)
    }

    async fn uploads_playlist(&self, channel_id: &str) -> Result<String, SourceError> {
        let response: ListResponse<ChannelItem> = self
            .get_json("channels", &[("part", "contentDetails"), ("id", channel_id)])
            .await?;
        response
            .items
            .into_iter()
            .next()
            .and_then(|c| c.content_details)
            .and_then(|d| d.related_playlists.uploads)
            .ok_or_else(|| SourceError::not_found(format!("channel not found: {}", channel_id)))
    }
}

#[async_trait]
impl VideoSource for YouTubeClient {
    async fn video_details(&self, video_id: &str) -> Result<VideoMetadata, SourceError> {
        let response: ListResponse<VideoItem> = self
            .get_json("videos", &[("part", "snippet,statistics"), ("id", video_id)])
            .await?;
        let item = response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::not_found(format!("video not found: {}", video_id)))?;
        Ok(item.into_metadata())
    }

    async fn transcript(&self, video_id: &str) -> Result<Option<Transcript>, SourceError> {
        let response = self
            .http
            .get(&self.timedtext_base)
            .query(&[("lang", self.transcript_language.as_str()), ("v", video_id)])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(SourceError::from_status(
                status.as_u16(),
                format!("transcript request failed with status {}", status),
            ));
        }

        let body = response.text().await?;
        match parse_timedtext(&body) {
            Ok(Some(text)) => Ok(Some(Transcript {
                text,
                language: Some(self.transcript_language.clone()),
            })),
            Ok(None) => Ok(None),
            Err(e) => {
                warn!(video_id, error = %e, "Ignoring unreadable transcript");
                Ok(None)
            }
        }
    }

    async fn channel_videos(&self, channel_id: &str, limit: usize) -> Result<Vec<String>, SourceError> {
        let playlist = self.uploads_playlist(channel_id).await?;
        let mut video_ids = Vec::new();
        let mut page_token: Option<String> = None;

        while video_ids.len() < limit {
            let page_size = PAGE_SIZE.min(limit - video_ids.len()).to_string();
            let mut query = vec![
                ("part", "contentDetails"),
                ("playlistId", playlist.as_str()),
                ("maxResults", page_size.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let page: ListResponse<PlaylistItem> = self.get_json("playlistItems", &query).await?;
            video_ids.extend(page.items.into_iter().map(|i| i.content_details.video_id));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        video_ids.truncate(limit);
        Ok(video_ids)
    }

    async fn channel_info(&self, channel_id: &str) -> Result<ChannelInfo, SourceError> {
        let response: ListResponse<ChannelItem> = self
            .get_json("channels", &[("part", "snippet,statistics"), ("id", channel_id)])
            .await?;
        let item = response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::not_found(format!("channel not found: {}", channel_id)))?;

        let stats = item.statistics.unwrap_or_default();
        Ok(ChannelInfo {
            channel_id: item.id,
            title: item.snippet.map(|s| s.title).unwrap_or_default(),
            subscriber_count: parse_count(stats.subscriber_count.as_deref()),
            video_count: parse_count(stats.video_count.as_deref()),
        })
    }
}

/// Maps a Data API error response to the pipeline taxonomy
fn classify_error(status: u16, body: &str) -> SourceError {
    let reason = serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.error.errors.into_iter().next())
        .map(|e| e.reason)
        .unwrap_or_default();
    let message = if reason.is_empty() {
        format!("YouTube API returned {}", status)
    } else {
        format!("YouTube API returned {} ({})", status, reason)
    };

    match (status, reason.as_str()) {
        (403, "quotaExceeded" | "dailyLimitExceeded" | "rateLimitExceeded") => {
            SourceError::quota_exceeded(message)
        }
        (400, "keyInvalid" | "badRequest") => SourceError::configuration(message),
        _ => SourceError::from_status(status, message),
    }
}

fn parse_count(value: Option<&str>) -> u64 {
    value.and_then(|v| v.parse().ok()).unwrap_or(0)
}

/// Extracts caption text from a `timedtext` XML document
fn parse_timedtext(body: &str) -> Result<Option<String>, roxmltree::Error> {
    if body.trim().is_empty() {
        return Ok(None);
    }
    let doc = roxmltree::Document::parse(body)?;
    let lines: Vec<String> = doc
        .descendants()
        .filter(|n| n.has_tag_name("text"))
        .filter_map(|n| n.text())
        .map(decode_entities)
        .filter(|line| !line.trim().is_empty())
        .collect();

    if lines.is_empty() {
        Ok(None)
    } else {
        Ok(Some(lines.join(" ")))
    }
}

// Caption text arrives entity-encoded a second time inside the XML
fn decode_entities(text: &str) -> String {
    text.replace("&#39;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
        .replace('\n', " ")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    id: String,
    snippet: VideoSnippet,
    #[serde(default)]
    statistics: Statistics,
}

impl VideoItem {
    fn into_metadata(self) -> VideoMetadata {
        let published_at = self
            .snippet
            .published_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc));

        VideoMetadata {
            video_id: self.id,
            title: self.snippet.title,
            channel_id: self.snippet.channel_id,
            channel_title: self.snippet.channel_title,
            description: self.snippet.description,
            published_at,
            view_count: parse_count(self.statistics.view_count.as_deref()),
            like_count: parse_count(self.statistics.like_count.as_deref()),
            comment_count: parse_count(self.statistics.comment_count.as_deref()),
            tags: self.snippet.tags,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    channel_id: String,
    #[serde(default)]
    channel_title: String,
    published_at: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

/// The Data API encodes counters as strings
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
    subscriber_count: Option<String>,
    video_count: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelItem {
    id: String,
    snippet: Option<ChannelSnippet>,
    statistics: Option<Statistics>,
    content_details: Option<ChannelContentDetails>,
}

#[derive(Debug, Deserialize)]
struct ChannelSnippet {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentDetails {
    related_playlists: RelatedPlaylists,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItem {
    content_details: PlaylistContentDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistContentDetails {
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    errors: Vec<ApiErrorReason>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorReason {
    #[serde(default)]
    reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::FailureKind;

    #[test]
    fn test_video_item_into_metadata() {
        let json = r#"{
            "items": [{
                "id": "abc123",
                "snippet": {
                    "publishedAt": "2024-03-01T12:00:00Z",
                    "channelId": "UC1",
                    "title": "Building a CLI in Rust",
                    "description": "Code: https://github.com/a/b",
                    "channelTitle": "Rustacean",
                    "tags": ["rust", "cli"]
                },
                "statistics": {
                    "viewCount": "10000",
                    "likeCount": "420",
                    "commentCount": "80"
                }
            }]
        }"#;
        let response: ListResponse<VideoItem> = serde_json::from_str(json).unwrap();
        let metadata = response.items.into_iter().next().unwrap().into_metadata();
        assert_eq!(metadata.video_id, "abc123");
        assert_eq!(metadata.view_count, 10_000);
        assert_eq!(metadata.like_count, 420);
        assert_eq!(metadata.comment_count, 80);
        assert_eq!(metadata.tags, vec!["rust", "cli"]);
        assert!(metadata.published_at.is_some());
    }

    #[test]
    fn test_missing_statistics_default_to_zero() {
        let json = r#"{"items": [{"id": "x", "snippet": {"title": "t"}}]}"#;
        let response: ListResponse<VideoItem> = serde_json::from_str(json).unwrap();
        let metadata = response.items.into_iter().next().unwrap().into_metadata();
        assert_eq!(metadata.view_count, 0);
        assert!(metadata.published_at.is_none());
    }

    #[test]
    fn test_classify_quota_exceeded() {
        let body = r#"{"error": {"code": 403, "errors": [{"reason": "quotaExceeded"}]}}"#;
        let err = classify_error(403, body);
        assert_eq!(err.kind, FailureKind::QuotaExceeded);
        assert!(err.recoverable);
    }

    #[test]
    fn test_classify_forbidden_without_quota_reason() {
        let body = r#"{"error": {"code": 403, "errors": [{"reason": "forbidden"}]}}"#;
        assert_eq!(classify_error(403, body).kind, FailureKind::AccessDenied);
    }

    #[test]
    fn test_classify_server_error_and_garbage_body() {
        let err = classify_error(503, "<html>oops</html>");
        assert_eq!(err.kind, FailureKind::TransientError);
        assert!(err.recoverable);
    }

    #[test]
    fn test_parse_timedtext() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?><transcript>
            <text start="0" dur="2.1">Welcome back</text>
            <text start="2.1" dur="3.0">today we&amp;#39;re building github.com/a/b</text>
        </transcript>"#;
        let text = parse_timedtext(xml).unwrap().unwrap();
        assert_eq!(text, "Welcome back today we're building github.com/a/b");
    }

    #[test]
    fn test_parse_empty_timedtext() {
        assert_eq!(parse_timedtext("").unwrap(), None);
        assert_eq!(parse_timedtext("<transcript></transcript>").unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_key_is_configuration_error() {
        let client = YouTubeClient::new(None, Duration::from_secs(1)).unwrap();
        let err = client.video_details("abc").await.unwrap_err();
        assert_eq!(err.kind, FailureKind::ConfigurationError);
        assert!(!err.recoverable);
    }
}
