use super::task::TaskName;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a run was asked to analyze
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Request {
    Video { video_id: String },
    Channel { channel_id: String, max_videos: usize },
    Repository { url: String },
}

impl Request {
    pub fn video(video_id: impl Into<String>) -> Self {
        Request::Video {
            video_id: video_id.into(),
        }
    }

    pub fn channel(channel_id: impl Into<String>, max_videos: usize) -> Self {
        Request::Channel {
            channel_id: channel_id.into(),
            max_videos,
        }
    }

    pub fn repository(url: impl Into<String>) -> Self {
        Request::Repository { url: url.into() }
    }

    /// Tasks whose failure makes the whole run fail
    pub fn critical_path(&self) -> &'static [TaskName] {
        match self {
            Request::Video { .. } | Request::Channel { .. } => &[TaskName::VideoAnalysis],
            Request::Repository { .. } => {
                &[TaskName::VideoAnalysis, TaskName::RepositoryAnalysis]
            }
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::Video { video_id } => write!(f, "video {}", video_id),
            Request::Channel {
                channel_id,
                max_videos,
            } => write!(f, "channel {} (up to {} videos)", channel_id, max_videos),
            Request::Repository { url } => write!(f, "repository {}", url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_critical_paths() {
        assert_eq!(
            Request::video("abc123").critical_path(),
            &[TaskName::VideoAnalysis]
        );
        assert_eq!(
            Request::repository("https://github.com/a/b").critical_path(),
            &[TaskName::VideoAnalysis, TaskName::RepositoryAnalysis]
        );
    }

    #[test]
    fn test_serialization_is_tagged() {
        let json = serde_json::to_value(Request::channel("UC123", 5)).unwrap();
        assert_eq!(json["kind"], "channel");
        assert_eq!(json["channel_id"], "UC123");
        assert_eq!(json["max_videos"], 5);
    }

    #[test]
    fn test_display() {
        assert_eq!(Request::video("abc123").to_string(), "video abc123");
    }
}
