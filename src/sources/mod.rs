//! External collaborators the pipeline tasks call
//!
//! Each collaborator is an async trait injected into the tasks as
//! `Arc<dyn …>`, with a real network-backed implementation and a scripted
//! in-memory stub in [`mock`].

pub mod builder;
pub mod detect;
mod error;
pub mod github;
pub mod mock;
pub mod strategy;
pub mod youtube;

pub use builder::LocalBuildRunner;
pub use error::SourceError;
pub use github::GitHubClient;
pub use strategy::LlmStrategyGenerator;
pub use youtube::YouTubeClient;

use crate::pipeline::{
    BuildReport, RepositoryInfo, Strategy, StrategyInput, Transcript, VideoMetadata,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub channel_id: String,
    pub title: String,
    pub subscriber_count: u64,
    pub video_count: u64,
}

#[async_trait]
pub trait VideoSource: Send + Sync {
    async fn video_details(&self, video_id: &str) -> Result<VideoMetadata, SourceError>;

    /// `Ok(None)` when the video has no usable captions
    async fn transcript(&self, video_id: &str) -> Result<Option<Transcript>, SourceError>;

    /// Most recent uploads first, at most `limit` ids
    async fn channel_videos(&self, channel_id: &str, limit: usize)
        -> Result<Vec<String>, SourceError>;

    async fn channel_info(&self, channel_id: &str) -> Result<ChannelInfo, SourceError>;
}

#[async_trait]
pub trait RepositorySource: Send + Sync {
    async fn analyze(&self, url: &str) -> Result<RepositoryInfo, SourceError>;

    /// Number of public repositories associated with a technology
    async fn technology_popularity(&self, technology: &str) -> Result<u64, SourceError>;
}

#[async_trait]
pub trait BuildRunner: Send + Sync {
    async fn build(&self, repository: &RepositoryInfo) -> Result<BuildReport, SourceError>;
}

#[async_trait]
pub trait StrategyGenerator: Send + Sync {
    async fn generate(&self, input: &StrategyInput) -> Result<Vec<Strategy>, SourceError>;
}
