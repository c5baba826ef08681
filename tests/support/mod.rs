//! Shared fixtures for pipeline integration tests

#![allow(dead_code)]

use reelforge::pipeline::{Collaborators, PipelineConfig, PipelineOrchestrator, RetryPolicy};
use reelforge::sources::mock::{
    sample_repository, sample_video, MockBuildRunner, MockRepositorySource,
    MockStrategyGenerator, MockVideoSource,
};
use reelforge::progress::{ProgressEvent, ProgressHandler};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const VIDEO_ID: &str = "abc123";
pub const REPO_URL: &str = "https://github.com/octo/app";

/// Mock collaborators kept as concrete types so tests can inspect calls
pub struct Harness {
    pub video: Arc<MockVideoSource>,
    pub repository: Arc<MockRepositorySource>,
    pub builder: Arc<MockBuildRunner>,
    pub strategist: Arc<MockStrategyGenerator>,
}

impl Harness {
    /// Every collaborator answers successfully for `VIDEO_ID` and `REPO_URL`
    pub fn happy() -> Self {
        Self::with_video_source(
            MockVideoSource::new().with_video(sample_video(VIDEO_ID, REPO_URL), None),
        )
    }

    /// Happy repository, build and strategy collaborators around a custom video source
    pub fn with_video_source(video: MockVideoSource) -> Self {
        Self {
            video: Arc::new(video),
            repository: Arc::new(
                MockRepositorySource::new()
                    .with_repository(sample_repository(REPO_URL))
                    .with_default_popularity(10_000),
            ),
            builder: Arc::new(MockBuildRunner::succeeding()),
            strategist: Arc::new(MockStrategyGenerator::default()),
        }
    }

    pub fn with_repository(mut self, repository: MockRepositorySource) -> Self {
        self.repository = Arc::new(repository);
        self
    }

    pub fn with_builder(mut self, builder: MockBuildRunner) -> Self {
        self.builder = Arc::new(builder);
        self
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            video: self.video.clone(),
            repository: self.repository.clone(),
            builder: self.builder.clone(),
            strategist: self.strategist.clone(),
        }
    }

    pub fn orchestrator(&self, config: PipelineConfig) -> PipelineOrchestrator {
        PipelineOrchestrator::new(self.collaborators(), config).unwrap()
    }
}

/// Default retry budget with millisecond backoff and no run timeout
pub fn fast_config() -> PipelineConfig {
    PipelineConfig::default()
        .with_run_timeout(None)
        .with_retry(
            RetryPolicy::default()
                .with_initial_backoff(Duration::from_millis(1))
                .with_max_backoff(Duration::from_millis(4)),
        )
}

/// Keeps every progress event in arrival order
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ProgressHandler for RecordingProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
