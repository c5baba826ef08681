//! Scripted in-memory collaborators
//!
//! Each response queue is keyed (video id, repository URL, technology). The
//! last queued response repeats once the queue is drained, so a single
//! scripted value behaves like a fixed answer. Unscripted keys answer
//! `NotFound`.

use super::error::SourceError;
use super::{BuildRunner, ChannelInfo, RepositorySource, StrategyGenerator, VideoSource};
use crate::pipeline::{
    BuildReport, BuildStep, BuildSystem, Priority, RepositoryInfo, RuntimeInfo, Strategy,
    StrategyCategory, StrategyInput, Transcript, VideoMetadata,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

struct Script<T> {
    queues: HashMap<String, VecDeque<Result<T, SourceError>>>,
    calls: HashMap<String, usize>,
}

impl<T: Clone> Script<T> {
    fn new() -> Self {
        Self {
            queues: HashMap::new(),
            calls: HashMap::new(),
        }
    }

    fn push(&mut self, key: &str, response: Result<T, SourceError>) {
        self.queues
            .entry(key.to_string())
            .or_default()
            .push_back(response);
    }

    fn next(&mut self, key: &str) -> Option<Result<T, SourceError>> {
        *self.calls.entry(key.to_string()).or_default() += 1;
        let queue = self.queues.get_mut(key)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    fn calls(&self, key: &str) -> usize {
        self.calls.get(key).copied().unwrap_or(0)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|p| p.into_inner())
}

async fn pause(delay: Option<Duration>) {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

pub struct MockVideoSource {
    details: Mutex<Script<VideoMetadata>>,
    transcripts: Mutex<Script<Option<Transcript>>>,
    channels: Mutex<Script<Vec<String>>>,
    channel_infos: Mutex<Script<ChannelInfo>>,
    delay: Option<Duration>,
}

impl MockVideoSource {
    pub fn new() -> Self {
        Self {
            details: Mutex::new(Script::new()),
            transcripts: Mutex::new(Script::new()),
            channels: Mutex::new(Script::new()),
            channel_infos: Mutex::new(Script::new()),
            delay: None,
        }
    }

    /// Every call sleeps this long before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Scripts a video with its metadata and transcript
    pub fn with_video(self, metadata: VideoMetadata, transcript: Option<Transcript>) -> Self {
        let id = metadata.video_id.clone();
        lock(&self.details).push(&id, Ok(metadata));
        lock(&self.transcripts).push(&id, Ok(transcript));
        self
    }

    pub fn push_details(&self, video_id: &str, response: Result<VideoMetadata, SourceError>) {
        lock(&self.details).push(video_id, response);
    }

    pub fn push_transcript(&self, video_id: &str, response: Result<Option<Transcript>, SourceError>) {
        lock(&self.transcripts).push(video_id, response);
    }

    pub fn with_channel(self, info: ChannelInfo, video_ids: Vec<String>) -> Self {
        let id = info.channel_id.clone();
        lock(&self.channels).push(&id, Ok(video_ids));
        lock(&self.channel_infos).push(&id, Ok(info));
        self
    }

    pub fn push_channel_videos(&self, channel_id: &str, response: Result<Vec<String>, SourceError>) {
        lock(&self.channels).push(channel_id, response);
    }

    pub fn detail_calls(&self, video_id: &str) -> usize {
        lock(&self.details).calls(video_id)
    }

    pub fn channel_calls(&self, channel_id: &str) -> usize {
        lock(&self.channels).calls(channel_id)
    }
}

impl Default for MockVideoSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VideoSource for MockVideoSource {
    async fn video_details(&self, video_id: &str) -> Result<VideoMetadata, SourceError> {
        pause(self.delay).await;
        let next = lock(&self.details).next(video_id);
        next.unwrap_or_else(|| Err(SourceError::not_found(format!("video not found: {}", video_id))))
    }

    async fn transcript(&self, video_id: &str) -> Result<Option<Transcript>, SourceError> {
        let next = lock(&self.transcripts).next(video_id);
        next.unwrap_or(Ok(None))
    }

    async fn channel_videos(&self, channel_id: &str, limit: usize) -> Result<Vec<String>, SourceError> {
        let next = lock(&self.channels).next(channel_id);
        next.unwrap_or_else(|| {
            Err(SourceError::not_found(format!("channel not found: {}", channel_id)))
        })
        .map(|mut ids| {
            ids.truncate(limit);
            ids
        })
    }

    async fn channel_info(&self, channel_id: &str) -> Result<ChannelInfo, SourceError> {
        let next = lock(&self.channel_infos).next(channel_id);
        next.unwrap_or_else(|| {
            Err(SourceError::not_found(format!("channel not found: {}", channel_id)))
        })
    }
}

pub struct MockRepositorySource {
    repositories: Mutex<Script<RepositoryInfo>>,
    popularity: Mutex<Script<u64>>,
    default_popularity: Option<u64>,
    delay: Option<Duration>,
}

impl MockRepositorySource {
    pub fn new() -> Self {
        Self {
            repositories: Mutex::new(Script::new()),
            popularity: Mutex::new(Script::new()),
            default_popularity: None,
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_repository(self, info: RepositoryInfo) -> Self {
        let url = info.url.clone();
        lock(&self.repositories).push(&url, Ok(info));
        self
    }

    pub fn push_analysis(&self, url: &str, response: Result<RepositoryInfo, SourceError>) {
        lock(&self.repositories).push(url, response);
    }

    pub fn with_popularity(self, technology: &str, count: u64) -> Self {
        lock(&self.popularity).push(technology, Ok(count));
        self
    }

    pub fn push_popularity(&self, technology: &str, response: Result<u64, SourceError>) {
        lock(&self.popularity).push(technology, response);
    }

    /// Count returned for technologies without a script
    pub fn with_default_popularity(mut self, count: u64) -> Self {
        self.default_popularity = Some(count);
        self
    }

    pub fn analyze_calls(&self, url: &str) -> usize {
        lock(&self.repositories).calls(url)
    }
}

impl Default for MockRepositorySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RepositorySource for MockRepositorySource {
    async fn analyze(&self, url: &str) -> Result<RepositoryInfo, SourceError> {
        pause(self.delay).await;
        let next = lock(&self.repositories).next(url);
        next.unwrap_or_else(|| Err(SourceError::not_found(format!("repository not found: {}", url))))
    }

    async fn technology_popularity(&self, technology: &str) -> Result<u64, SourceError> {
        let next = lock(&self.popularity).next(technology);
        match (next, self.default_popularity) {
            (Some(result), _) => result,
            (None, Some(count)) => Ok(count),
            (None, None) => Err(SourceError::not_found(format!(
                "no popularity data for {}",
                technology
            ))),
        }
    }
}

const BUILD_KEY: &str = "build";

pub struct MockBuildRunner {
    script: Mutex<Script<BuildReport>>,
    delay: Option<Duration>,
}

impl MockBuildRunner {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script::new()),
            delay: None,
        }
    }

    /// Runner that succeeds with a one-step report for any repository
    pub fn succeeding() -> Self {
        let runner = Self::new();
        runner.push(Ok(sample_build_report("https://github.com/octo/app")));
        runner
    }

    pub fn failing(error: SourceError) -> Self {
        let runner = Self::new();
        runner.push(Err(error));
        runner
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push(&self, response: Result<BuildReport, SourceError>) {
        lock(&self.script).push(BUILD_KEY, response);
    }

    pub fn calls(&self) -> usize {
        lock(&self.script).calls(BUILD_KEY)
    }
}

impl Default for MockBuildRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BuildRunner for MockBuildRunner {
    async fn build(&self, repository: &RepositoryInfo) -> Result<BuildReport, SourceError> {
        pause(self.delay).await;
        let next = lock(&self.script).next(BUILD_KEY);
        match next {
            Some(Ok(mut report)) => {
                report.repository = repository.full_name();
                report.url = repository.url.clone();
                Ok(report)
            }
            Some(Err(e)) => Err(e),
            None => Err(SourceError::build("no build scripted")),
        }
    }
}

const STRATEGY_KEY: &str = "strategies";

pub struct MockStrategyGenerator {
    script: Mutex<Script<Vec<Strategy>>>,
    last_input: Mutex<Option<StrategyInput>>,
}

impl MockStrategyGenerator {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script::new()),
            last_input: Mutex::new(None),
        }
    }

    pub fn with_strategies(strategies: Vec<Strategy>) -> Self {
        let generator = Self::new();
        generator.push(Ok(strategies));
        generator
    }

    pub fn push(&self, response: Result<Vec<Strategy>, SourceError>) {
        lock(&self.script).push(STRATEGY_KEY, response);
    }

    pub fn calls(&self) -> usize {
        lock(&self.script).calls(STRATEGY_KEY)
    }

    pub fn last_input(&self) -> Option<StrategyInput> {
        lock(&self.last_input).clone()
    }
}

impl Default for MockStrategyGenerator {
    fn default() -> Self {
        Self::with_strategies(sample_strategies())
    }
}

#[async_trait]
impl StrategyGenerator for MockStrategyGenerator {
    async fn generate(&self, input: &StrategyInput) -> Result<Vec<Strategy>, SourceError> {
        *lock(&self.last_input) = Some(input.clone());
        let next = lock(&self.script).next(STRATEGY_KEY);
        next.unwrap_or_else(|| Err(SourceError::transient("no strategies scripted")))
    }
}

pub fn sample_video(video_id: &str, repository_url: &str) -> VideoMetadata {
    VideoMetadata {
        video_id: video_id.to_string(),
        title: "Building a web service in Rust".to_string(),
        channel_id: "UCrustacean".to_string(),
        channel_title: "Rustacean Station".to_string(),
        description: format!(
            "We build a Rust service with PostgreSQL and Docker.\nSource: {}",
            repository_url
        ),
        published_at: None,
        view_count: 10_000,
        like_count: 450,
        comment_count: 100,
        tags: vec!["rust".to_string(), "backend".to_string()],
    }
}

pub fn sample_repository(url: &str) -> RepositoryInfo {
    let (owner, name) = super::detect::parse_repository_url(url)
        .unwrap_or_else(|| ("octo".to_string(), "app".to_string()));
    let mut languages = BTreeMap::new();
    languages.insert("Rust".to_string(), 120_000);
    languages.insert("Shell".to_string(), 2_000);

    RepositoryInfo {
        owner,
        name,
        url: url.to_string(),
        description: Some("Example service".to_string()),
        default_branch: "main".to_string(),
        stars: 1_200,
        forks: 80,
        license: Some("MIT".to_string()),
        languages,
        key_files: vec!["Cargo.toml".to_string(), "README.md".to_string()],
        build_instructions: crate::pipeline::BuildInstructions::from_key_files(&["Cargo.toml"]),
    }
}

pub fn sample_build_report(url: &str) -> BuildReport {
    BuildReport {
        repository: "octo/app".to_string(),
        url: url.to_string(),
        build_system: Some(BuildSystem::Cargo),
        steps: vec![BuildStep {
            command: "cargo build --release".to_string(),
            exit_code: Some(0),
            log_tail: "Finished release profile".to_string(),
            duration_ms: 1_000,
        }],
        runtime: RuntimeInfo::detect(&["Cargo.toml"], None, None),
        workspace: None,
        duration_ms: 1_200,
        notes: Vec::new(),
    }
}

pub fn sample_strategies() -> Vec<Strategy> {
    vec![
        Strategy {
            category: StrategyCategory::AffiliateMarketing,
            title: "Hosting referrals".to_string(),
            description: "Recommend the hosting used in the video".to_string(),
            steps: vec!["Join an affiliate program".to_string()],
            estimated_revenue: Some("$100-$500".to_string()),
            priority: Priority::Low,
        },
        Strategy {
            category: StrategyCategory::EducationalProducts,
            title: "Video course".to_string(),
            description: "Turn the walkthrough into a paid course".to_string(),
            steps: vec!["Outline modules".to_string(), "Record lessons".to_string()],
            estimated_revenue: Some("$2,000-$10,000".to_string()),
            priority: Priority::High,
        },
        Strategy {
            category: StrategyCategory::ConsultingServices,
            title: "Adoption consulting".to_string(),
            description: "Help teams adopt the project".to_string(),
            steps: vec!["Publish a case study".to_string()],
            estimated_revenue: Some("$2,000-$20,000".to_string()),
            priority: Priority::Medium,
        },
    ]
}
