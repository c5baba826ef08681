use crate::pipeline::context::TaskInputs;
use crate::pipeline::payload::{AnalysisOrigin, TaskPayload, VideoAnalysis};
use crate::pipeline::request::Request;
use crate::pipeline::result::{TaskFailure, TaskResult};
use crate::sources::{detect, VideoSource};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct VideoAnalysisTask {
    source: Arc<dyn VideoSource>,
}

impl VideoAnalysisTask {
    pub fn new(source: Arc<dyn VideoSource>) -> Self {
        Self { source }
    }

    pub async fn execute(&self, inputs: &TaskInputs) -> TaskResult {
        match &inputs.request {
            Request::Video { video_id } => match self.analyze_video(video_id).await {
                Ok(analysis) => TaskResult::Success(TaskPayload::Video(analysis)),
                Err(failure) => TaskResult::Failure(failure),
            },
            Request::Repository { url } => {
                TaskResult::Success(TaskPayload::Video(VideoAnalysis::direct_repository(url)))
            }
            Request::Channel { .. } => TaskResult::Failure(TaskFailure::permanent(
                crate::pipeline::FailureKind::ConfigurationError,
                "channel requests are expanded into per-video runs before analysis",
            )),
        }
    }

    async fn analyze_video(&self, video_id: &str) -> Result<VideoAnalysis, TaskFailure> {
        let (details, transcript) = tokio::join!(
            self.source.video_details(video_id),
            self.source.transcript(video_id)
        );
        let metadata = details?;

        let mut warnings = Vec::new();
        let transcript = match transcript {
            Ok(t) => t,
            Err(e) => {
                warn!(video_id, error = %e, "Transcript unavailable, continuing with description only");
                warnings.push(format!("transcript unavailable: {}", e));
                None
            }
        };

        let mut text = metadata.description.clone();
        if let Some(t) = &transcript {
            text.push('\n');
            text.push_str(&t.text);
        }

        let repository_urls = detect::github_repository_urls(&text);
        let mut technologies = detect::technologies(&format!("{}\n{}", metadata.title, text));
        for tag in &metadata.tags {
            for tech in detect::technologies(tag) {
                if !technologies.contains(&tech) {
                    technologies.push(tech);
                }
            }
        }

        debug!(
            video_id,
            repositories = repository_urls.len(),
            technologies = technologies.len(),
            has_transcript = transcript.is_some(),
            "Video analyzed"
        );

        Ok(VideoAnalysis {
            origin: AnalysisOrigin::Video,
            metadata: Some(metadata),
            transcript,
            repository_urls,
            technologies,
            warnings,
        })
    }
}
