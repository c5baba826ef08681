use crate::pipeline::context::TaskInputs;
use crate::pipeline::payload::{RepositoryAnalysis, TaskPayload};
use crate::pipeline::result::{FailureKind, TaskFailure, TaskResult};
use crate::sources::RepositorySource;
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

pub struct RepositoryAnalysisTask {
    source: Arc<dyn RepositorySource>,
    max_repositories: usize,
}

impl RepositoryAnalysisTask {
    pub fn new(source: Arc<dyn RepositorySource>, max_repositories: usize) -> Self {
        Self {
            source,
            max_repositories: max_repositories.max(1),
        }
    }

    pub async fn execute(&self, inputs: &TaskInputs) -> TaskResult {
        match self.analyze(inputs).await {
            Ok(analysis) => TaskResult::Success(TaskPayload::Repository(analysis)),
            Err(failure) => TaskResult::Failure(failure),
        }
    }

    async fn analyze(&self, inputs: &TaskInputs) -> Result<RepositoryAnalysis, TaskFailure> {
        let video = inputs.require_video()?;
        if video.repository_urls.is_empty() {
            return Err(TaskFailure::permanent(
                FailureKind::NotFound,
                "no GitHub repository referenced by the video",
            ));
        }

        let urls: Vec<&String> = video
            .repository_urls
            .iter()
            .take(self.max_repositories)
            .collect();
        if video.repository_urls.len() > urls.len() {
            info!(
                found = video.repository_urls.len(),
                analyzing = urls.len(),
                "Limiting repository analysis"
            );
        }

        let results = join_all(urls.iter().map(|url| self.source.analyze(url))).await;

        let mut repositories = Vec::new();
        let mut warnings = Vec::new();
        let mut first_failure: Option<TaskFailure> = None;

        for (url, result) in urls.iter().zip(results) {
            match result {
                Ok(info) => repositories.push(info),
                Err(e) => {
                    warn!(url = %url, error = %e, "Repository analysis failed");
                    warnings.push(format!("{}: {}", url, e));
                    first_failure.get_or_insert_with(|| e.into());
                }
            }
        }

        if repositories.is_empty() {
            return Err(first_failure.unwrap_or_else(|| {
                TaskFailure::permanent(FailureKind::NotFound, "no repository could be analyzed")
            }));
        }

        Ok(RepositoryAnalysis {
            repositories,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::payload::VideoAnalysis;
    use crate::pipeline::request::Request;
    use crate::sources::mock::{sample_repository, MockRepositorySource};
    use crate::sources::SourceError;

    fn inputs_with_urls(urls: &[&str]) -> TaskInputs {
        let mut video = VideoAnalysis::direct_repository(urls.first().copied().unwrap_or(""));
        video.repository_urls = urls.iter().map(|u| u.to_string()).collect();
        TaskInputs::new(Request::video("abc123")).with_payload(TaskPayload::Video(video))
    }

    #[tokio::test]
    async fn test_no_urls_is_permanent_not_found() {
        let task = RepositoryAnalysisTask::new(Arc::new(MockRepositorySource::new()), 3);
        let result = task.execute(&inputs_with_urls(&[])).await;
        let failure = result.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::NotFound);
        assert!(!failure.recoverable);
    }

    #[tokio::test]
    async fn test_partial_failures_become_warnings() {
        let good = "https://github.com/octo/app";
        let bad = "https://github.com/octo/private";
        let source = MockRepositorySource::new().with_repository(sample_repository(good));
        source.push_analysis(bad, Err(SourceError::access_denied("private")));
        let task = RepositoryAnalysisTask::new(Arc::new(source), 3);

        let result = task.execute(&inputs_with_urls(&[bad, good])).await;
        match result {
            TaskResult::Success(TaskPayload::Repository(analysis)) => {
                assert_eq!(analysis.repositories.len(), 1);
                assert_eq!(analysis.primary().unwrap().url, good);
                assert_eq!(analysis.warnings.len(), 1);
                assert!(analysis.warnings[0].contains("access_denied"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_all_failures_return_first_classification() {
        let a = "https://github.com/octo/a";
        let b = "https://github.com/octo/b";
        let source = MockRepositorySource::new();
        source.push_analysis(a, Err(SourceError::rate_limited("slow down")));
        source.push_analysis(b, Err(SourceError::not_found("gone")));
        let task = RepositoryAnalysisTask::new(Arc::new(source), 3);

        let result = task.execute(&inputs_with_urls(&[a, b])).await;
        let failure = result.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::RateLimited);
        assert!(failure.recoverable);
    }

    #[tokio::test]
    async fn test_repository_cap() {
        let urls = [
            "https://github.com/octo/a",
            "https://github.com/octo/b",
            "https://github.com/octo/c",
        ];
        let source = Arc::new(
            MockRepositorySource::new()
                .with_repository(sample_repository(urls[0]))
                .with_repository(sample_repository(urls[1]))
                .with_repository(sample_repository(urls[2])),
        );
        let task = RepositoryAnalysisTask::new(source.clone(), 2);

        let result = task.execute(&inputs_with_urls(&urls)).await;
        assert!(result.is_success());
        assert_eq!(source.analyze_calls(urls[2]), 0);
    }

    #[tokio::test]
    async fn test_missing_video_input_is_configuration_error() {
        let task = RepositoryAnalysisTask::new(Arc::new(MockRepositorySource::new()), 3);
        let result = task.execute(&TaskInputs::new(Request::video("abc123"))).await;
        assert_eq!(
            result.failure().map(|f| f.kind),
            Some(FailureKind::ConfigurationError)
        );
    }
}
