use crate::pipeline::context::TaskInputs;
use crate::pipeline::payload::{
    ContentPopularity, GrowthRating, RepositoryAnalysis, TaskPayload, TechnologyTrend,
    TrendReport, VideoAnalysis,
};
use crate::pipeline::result::{TaskFailure, TaskResult};
use crate::sources::{RepositorySource, SourceError};
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

const MAX_TECHNOLOGIES: usize = 8;

pub struct TrendAnalysisTask {
    source: Arc<dyn RepositorySource>,
}

impl TrendAnalysisTask {
    pub fn new(source: Arc<dyn RepositorySource>) -> Self {
        Self { source }
    }

    pub async fn execute(&self, inputs: &TaskInputs) -> TaskResult {
        match self.analyze(inputs).await {
            Ok(report) => TaskResult::Success(TaskPayload::Trend(report)),
            Err(failure) => TaskResult::Failure(failure),
        }
    }

    async fn analyze(&self, inputs: &TaskInputs) -> Result<TrendReport, TaskFailure> {
        let video = inputs.require_video()?;
        let repository = inputs.require_repository()?;

        let technologies = collect_technologies(video, repository);
        let lookups = join_all(
            technologies
                .iter()
                .map(|tech| self.source.technology_popularity(tech)),
        )
        .await;

        let mut trends = Vec::with_capacity(technologies.len());
        let mut warnings = Vec::new();
        let mut errors: Vec<SourceError> = Vec::new();

        for (tech, lookup) in technologies.into_iter().zip(lookups) {
            let score = match lookup {
                Ok(count) => Some(count),
                Err(e) => {
                    warn!(technology = %tech, error = %e, "Popularity lookup failed");
                    warnings.push(format!("{}: {}", tech, e));
                    errors.push(e);
                    None
                }
            };
            trends.push(TechnologyTrend {
                technology: tech,
                popularity_score: score,
                growth: GrowthRating::from_repository_count(score),
            });
        }

        // Nothing was learned and a retry might help
        if !trends.is_empty() && errors.len() == trends.len() && errors.iter().all(|e| e.recoverable) {
            if let Some(first) = errors.into_iter().next() {
                return Err(first.into());
            }
        }

        let content_popularity = video
            .metadata
            .as_ref()
            .map(|m| ContentPopularity::from_metrics(m.view_count, m.like_count, m.comment_count));

        let report = TrendReport::new(trends, content_popularity, warnings);
        debug!(
            technologies = report.technologies.len(),
            opportunities = report.market_opportunities.len(),
            top = ?report.top_technology,
            "Trend analysis complete"
        );
        Ok(report)
    }
}

/// Video technologies first, then repository languages by size, without
/// case-insensitive duplicates
fn collect_technologies(video: &VideoAnalysis, repository: &RepositoryAnalysis) -> Vec<String> {
    let mut technologies: Vec<String> = Vec::new();
    let candidates = video.technologies.iter().map(String::as_str).chain(
        repository
            .repositories
            .iter()
            .flat_map(|r| r.ranked_languages()),
    );

    for candidate in candidates {
        if technologies.len() >= MAX_TECHNOLOGIES {
            break;
        }
        if !technologies
            .iter()
            .any(|t| t.eq_ignore_ascii_case(candidate))
        {
            technologies.push(candidate.to_string());
        }
    }
    technologies
}
