//! Channel mode: one independent pipeline run per listed video

use super::orchestrator::PipelineOrchestrator;
use super::report::{CombinedReport, OverallStatus};
use super::request::Request;
use super::result::TaskFailure;
use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelReport {
    pub channel_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_title: Option<String>,
    pub video_ids: Vec<String>,
    /// One report per video, in listing order
    pub runs: Vec<CombinedReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing_failure: Option<TaskFailure>,
    pub status: OverallStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ChannelReport {
    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }
}

/// Listing failed or every run failed: failed. Every run complete: complete.
fn aggregate_status(runs: &[CombinedReport], listing_failed: bool) -> OverallStatus {
    if listing_failed || runs.iter().all(|r| r.status == OverallStatus::Failed) {
        OverallStatus::Failed
    } else if runs.iter().all(|r| r.status == OverallStatus::Complete) {
        OverallStatus::Complete
    } else {
        OverallStatus::Partial
    }
}

impl PipelineOrchestrator {
    pub async fn run_channel(&self, channel_id: &str, max_videos: usize) -> ChannelReport {
        self.run_channel_with_cancel(channel_id, max_videos, CancellationToken::new())
            .await
    }

    /// Lists the channel's recent uploads and runs the pipeline for each one
    /// with bounded concurrency. Runs share nothing but the collaborators.
    pub async fn run_channel_with_cancel(
        &self,
        channel_id: &str,
        max_videos: usize,
        cancel: CancellationToken,
    ) -> ChannelReport {
        let started_at = Utc::now();
        let source = self.collaborators().video.clone();

        let channel_title = match source.channel_info(channel_id).await {
            Ok(info) => Some(info.title),
            Err(e) => {
                warn!(channel_id, error = %e, "Channel details unavailable");
                None
            }
        };

        let video_ids = match self.list_videos(channel_id, max_videos, &cancel).await {
            Ok(ids) => ids,
            Err(failure) => {
                warn!(channel_id, error = %failure, "Channel listing failed");
                return ChannelReport {
                    channel_id: channel_id.to_string(),
                    channel_title,
                    video_ids: Vec::new(),
                    runs: Vec::new(),
                    listing_failure: Some(failure),
                    status: OverallStatus::Failed,
                    started_at,
                    finished_at: Utc::now(),
                };
            }
        };

        let concurrency = self.config().channel_concurrency.max(1);
        info!(
            channel_id,
            videos = video_ids.len(),
            concurrency,
            "Running pipeline for channel videos"
        );

        let runs: Vec<CombinedReport> = stream::iter(video_ids.iter().cloned())
            .map(|video_id| self.run_with_cancel(Request::video(video_id), cancel.child_token()))
            .buffered(concurrency)
            .collect()
            .await;

        let status = aggregate_status(&runs, false);
        info!(channel_id, status = %status, "Channel run finished");

        ChannelReport {
            channel_id: channel_id.to_string(),
            channel_title,
            video_ids,
            runs,
            listing_failure: None,
            status,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Channel listing with the same retry policy as a task
    async fn list_videos(
        &self,
        channel_id: &str,
        max_videos: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, TaskFailure> {
        let policy = self.config().retry;
        let source = self.collaborators().video.clone();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TaskFailure::cancelled()),
                result = source.channel_videos(channel_id, max_videos) => result,
            };
            let failure: TaskFailure = match result {
                Ok(ids) => return Ok(ids),
                Err(e) => e.into(),
            };
            if !failure.recoverable || !policy.should_retry(attempt) {
                return Err(failure);
            }

            let backoff = policy.backoff_for(attempt);
            warn!(
                channel_id,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %failure,
                "Channel listing failed, retrying"
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TaskFailure::cancelled()),
                _ = tokio::time::sleep(backoff) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn run(status: OverallStatus) -> CombinedReport {
        let now = Utc::now();
        CombinedReport {
            run_id: Uuid::new_v4(),
            request: Request::video("v"),
            started_at: now,
            finished_at: now,
            status,
            cancelled: false,
            tasks: vec![],
        }
    }

    #[test]
    fn test_aggregate_status() {
        use crate::pipeline::report::OverallStatus::*;
        assert_eq!(aggregate_status(&[run(Complete), run(Complete)], false), Complete);
        assert_eq!(aggregate_status(&[run(Complete), run(Failed)], false), Partial);
        assert_eq!(aggregate_status(&[run(Failed), run(Failed)], false), Failed);
        assert_eq!(aggregate_status(&[run(Complete)], true), Failed);
    }
}
