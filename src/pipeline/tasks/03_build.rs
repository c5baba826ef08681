use crate::pipeline::context::TaskInputs;
use crate::pipeline::payload::TaskPayload;
use crate::pipeline::result::{TaskFailure, TaskResult};
use crate::sources::BuildRunner;
use std::sync::Arc;
use tracing::info;

pub struct ApplicationBuildTask {
    runner: Arc<dyn BuildRunner>,
}

impl ApplicationBuildTask {
    pub fn new(runner: Arc<dyn BuildRunner>) -> Self {
        Self { runner }
    }

    pub async fn execute(&self, inputs: &TaskInputs) -> TaskResult {
        let repository = match inputs.require_repository() {
            Ok(analysis) => analysis,
            Err(failure) => return failure.into(),
        };
        let Some(primary) = repository.primary() else {
            return TaskFailure::missing_input("primary repository").into();
        };

        info!(repository = %primary.full_name(), "Building primary repository");
        match self.runner.build(primary).await {
            Ok(report) => TaskResult::Success(TaskPayload::Build(report)),
            Err(e) => TaskResult::Failure(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::payload::RepositoryAnalysis;
    use crate::pipeline::request::Request;
    use crate::pipeline::FailureKind;
    use crate::sources::mock::{sample_repository, MockBuildRunner};
    use crate::sources::SourceError;

    fn inputs() -> TaskInputs {
        TaskInputs::new(Request::video("abc123")).with_payload(TaskPayload::Repository(
            RepositoryAnalysis {
                repositories: vec![
                    sample_repository("https://github.com/octo/first"),
                    sample_repository("https://github.com/octo/second"),
                ],
                warnings: vec![],
            },
        ))
    }

    #[tokio::test]
    async fn test_builds_primary_repository() {
        let task = ApplicationBuildTask::new(Arc::new(MockBuildRunner::succeeding()));
        match task.execute(&inputs()).await {
            TaskResult::Success(TaskPayload::Build(report)) => {
                assert_eq!(report.repository, "octo/first");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_build_error_is_permanent() {
        let task = ApplicationBuildTask::new(Arc::new(MockBuildRunner::failing(
            SourceError::build("make: *** [all] Error 2"),
        )));
        let result = task.execute(&inputs()).await;
        let failure = result.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::BuildError);
        assert!(!failure.recoverable);
    }
}
