use super::config::PipelineConfig;
use super::context::{SharedContext, TaskInputs};
use super::graph::{DependencyGraph, EdgeKind, GraphError};
use super::report::{CombinedReport, OverallStatus, TaskEntry};
use super::request::Request;
use super::result::{FailureKind, TaskFailure, TaskResult};
use super::task::{TaskName, TaskState};
use super::tasks::{Collaborators, TaskSet, TaskUnit};
use crate::progress::{NoOpHandler, ProgressEvent, ProgressHandler};
use chrono::Utc;
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Per-task bookkeeping owned by a single run
#[derive(Debug, Clone)]
struct TaskRecord {
    state: TaskState,
    attempts: u32,
    skip_reason: Option<String>,
}

impl TaskRecord {
    fn pending() -> Self {
        Self {
            state: TaskState::Pending,
            attempts: 0,
            skip_reason: None,
        }
    }

    fn advance(&mut self, task: TaskName, next: TaskState) {
        match self.state.transition(next) {
            Ok(state) => self.state = state,
            Err(e) => error!(task = %task, error = %e, "Rejected task state change"),
        }
    }
}

struct Outcome {
    result: TaskResult,
    attempts: u32,
}

pub struct PipelineOrchestrator {
    graph: DependencyGraph,
    tasks: TaskSet,
    collaborators: Collaborators,
    config: PipelineConfig,
    progress: Arc<dyn ProgressHandler>,
}

impl PipelineOrchestrator {
    /// Builds an orchestrator over the standard dependency table
    pub fn new(collaborators: Collaborators, config: PipelineConfig) -> Result<Self, GraphError> {
        let tasks = TaskSet::new(&collaborators, &config);
        Ok(Self {
            graph: DependencyGraph::standard()?,
            tasks,
            collaborators,
            config,
            progress: Arc::new(NoOpHandler),
        })
    }

    pub fn with_progress(mut self, handler: Arc<dyn ProgressHandler>) -> Self {
        self.progress = handler;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub async fn run(&self, request: Request) -> CombinedReport {
        self.run_with_cancel(request, CancellationToken::new()).await
    }

    /// Runs every task to a terminal state. Task failures never surface as
    /// errors; they are recorded in the report.
    pub async fn run_with_cancel(
        &self,
        request: Request,
        cancel: CancellationToken,
    ) -> CombinedReport {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();

        self.emit(ProgressEvent::RunStarted {
            run_id,
            request: request.to_string(),
        });

        let token = cancel.child_token();
        let watchdog = self.config.run_timeout.map(|timeout| {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                warn!(timeout_secs = timeout.as_secs(), "Run timeout reached, cancelling");
                token.cancel();
            })
        });

        let context = SharedContext::new();
        let mut records: HashMap<TaskName, TaskRecord> = TaskName::ALL
            .into_iter()
            .map(|task| (task, TaskRecord::pending()))
            .collect();
        let mut cancelled = false;

        for (index, layer) in self.graph.layers().iter().enumerate() {
            let mut ready: Vec<(&TaskUnit, TaskInputs)> = Vec::new();

            for &task in layer {
                let skip_reason = if token.is_cancelled() {
                    cancelled = true;
                    Some("run cancelled before the task started".to_string())
                } else if !self.dependencies_resolved(task, &context, &records) {
                    error!(task = %task, "Task scheduled before its dependencies resolved");
                    Some("dependencies unresolved when scheduled".to_string())
                } else {
                    self.blocking_dependency(task, &context)
                        .map(|dep| format!("mandatory dependency {} did not succeed", dep))
                };

                match skip_reason {
                    Some(reason) => self.skip(task, reason, &mut records),
                    None => ready.push((
                        self.tasks.get(task),
                        self.inputs_for(task, &request, &context),
                    )),
                }
            }

            if ready.is_empty() {
                continue;
            }

            let names: Vec<TaskName> = ready.iter().map(|(unit, _)| unit.name()).collect();
            self.emit(ProgressEvent::LayerStarted {
                index,
                tasks: names.clone(),
            });
            for task in &names {
                if let Some(record) = records.get_mut(task) {
                    record.advance(*task, TaskState::Running);
                }
            }

            let outcomes = join_all(
                ready
                    .iter()
                    .map(|(unit, inputs)| self.run_task(unit, inputs, &context, &token)),
            )
            .await;

            for (task, outcome) in names.into_iter().zip(outcomes) {
                let next = if outcome.result.is_success() {
                    TaskState::Succeeded
                } else {
                    TaskState::Failed
                };
                if let Some(TaskFailure {
                    kind: FailureKind::Cancelled,
                    ..
                }) = outcome.result.failure()
                {
                    cancelled = true;
                }
                if let Some(record) = records.get_mut(&task) {
                    record.attempts = outcome.attempts;
                    record.advance(task, next);
                }
            }
        }

        if let Some(handle) = watchdog {
            handle.abort();
        }

        if cancelled {
            self.emit(ProgressEvent::RunCancelled { run_id });
        }

        let report = self.assemble(run_id, request, started_at, cancelled, records, &context);
        self.emit(ProgressEvent::RunCompleted {
            run_id,
            status: report.status,
            total_time: start.elapsed(),
        });
        report
    }

    /// True once every dependency reached a terminal state. Skipped tasks
    /// never write to the context, so they are excluded from the check.
    fn dependencies_resolved(
        &self,
        task: TaskName,
        context: &SharedContext,
        records: &HashMap<TaskName, TaskRecord>,
    ) -> bool {
        let written: Vec<TaskName> = self
            .graph
            .required_inputs(task)
            .iter()
            .map(|dep| dep.task)
            .filter(|dep| records.get(dep).map(|r| r.state) != Some(TaskState::Skipped))
            .collect();
        context.all_satisfied(&written)
    }

    /// First mandatory dependency without a successful result
    fn blocking_dependency(&self, task: TaskName, context: &SharedContext) -> Option<TaskName> {
        self.graph
            .required_inputs(task)
            .iter()
            .filter(|dep| dep.kind == EdgeKind::Mandatory)
            .find(|dep| !matches!(context.get(dep.task), Some(TaskResult::Success(_))))
            .map(|dep| dep.task)
    }

    fn inputs_for(&self, task: TaskName, request: &Request, context: &SharedContext) -> TaskInputs {
        let mut inputs = TaskInputs::new(request.clone());
        for dep in self.graph.required_inputs(task) {
            match context.get(dep.task) {
                Some(TaskResult::Success(payload)) => inputs.insert(payload),
                _ => debug!(
                    task = %task,
                    dependency = %dep.task,
                    "Optional input unavailable, continuing without it"
                ),
            }
        }
        inputs
    }

    fn skip(&self, task: TaskName, reason: String, records: &mut HashMap<TaskName, TaskRecord>) {
        self.emit(ProgressEvent::TaskSkipped {
            task,
            reason: reason.clone(),
        });
        if let Some(record) = records.get_mut(&task) {
            record.advance(task, TaskState::Skipped);
            record.skip_reason = Some(reason);
        }
    }

    async fn run_task(
        &self,
        unit: &TaskUnit,
        inputs: &TaskInputs,
        context: &SharedContext,
        token: &CancellationToken,
    ) -> Outcome {
        let task = unit.name();
        let policy = self.config.retry;
        let start = Instant::now();
        let mut attempt = 0;

        let result = loop {
            attempt += 1;
            self.emit(ProgressEvent::TaskStarted { task, attempt });

            let result = tokio::select! {
                biased;
                _ = token.cancelled() => TaskResult::Failure(TaskFailure::cancelled()),
                result = unit.execute(inputs) => result,
            };

            let failure = match result {
                TaskResult::Failure(failure) if failure.recoverable && policy.should_retry(attempt) => {
                    failure
                }
                other => break other,
            };

            let backoff = policy.backoff_for(attempt);
            self.emit(ProgressEvent::TaskRetrying {
                task,
                attempt,
                backoff,
                kind: failure.kind,
            });

            let interrupted = tokio::select! {
                biased;
                _ = token.cancelled() => true,
                _ = tokio::time::sleep(backoff) => false,
            };
            if interrupted {
                break TaskResult::Failure(TaskFailure::cancelled());
            }
        };

        match &result {
            TaskResult::Success(_) => self.emit(ProgressEvent::TaskSucceeded {
                task,
                attempts: attempt,
                duration: start.elapsed(),
            }),
            TaskResult::Failure(failure) => self.emit(ProgressEvent::TaskFailed {
                task,
                attempts: attempt,
                kind: failure.kind,
                message: failure.message.clone(),
            }),
        }

        if let Err(e) = context.put(task, result.clone()) {
            error!(task = %task, error = %e, "Result already recorded");
        }

        Outcome {
            result,
            attempts: attempt,
        }
    }

    fn assemble(
        &self,
        run_id: Uuid,
        request: Request,
        started_at: chrono::DateTime<Utc>,
        cancelled: bool,
        mut records: HashMap<TaskName, TaskRecord>,
        context: &SharedContext,
    ) -> CombinedReport {
        let mut order = self.graph.execution_order();
        let unscheduled: Vec<TaskName> = TaskName::ALL
            .into_iter()
            .filter(|task| !order.contains(task))
            .collect();
        order.extend(unscheduled);

        let mut tasks = Vec::with_capacity(order.len());
        for task in order {
            let record = records.remove(&task).unwrap_or_else(TaskRecord::pending);
            let entry = match context.get(task) {
                Some(result) => TaskEntry::from_result(task, record.attempts, result),
                None => TaskEntry::skipped(
                    task,
                    record
                        .skip_reason
                        .unwrap_or_else(|| "task never started".to_string()),
                ),
            };
            tasks.push(entry);
        }

        let states: Vec<(TaskName, TaskState)> = tasks.iter().map(|e| (e.task, e.state)).collect();
        let status = OverallStatus::from_states(&request, &states);

        CombinedReport {
            run_id,
            request,
            started_at,
            finished_at: Utc::now(),
            status,
            cancelled,
            tasks,
        }
    }

    fn emit(&self, event: ProgressEvent) {
        self.progress.on_progress(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::retry::RetryPolicy;
    use crate::sources::mock::{
        sample_repository, sample_video, MockBuildRunner, MockRepositorySource,
        MockStrategyGenerator, MockVideoSource,
    };
    use crate::sources::SourceError;
    use std::sync::Mutex;
    use std::time::Duration;

    const URL: &str = "https://github.com/octo/app";

    #[derive(Default)]
    struct RecordingHandler {
        events: Mutex<Vec<String>>,
    }

    impl ProgressHandler for RecordingHandler {
        fn on_progress(&self, event: &ProgressEvent) {
            let name = format!("{:?}", event);
            let name = name.split([' ', '{']).next().unwrap_or_default().to_string();
            self.events.lock().unwrap().push(name);
        }
    }

    fn collaborators() -> Collaborators {
        Collaborators {
            video: Arc::new(
                MockVideoSource::new().with_video(sample_video("abc123", URL), None),
            ),
            repository: Arc::new(
                MockRepositorySource::new()
                    .with_repository(sample_repository(URL))
                    .with_default_popularity(10_000),
            ),
            builder: Arc::new(MockBuildRunner::succeeding()),
            strategist: Arc::new(MockStrategyGenerator::default()),
        }
    }

    fn fast_config() -> PipelineConfig {
        PipelineConfig::default().with_retry(
            RetryPolicy::default()
                .with_initial_backoff(Duration::from_millis(1))
                .with_max_backoff(Duration::from_millis(2)),
        )
    }

    #[tokio::test]
    async fn test_happy_path_is_complete() {
        let orchestrator = PipelineOrchestrator::new(collaborators(), fast_config()).unwrap();
        let report = orchestrator.run(Request::video("abc123")).await;

        assert_eq!(report.status, OverallStatus::Complete);
        assert!(!report.cancelled);
        let order: Vec<_> = report.tasks.iter().map(|e| e.task).collect();
        assert_eq!(order, TaskName::ALL.to_vec());
        assert!(report.tasks.iter().all(|e| e.attempts == 1));
    }

    #[tokio::test]
    async fn test_progress_events_in_order() {
        let handler = Arc::new(RecordingHandler::default());
        let orchestrator = PipelineOrchestrator::new(collaborators(), fast_config())
            .unwrap()
            .with_progress(handler.clone());
        orchestrator.run(Request::video("abc123")).await;

        let events = handler.events.lock().unwrap().clone();
        assert_eq!(events.first().map(String::as_str), Some("RunStarted"));
        assert_eq!(events.last().map(String::as_str), Some("RunCompleted"));
        assert_eq!(events.iter().filter(|e| *e == "LayerStarted").count(), 4);
        assert_eq!(events.iter().filter(|e| *e == "TaskSucceeded").count(), 5);
    }

    #[tokio::test]
    async fn test_optional_edge_degrades() {
        let mut collaborators = collaborators();
        collaborators.builder = Arc::new(MockBuildRunner::failing(SourceError::build("exit 2")));
        let orchestrator = PipelineOrchestrator::new(collaborators, fast_config()).unwrap();

        let report = orchestrator.run(Request::video("abc123")).await;
        assert_eq!(report.state(TaskName::ApplicationBuild), Some(TaskState::Failed));
        assert_eq!(report.state(TaskName::Monetization), Some(TaskState::Succeeded));
        assert_eq!(report.status, OverallStatus::Partial);
    }

    #[test]
    fn test_dependencies_resolved_only_after_terminal_states() {
        let orchestrator = PipelineOrchestrator::new(collaborators(), fast_config()).unwrap();
        let context = SharedContext::new();
        let mut records: HashMap<TaskName, TaskRecord> = TaskName::ALL
            .into_iter()
            .map(|task| (task, TaskRecord::pending()))
            .collect();

        assert!(orchestrator.dependencies_resolved(TaskName::VideoAnalysis, &context, &records));
        assert!(!orchestrator.dependencies_resolved(TaskName::Monetization, &context, &records));

        let failed: TaskResult = TaskFailure::permanent(FailureKind::NotFound, "gone").into();
        for task in [
            TaskName::VideoAnalysis,
            TaskName::RepositoryAnalysis,
            TaskName::TrendAnalysis,
        ] {
            context.put(task, failed.clone()).unwrap();
        }
        // build is still pending
        assert!(!orchestrator.dependencies_resolved(TaskName::Monetization, &context, &records));

        if let Some(record) = records.get_mut(&TaskName::ApplicationBuild) {
            record.advance(TaskName::ApplicationBuild, TaskState::Skipped);
        }
        assert!(orchestrator.dependencies_resolved(TaskName::Monetization, &context, &records));
    }

    #[tokio::test]
    async fn test_retry_and_failure_reported_through_progress() {
        let mut collaborators = collaborators();
        let video = MockVideoSource::new();
        video.push_details("abc123", Err(SourceError::transient("reset")));
        video.push_details("abc123", Err(SourceError::not_found("removed")));
        collaborators.video = Arc::new(video);

        let handler = Arc::new(RecordingHandler::default());
        let orchestrator = PipelineOrchestrator::new(collaborators, fast_config())
            .unwrap()
            .with_progress(handler.clone());
        orchestrator.run(Request::video("abc123")).await;

        let events = handler.events.lock().unwrap().clone();
        assert_eq!(events.iter().filter(|e| *e == "TaskRetrying").count(), 1);
        assert_eq!(events.iter().filter(|e| *e == "TaskFailed").count(), 1);
        assert_eq!(events.iter().filter(|e| *e == "TaskSkipped").count(), 4);
    }

    #[tokio::test]
    async fn test_pre_cancelled_run_skips_everything() {
        let orchestrator = PipelineOrchestrator::new(collaborators(), fast_config()).unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let report = orchestrator
            .run_with_cancel(Request::video("abc123"), token)
            .await;
        assert!(report.cancelled);
        assert!(report.tasks.iter().all(|e| e.state == TaskState::Skipped));
        assert_eq!(report.status, OverallStatus::Failed);
    }
}
