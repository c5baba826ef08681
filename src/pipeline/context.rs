//! Per-run shared context and the inputs handed to each task

use std::collections::BTreeMap;
use std::sync::Mutex;

use thiserror::Error;

use super::payload::{
    BuildReport, RepositoryAnalysis, TaskPayload, TrendReport, VideoAnalysis,
};
use super::request::Request;
use super::result::{TaskFailure, TaskResult};
use super::task::TaskName;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("result for task {0} was already written")]
    AlreadyWritten(TaskName),
}

/// Write-once store of task results for a single run
///
/// Iteration order is insertion order, which is the order tasks finished.
#[derive(Debug, Default)]
pub struct SharedContext {
    entries: Mutex<Vec<(TaskName, TaskResult)>>,
}

impl SharedContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, task: TaskName, result: TaskResult) -> Result<(), ContextError> {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        if entries.iter().any(|(t, _)| *t == task) {
            return Err(ContextError::AlreadyWritten(task));
        }
        entries.push((task, result));
        Ok(())
    }

    pub fn get(&self, task: TaskName) -> Option<TaskResult> {
        let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries
            .iter()
            .find(|(t, _)| *t == task)
            .map(|(_, r)| r.clone())
    }

    /// True when every named task has an entry, successful or not
    pub fn all_satisfied(&self, names: &[TaskName]) -> bool {
        let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        names
            .iter()
            .all(|name| entries.iter().any(|(t, _)| t == name))
    }

    pub fn entries(&self) -> Vec<(TaskName, TaskResult)> {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Successful upstream payloads a task is allowed to see
#[derive(Debug, Clone)]
pub struct TaskInputs {
    pub request: Request,
    payloads: BTreeMap<TaskName, TaskPayload>,
}

impl TaskInputs {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            payloads: BTreeMap::new(),
        }
    }

    pub fn with_payload(mut self, payload: TaskPayload) -> Self {
        self.insert(payload);
        self
    }

    pub fn insert(&mut self, payload: TaskPayload) {
        self.payloads.insert(payload.task(), payload);
    }

    pub fn has(&self, task: TaskName) -> bool {
        self.payloads.contains_key(&task)
    }

    pub fn video(&self) -> Option<&VideoAnalysis> {
        match self.payloads.get(&TaskName::VideoAnalysis) {
            Some(TaskPayload::Video(v)) => Some(v),
            _ => None,
        }
    }

    pub fn repository(&self) -> Option<&RepositoryAnalysis> {
        match self.payloads.get(&TaskName::RepositoryAnalysis) {
            Some(TaskPayload::Repository(r)) => Some(r),
            _ => None,
        }
    }

    pub fn build(&self) -> Option<&BuildReport> {
        match self.payloads.get(&TaskName::ApplicationBuild) {
            Some(TaskPayload::Build(b)) => Some(b),
            _ => None,
        }
    }

    pub fn trend(&self) -> Option<&TrendReport> {
        match self.payloads.get(&TaskName::TrendAnalysis) {
            Some(TaskPayload::Trend(t)) => Some(t),
            _ => None,
        }
    }

    pub fn require_video(&self) -> Result<&VideoAnalysis, TaskFailure> {
        self.video()
            .ok_or_else(|| TaskFailure::missing_input(TaskName::VideoAnalysis.as_str()))
    }

    pub fn require_repository(&self) -> Result<&RepositoryAnalysis, TaskFailure> {
        self.repository()
            .ok_or_else(|| TaskFailure::missing_input(TaskName::RepositoryAnalysis.as_str()))
    }

    pub fn require_trend(&self) -> Result<&TrendReport, TaskFailure> {
        self.trend()
            .ok_or_else(|| TaskFailure::missing_input(TaskName::TrendAnalysis.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::result::FailureKind;
    use std::sync::Arc;

    fn video_payload() -> TaskPayload {
        TaskPayload::Video(VideoAnalysis::direct_repository("https://github.com/a/b"))
    }

    #[test]
    fn test_put_and_get() {
        let context = SharedContext::new();
        context
            .put(TaskName::VideoAnalysis, TaskResult::Success(video_payload()))
            .unwrap();
        assert!(context.get(TaskName::VideoAnalysis).unwrap().is_success());
        assert!(context.get(TaskName::Monetization).is_none());
    }

    #[test]
    fn test_write_once() {
        let context = SharedContext::new();
        context
            .put(TaskName::VideoAnalysis, TaskResult::Success(video_payload()))
            .unwrap();
        let err = context
            .put(
                TaskName::VideoAnalysis,
                TaskFailure::permanent(FailureKind::NotFound, "gone").into(),
            )
            .unwrap_err();
        assert_eq!(err, ContextError::AlreadyWritten(TaskName::VideoAnalysis));
        assert!(context.get(TaskName::VideoAnalysis).unwrap().is_success());
    }

    #[test]
    fn test_entries_keep_insertion_order() {
        let context = SharedContext::new();
        let failure: TaskResult = TaskFailure::permanent(FailureKind::BuildError, "x").into();
        context.put(TaskName::TrendAnalysis, failure.clone()).unwrap();
        context.put(TaskName::VideoAnalysis, failure.clone()).unwrap();
        let names: Vec<_> = context.entries().into_iter().map(|(t, _)| t).collect();
        assert_eq!(names, vec![TaskName::TrendAnalysis, TaskName::VideoAnalysis]);
    }

    #[test]
    fn test_all_satisfied() {
        let context = SharedContext::new();
        assert!(context.all_satisfied(&[]));
        context
            .put(TaskName::VideoAnalysis, TaskResult::Success(video_payload()))
            .unwrap();
        assert!(context.all_satisfied(&[TaskName::VideoAnalysis]));
        assert!(!context.all_satisfied(&[TaskName::VideoAnalysis, TaskName::RepositoryAnalysis]));
    }

    #[test]
    fn test_concurrent_puts_only_one_wins() {
        let context = Arc::new(SharedContext::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let context = Arc::clone(&context);
                std::thread::spawn(move || {
                    context
                        .put(TaskName::VideoAnalysis, TaskResult::Success(video_payload()))
                        .is_ok()
                })
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(wins, 1);
        assert_eq!(context.len(), 1);
    }

    #[test]
    fn test_inputs_accessors() {
        let inputs = TaskInputs::new(Request::video("abc123")).with_payload(video_payload());
        assert!(inputs.has(TaskName::VideoAnalysis));
        assert!(inputs.require_video().is_ok());
        let err = inputs.require_repository().unwrap_err();
        assert_eq!(err.kind, FailureKind::ConfigurationError);
        assert!(!err.recoverable);
        assert!(inputs.build().is_none());
    }
}
