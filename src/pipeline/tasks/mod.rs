// Pipeline tasks, one per node of the dependency graph
//
// Each task reads its upstream payloads from `TaskInputs` and returns a
// single `TaskResult`. Tasks never touch the shared context directly.

#[path = "01_video.rs"]
pub mod video;
#[path = "02_repository.rs"]
pub mod repository;
#[path = "03_build.rs"]
pub mod build;
#[path = "04_trend.rs"]
pub mod trend;
#[path = "05_monetization.rs"]
pub mod monetization;

use super::config::PipelineConfig;
use super::context::TaskInputs;
use super::result::TaskResult;
use super::task::TaskName;
use crate::sources::{BuildRunner, RepositorySource, StrategyGenerator, VideoSource};
use std::sync::Arc;

pub use build::ApplicationBuildTask;
pub use monetization::MonetizationTask;
pub use repository::RepositoryAnalysisTask;
pub use trend::TrendAnalysisTask;
pub use video::VideoAnalysisTask;

/// External systems the tasks talk to
#[derive(Clone)]
pub struct Collaborators {
    pub video: Arc<dyn VideoSource>,
    pub repository: Arc<dyn RepositorySource>,
    pub builder: Arc<dyn BuildRunner>,
    pub strategist: Arc<dyn StrategyGenerator>,
}

pub enum TaskUnit {
    Video(VideoAnalysisTask),
    Repository(RepositoryAnalysisTask),
    Build(ApplicationBuildTask),
    Trend(TrendAnalysisTask),
    Monetization(MonetizationTask),
}

impl TaskUnit {
    pub fn name(&self) -> TaskName {
        match self {
            TaskUnit::Video(_) => TaskName::VideoAnalysis,
            TaskUnit::Repository(_) => TaskName::RepositoryAnalysis,
            TaskUnit::Build(_) => TaskName::ApplicationBuild,
            TaskUnit::Trend(_) => TaskName::TrendAnalysis,
            TaskUnit::Monetization(_) => TaskName::Monetization,
        }
    }

    pub async fn execute(&self, inputs: &TaskInputs) -> TaskResult {
        match self {
            TaskUnit::Video(task) => task.execute(inputs).await,
            TaskUnit::Repository(task) => task.execute(inputs).await,
            TaskUnit::Build(task) => task.execute(inputs).await,
            TaskUnit::Trend(task) => task.execute(inputs).await,
            TaskUnit::Monetization(task) => task.execute(inputs).await,
        }
    }
}

/// One unit per task name, wired to the collaborators
pub struct TaskSet {
    video: TaskUnit,
    repository: TaskUnit,
    build: TaskUnit,
    trend: TaskUnit,
    monetization: TaskUnit,
}

impl TaskSet {
    pub fn new(collaborators: &Collaborators, config: &PipelineConfig) -> Self {
        Self {
            video: TaskUnit::Video(VideoAnalysisTask::new(collaborators.video.clone())),
            repository: TaskUnit::Repository(RepositoryAnalysisTask::new(
                collaborators.repository.clone(),
                config.max_repositories,
            )),
            build: TaskUnit::Build(ApplicationBuildTask::new(collaborators.builder.clone())),
            trend: TaskUnit::Trend(TrendAnalysisTask::new(collaborators.repository.clone())),
            monetization: TaskUnit::Monetization(MonetizationTask::new(
                collaborators.strategist.clone(),
            )),
        }
    }

    pub fn get(&self, name: TaskName) -> &TaskUnit {
        match name {
            TaskName::VideoAnalysis => &self.video,
            TaskName::RepositoryAnalysis => &self.repository,
            TaskName::ApplicationBuild => &self.build,
            TaskName::TrendAnalysis => &self.trend,
            TaskName::Monetization => &self.monetization,
        }
    }
}
