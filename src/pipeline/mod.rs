pub mod channel;
pub mod config;
pub mod context;
pub mod graph;
pub mod orchestrator;
pub mod payload;
pub mod report;
pub mod request;
pub mod result;
pub mod retry;
pub mod task;
pub mod tasks;

pub use channel::ChannelReport;
pub use config::PipelineConfig;
pub use context::{ContextError, SharedContext, TaskInputs};
pub use graph::{Dependency, DependencyGraph, EdgeKind, GraphError};
pub use orchestrator::PipelineOrchestrator;
pub use payload::{
    AnalysisOrigin, BuildInstructions, BuildReport, BuildStep, BuildSystem, ContentPopularity,
    GrowthRating, LicenseClass, MarketOpportunity, MonetizationPlan, PopularityLevel, Priority,
    ProjectType, RepositoryAnalysis, RepositoryInfo, RuntimeInfo, Strategy, StrategyCategory,
    StrategyInput, TaskPayload, TechnologyTrend, Transcript, TrendReport, VideoAnalysis,
    VideoMetadata,
};
pub use report::{CombinedReport, OverallStatus, TaskEntry};
pub use request::Request;
pub use result::{FailureKind, TaskFailure, TaskResult};
pub use retry::RetryPolicy;
pub use task::{InvalidTransition, TaskName, TaskState};
pub use tasks::Collaborators;
