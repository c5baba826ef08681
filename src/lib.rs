//! reelforge - turns a coding video into a monetization report
//!
//! A run takes a YouTube video, channel or GitHub repository and pushes it
//! through five analysis tasks: video analysis, repository analysis,
//! application build, trend analysis and monetization strategy. Tasks are
//! scheduled in dependency layers; independent tasks run concurrently,
//! recoverable failures are retried with exponential backoff, and a failed
//! mandatory dependency skips its dependents instead of aborting the run.
//! Every run ends with a [`CombinedReport`] listing each task's terminal
//! state.
//!
//! # Example
//!
//! ```no_run
//! use reelforge::{Collaborators, PipelineConfig, PipelineOrchestrator, Request};
//!
//! async fn analyze(collaborators: Collaborators) -> anyhow::Result<()> {
//!     let orchestrator = PipelineOrchestrator::new(collaborators, PipelineConfig::default())?;
//!     let report = orchestrator.run(Request::video("dQw4w9WgXcQ")).await;
//!     println!("{}: {}", report.run_id, report.status);
//!     Ok(())
//! }
//! ```
//!
//! # Project Structure
//!
//! - [`pipeline`]: task graph, orchestrator, shared context and reports
//! - [`sources`]: YouTube, GitHub, build and strategy collaborators
//! - [`llm`]: LLM client abstraction used by the strategy generator
//! - [`progress`]: run progress events
//! - [`config`]: environment configuration

pub mod cli;
pub mod config;
pub mod llm;
pub mod pipeline;
pub mod progress;
pub mod sources;
pub mod util;

pub use config::{ConfigError, ReelforgeConfig};
pub use llm::{BackendError, GenAIClient, LLMClient};
pub use pipeline::{
    ChannelReport, Collaborators, CombinedReport, DependencyGraph, OverallStatus, PipelineConfig,
    PipelineOrchestrator, Request, RetryPolicy, TaskName, TaskState,
};
pub use progress::{LoggingHandler, NoOpHandler, ProgressEvent, ProgressHandler};
pub use sources::SourceError;
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
