//! Command handlers: build collaborators from configuration, run, render

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::commands::{ChannelArgs, ConfigArgs, RepoArgs, RunOptions, VideoArgs};
use super::output::{OutputFormat, OutputFormatter};
use crate::config::ReelforgeConfig;
use crate::llm::GenAIClient;
use crate::pipeline::{Collaborators, PipelineOrchestrator, Request};
use crate::progress::LoggingHandler;
use crate::sources::{GitHubClient, LlmStrategyGenerator, LocalBuildRunner, YouTubeClient};

/// Process exit code for errors that happen before a report exists
const EXIT_ERROR: i32 = 1;

pub async fn handle_video(args: &VideoArgs) -> i32 {
    finish(run_single(Request::video(&args.video_id), &args.run).await)
}

pub async fn handle_repo(args: &RepoArgs) -> i32 {
    finish(run_single(Request::repository(&args.url), &args.run).await)
}

pub async fn handle_channel(args: &ChannelArgs) -> i32 {
    finish(run_channel(args).await)
}

pub fn handle_config(args: &ConfigArgs) -> i32 {
    let result = ReelforgeConfig::from_env()
        .context("Invalid configuration")
        .and_then(|config| OutputFormatter::new(args.format.into()).format_config(&config))
        .map(|rendered| {
            println!("{}", rendered);
            0
        });
    finish(result)
}

fn finish(result: Result<i32>) -> i32 {
    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            EXIT_ERROR
        }
    }
}

async fn run_single(request: Request, options: &RunOptions) -> Result<i32> {
    let config = load_config(options)?;
    let orchestrator = build_orchestrator(&config)?;
    let cancel = cancel_on_ctrl_c();

    info!(request = %request, "Starting pipeline");
    let report = orchestrator.run_with_cancel(request, cancel).await;

    let rendered = OutputFormatter::new(OutputFormat::from(options.format))
        .format_report(&report)?;
    emit(&rendered, options.output.as_deref())?;
    Ok(report.exit_code())
}

async fn run_channel(args: &ChannelArgs) -> Result<i32> {
    let config = load_config(&args.run)?;
    let orchestrator = build_orchestrator(&config)?;
    let cancel = cancel_on_ctrl_c();

    let report = orchestrator
        .run_channel_with_cancel(&args.channel_id, args.max_videos as usize, cancel)
        .await;

    let rendered = OutputFormatter::new(OutputFormat::from(args.run.format))
        .format_channel(&report)?;
    emit(&rendered, args.run.output.as_deref())?;
    Ok(report.exit_code())
}

/// Environment configuration with command-line overrides applied
pub fn load_config(options: &RunOptions) -> Result<ReelforgeConfig> {
    let mut config = ReelforgeConfig::from_env().context("Invalid configuration")?;
    if let Some(timeout) = options.timeout {
        config.run_timeout_secs = timeout;
    }
    if let Some(backend) = options.backend {
        config.provider = backend;
    }
    if let Some(model) = &options.model {
        config.model = model.clone();
    }
    config
        .validate()
        .context("Invalid command-line overrides")?;
    Ok(config)
}

/// Wires the production collaborators
pub fn build_orchestrator(config: &ReelforgeConfig) -> Result<PipelineOrchestrator> {
    let timeout = config.request_timeout();

    if config.youtube_api_key.is_none() {
        warn!("YOUTUBE_API_KEY is not set; video analysis will fail");
    }
    let video = YouTubeClient::new(config.youtube_api_key.clone(), timeout)
        .context("Failed to create YouTube client")?;
    let repository = GitHubClient::new(config.github_token.clone(), timeout)
        .context("Failed to create GitHub client")?;
    let builder = LocalBuildRunner::new(config.work_dir.clone(), config.build_timeout());
    let llm = GenAIClient::new(config.provider, config.model.clone(), timeout);
    let strategist = LlmStrategyGenerator::new(Arc::new(llm));

    let collaborators = Collaborators {
        video: Arc::new(video),
        repository: Arc::new(repository),
        builder: Arc::new(builder),
        strategist: Arc::new(strategist),
    };

    let orchestrator = PipelineOrchestrator::new(collaborators, config.pipeline_config())
        .context("Failed to build task graph")?
        .with_progress(Arc::new(LoggingHandler));
    Ok(orchestrator)
}

/// Token cancelled on the first Ctrl-C; the run then reports what it has
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling run");
            trigger.cancel();
        }
    });
    token
}

fn emit(rendered: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("Failed to write output to {}", path.display()))?;
            info!(path = %path.display(), "Report written");
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands::OutputFormatArg;
    use tempfile::TempDir;

    #[test]
    fn test_emit_to_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.txt");
        emit("hello", Some(&path)).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
    }

    #[test]
    fn test_emit_to_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("report.txt");
        let err = emit("hello", Some(&path)).unwrap_err();
        assert!(err.to_string().contains("Failed to write output"));
    }

    #[test]
    #[serial_test::serial]
    fn test_load_config_rejects_zero_timeout() {
        let options = RunOptions {
            format: OutputFormatArg::Human,
            output: None,
            timeout: Some(0),
            backend: None,
            model: None,
        };
        assert!(load_config(&options).is_err());
    }
}
