//! Rendering of pipeline reports in every output format

mod support;

use reelforge::cli::output::{OutputFormat, OutputFormatter};
use reelforge::pipeline::{CombinedReport, OverallStatus, Request, TaskName, TaskState};
use reelforge::sources::mock::MockBuildRunner;
use reelforge::sources::SourceError;
use support::{fast_config, Harness, VIDEO_ID};

async fn partial_report() -> CombinedReport {
    let harness = Harness::happy().with_builder(MockBuildRunner::failing(SourceError::build(
        "make: *** [all] Error 2",
    )));
    harness
        .orchestrator(fast_config())
        .run(Request::video(VIDEO_ID))
        .await
}

#[tokio::test]
async fn test_json_round_trips() {
    let report = partial_report().await;
    let json = OutputFormatter::new(OutputFormat::Json)
        .format_report(&report)
        .unwrap();

    let parsed: CombinedReport = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.run_id, report.run_id);
    assert_eq!(parsed.request, report.request);
    assert_eq!(parsed.tasks.len(), report.tasks.len());

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["status"], "partial");
    assert_eq!(value["tasks"].as_array().unwrap().len(), 5);
    assert_eq!(value["tasks"][0]["task"], "video_analysis");
}

#[tokio::test]
async fn test_yaml_round_trips() {
    let report = partial_report().await;
    let yaml = OutputFormatter::new(OutputFormat::Yaml)
        .format_report(&report)
        .unwrap();

    let parsed: CombinedReport = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(parsed.status, OverallStatus::Partial);
    assert_eq!(parsed.state(TaskName::ApplicationBuild), Some(TaskState::Failed));
}

#[tokio::test]
async fn test_human_shows_states_attempts_and_failures() {
    let report = partial_report().await;
    let text = OutputFormatter::new(OutputFormat::Human)
        .format_report(&report)
        .unwrap();

    assert!(text.contains("Pipeline Report"));
    assert!(text.contains("partial"));
    for task in TaskName::ALL {
        assert!(text.contains(task.as_str()), "missing {}", task);
    }
    assert!(text.contains("attempts: 1"));
    assert!(text.contains("make: *** [all] Error 2"));
    assert!(text.contains("Monetization Strategies:"));
    assert!(text.contains("Ranked without build results"));
}

#[tokio::test]
async fn test_channel_human_includes_each_run() {
    let harness = Harness::happy();
    let report = harness
        .orchestrator(fast_config())
        .run_channel("UCunknown", 5)
        .await;

    let text = OutputFormatter::new(OutputFormat::Human)
        .format_channel(&report)
        .unwrap();
    assert!(text.contains("Channel Report: UCunknown"));
    assert!(text.contains("Listing failed"));
}

#[tokio::test]
async fn test_human_shows_how_the_build_runs() {
    let report = Harness::happy()
        .orchestrator(fast_config())
        .run(Request::video(VIDEO_ID))
        .await;
    let text = OutputFormatter::new(OutputFormat::Human)
        .format_report(&report)
        .unwrap();

    assert!(text.contains("Project Type: generic"));
    assert!(text.contains("Run Command: cargo run --release"));
}
