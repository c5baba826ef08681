//! Report rendering as JSON, YAML or human-readable text

use anyhow::{Context, Result};

use crate::config::ReelforgeConfig;
use crate::pipeline::{ChannelReport, CombinedReport, TaskEntry, TaskPayload, TaskState};

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Human,
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_report(&self, report: &CombinedReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(report).context("Failed to serialize report to YAML")
            }
            OutputFormat::Human => Ok(self.format_report_human(report)),
        }
    }

    pub fn format_channel(&self, report: &ChannelReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report)
                .context("Failed to serialize channel report to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(report).context("Failed to serialize channel report to YAML")
            }
            OutputFormat::Human => Ok(self.format_channel_human(report)),
        }
    }

    pub fn format_config(&self, config: &ReelforgeConfig) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&config.to_display_map())
                .context("Failed to serialize config to JSON"),
            OutputFormat::Yaml => serde_yaml::to_string(&config.to_display_map())
                .context("Failed to serialize config to YAML"),
            OutputFormat::Human => Ok(config.to_string()),
        }
    }

    fn format_report_human(&self, report: &CombinedReport) -> String {
        let mut output = String::new();

        let marker = match report.exit_code() {
            0 => "\u{2713}",
            2 => "\u{26A0}",
            _ => "\u{2717}",
        };
        output.push_str(&format!("{} Pipeline Report: {}\n", marker, report.request));
        output.push_str(RULE);
        output.push_str("\n\n");

        output.push_str(&format!("Run:       {}\n", report.run_id));
        output.push_str(&format!("Status:    {}\n", report.status));
        if report.cancelled {
            output.push_str("Cancelled: yes\n");
        }
        output.push_str(&format!("Duration:  {}ms\n\n", report.duration_ms()));

        output.push_str("Tasks:\n");
        for (i, entry) in report.tasks.iter().enumerate() {
            let connector = if i + 1 == report.tasks.len() {
                "\u{2514}\u{2500}"
            } else {
                "\u{251C}\u{2500}"
            };
            output.push_str(&format!("{} {}\n", connector, task_line(entry)));
        }

        for entry in &report.tasks {
            if let Some(payload) = &entry.payload {
                output.push('\n');
                push_payload(&mut output, payload);
            }
        }

        output
    }

    fn format_channel_human(&self, report: &ChannelReport) -> String {
        let mut output = String::new();

        let title = report.channel_title.as_deref().unwrap_or(&report.channel_id);
        output.push_str(&format!("Channel Report: {}\n", title));
        output.push_str(RULE);
        output.push_str("\n\n");
        output.push_str(&format!("Status: {}\n", report.status));
        output.push_str(&format!("Videos: {}\n", report.video_ids.len()));
        if let Some(failure) = &report.listing_failure {
            output.push_str(&format!("Listing failed: {}\n", failure));
        }

        for run in &report.runs {
            output.push('\n');
            output.push_str(&self.format_report_human(run));
        }
        output
    }
}

fn task_line(entry: &TaskEntry) -> String {
    let mut line = format!("{:<13} {:<9}", entry.task.as_str(), entry.state.as_str());
    if entry.state != TaskState::Skipped {
        line.push_str(&format!(" attempts: {}", entry.attempts));
    }
    if let Some(failure) = &entry.failure {
        line.push_str(&format!(" ({})", failure));
    }
    if let Some(reason) = &entry.skip_reason {
        line.push_str(&format!(" ({})", reason));
    }
    line
}

fn push_payload(output: &mut String, payload: &TaskPayload) {
    match payload {
        TaskPayload::Video(video) => {
            output.push_str("Video:\n");
            if let Some(meta) = &video.metadata {
                output.push_str(&format!("  Title:        {}\n", meta.title));
                output.push_str(&format!("  Channel:      {}\n", meta.channel_title));
                output.push_str(&format!("  Views:        {}\n", meta.view_count));
            }
            output.push_str(&format!("  Repositories: {}\n", video.repository_urls.join(", ")));
            if !video.technologies.is_empty() {
                output.push_str(&format!("  Technologies: {}\n", video.technologies.join(", ")));
            }
            push_warnings(output, &video.warnings);
        }
        TaskPayload::Repository(analysis) => {
            output.push_str("Repositories:\n");
            for repo in &analysis.repositories {
                output.push_str(&format!(
                    "  {} ({} stars, license: {})\n",
                    repo.full_name(),
                    repo.stars,
                    repo.license.as_deref().unwrap_or("none")
                ));
                let languages = repo.ranked_languages();
                if !languages.is_empty() {
                    output.push_str(&format!("    Languages: {}\n", languages.join(", ")));
                }
            }
            push_warnings(output, &analysis.warnings);
        }
        TaskPayload::Build(build) => {
            output.push_str(&format!("Build of {}:\n", build.repository));
            if let Some(system) = build.build_system {
                output.push_str(&format!("  Build System: {}\n", system));
            }
            for step in &build.steps {
                let mark = if step.succeeded() { "\u{2713}" } else { "\u{2717}" };
                output.push_str(&format!("  {} {} ({}ms)\n", mark, step.command, step.duration_ms));
            }
            output.push_str(&format!("  Project Type: {}\n", build.runtime.project_type));
            if let Some(command) = &build.runtime.run_command {
                output.push_str(&format!("  Run Command: {}\n", command));
            }
            output.push_str(&format!("  Duration: {}ms\n", build.duration_ms));
        }
        TaskPayload::Trend(trend) => {
            output.push_str("Trends:\n");
            for tech in &trend.technologies {
                let count = tech
                    .popularity_score
                    .map(|c| c.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                output.push_str(&format!(
                    "  {:<12} {} repositories ({:?})\n",
                    tech.technology, count, tech.growth
                ));
            }
            if let Some(top) = &trend.top_technology {
                output.push_str(&format!("  Top technology: {}\n", top));
            }
            if let Some(popularity) = &trend.content_popularity {
                output.push_str(&format!(
                    "  Engagement: {:.2}% ({:?})\n",
                    popularity.engagement_rate, popularity.level
                ));
            }
            push_warnings(output, &trend.warnings);
        }
        TaskPayload::Monetization(plan) => {
            output.push_str("Monetization Strategies:\n");
            for (i, strategy) in plan.strategies.iter().enumerate() {
                output.push_str(&format!(
                    "  {}. {} [{}] {:?} priority, {}\n",
                    i + 1,
                    strategy.title,
                    strategy.category.title(),
                    strategy.priority,
                    strategy.estimated_revenue.as_deref().unwrap_or("revenue unknown")
                ));
            }
            if plan.reduced_confidence {
                output.push_str("  \u{26A0} Ranked without build results\n");
            }
            if !plan.legal_considerations.is_empty() {
                output.push_str("  Legal:\n");
                for line in &plan.legal_considerations {
                    output.push_str(&format!("    - {}\n", line));
                }
            }
            if !plan.recommendations.is_empty() {
                output.push_str("  Recommendations:\n");
                for line in &plan.recommendations {
                    output.push_str(&format!("    - {}\n", line));
                }
            }
        }
    }
}

fn push_warnings(output: &mut String, warnings: &[String]) {
    for warning in warnings {
        output.push_str(&format!("  \u{26A0} {}\n", warning));
    }
}
