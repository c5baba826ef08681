//! Local build runner: shallow clone plus the detected build commands

use super::error::SourceError;
use super::BuildRunner;
use crate::pipeline::{BuildReport, BuildStep, RepositoryInfo, RuntimeInfo};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info};

const LOG_TAIL_LINES: usize = 40;

pub struct LocalBuildRunner {
    work_dir: PathBuf,
    timeout: Duration,
    keep_workspace: bool,
}

impl LocalBuildRunner {
    pub fn new(work_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            work_dir: work_dir.into(),
            timeout,
            keep_workspace: false,
        }
    }

    /// Leave the cloned checkout on disk after the build
    pub fn keep_workspace(mut self, keep: bool) -> Self {
        self.keep_workspace = keep;
        self
    }

    /// Empty checkout directory, removed when dropped
    async fn checkout_dir(&self, repo: &RepositoryInfo) -> Result<TempDir, SourceError> {
        let unavailable = |e: std::io::Error| {
            SourceError::configuration(format!(
                "cannot create work directory {}: {}",
                self.work_dir.display(),
                e
            ))
        };
        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .map_err(unavailable)?;
        tempfile::Builder::new()
            .prefix(&format!("{}-{}-", repo.owner, repo.name))
            .tempdir_in(&self.work_dir)
            .map_err(unavailable)
    }

    async fn clone(&self, repo: &RepositoryInfo, dest: &Path) -> Result<(), SourceError> {
        let mut command = Command::new("git");
        command
            .arg("clone")
            .arg("--depth")
            .arg("1")
            .arg("--branch")
            .arg(&repo.default_branch)
            .arg(&repo.url)
            .arg(dest)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SourceError::configuration("git executable not found on PATH"))
            }
            Ok(Err(e)) => return Err(SourceError::transient(format!("git clone failed to start: {}", e))),
            Err(_) => {
                return Err(SourceError::transient(format!(
                    "git clone timed out after {}s",
                    self.timeout.as_secs()
                )))
            }
        };

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(classify_clone_failure(&stderr))
        }
    }

    async fn run_step(&self, command: &str, dir: &Path, budget: Duration) -> BuildStep {
        let start = Instant::now();
        debug!(command, dir = %dir.display(), "Running build step");

        let mut child = Command::new("sh");
        child
            .arg("-c")
            .arg(command)
            .current_dir(dir)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let (exit_code, log) = match tokio::time::timeout(budget, child.output()).await {
            Ok(Ok(output)) => {
                let mut log = String::from_utf8_lossy(&output.stdout).into_owned();
                log.push_str(&String::from_utf8_lossy(&output.stderr));
                (output.status.code(), log)
            }
            Ok(Err(e)) => (None, format!("failed to start: {}", e)),
            Err(_) => (None, format!("timed out after {}s", budget.as_secs())),
        };

        BuildStep {
            command: command.to_string(),
            exit_code,
            log_tail: tail_lines(&log, LOG_TAIL_LINES),
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn run_steps(&self, commands: &[String], dir: &Path, started: Instant) -> Result<Vec<BuildStep>, SourceError> {
        let mut steps = Vec::new();
        for command in commands {
            let budget = self.timeout.saturating_sub(started.elapsed());
            if budget.is_zero() {
                return Err(SourceError::build(format!(
                    "build exceeded {}s before running '{}'",
                    self.timeout.as_secs(),
                    command
                )));
            }

            let step = self.run_step(command, dir, budget).await;
            let failed = !step.succeeded();
            let summary = match step.exit_code {
                Some(code) => format!("'{}' exited with status {}", command, code),
                None => format!("'{}' did not complete: {}", command, step.log_tail),
            };
            steps.push(step);
            if failed {
                return Err(SourceError::build(summary));
            }
        }
        Ok(steps)
    }
}

#[async_trait]
impl BuildRunner for LocalBuildRunner {
    async fn build(&self, repo: &RepositoryInfo) -> Result<BuildReport, SourceError> {
        let started = Instant::now();

        let Some(instructions) = repo.build_instructions.as_ref() else {
            info!(repository = %repo.full_name(), "No build system detected, nothing to build");
            return Ok(BuildReport {
                repository: repo.full_name(),
                url: repo.url.clone(),
                build_system: None,
                steps: Vec::new(),
                runtime: RuntimeInfo::detect(&repo.key_files, None, None),
                workspace: None,
                duration_ms: started.elapsed().as_millis() as u64,
                notes: vec!["No build step detected".to_string()],
            });
        };

        let checkout = self.checkout_dir(repo).await?;
        info!(
            repository = %repo.full_name(),
            build_system = %instructions.build_system,
            dest = %checkout.path().display(),
            "Cloning repository for build"
        );
        self.clone(repo, checkout.path()).await?;

        let runtime = inspect_checkout(checkout.path()).await;
        let steps = self
            .run_steps(&instructions.commands, checkout.path(), started)
            .await?;

        let workspace = self.keep_workspace.then(|| checkout.into_path());
        Ok(BuildReport {
            repository: repo.full_name(),
            url: repo.url.clone(),
            build_system: Some(instructions.build_system),
            steps,
            runtime,
            workspace,
            duration_ms: started.elapsed().as_millis() as u64,
            notes: Vec::new(),
        })
    }
}

/// Reads the top-level layout of a checkout to work out how the app runs
async fn inspect_checkout(dir: &Path) -> RuntimeInfo {
    let mut files = Vec::new();
    if let Ok(mut entries) = tokio::fs::read_dir(dir).await {
        while let Ok(Some(entry)) = entries.next_entry().await {
            files.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    let package_json = tokio::fs::read_to_string(dir.join("package.json")).await.ok();
    let requirements = tokio::fs::read_to_string(dir.join("requirements.txt")).await.ok();
    RuntimeInfo::detect(&files, package_json.as_deref(), requirements.as_deref())
}

fn classify_clone_failure(stderr: &str) -> SourceError {
    let lower = stderr.to_lowercase();
    let message = format!("git clone failed: {}", stderr.trim());
    if lower.contains("repository not found") || lower.contains("not found") {
        SourceError::not_found(message)
    } else if lower.contains("could not resolve host")
        || lower.contains("unable to access")
        || lower.contains("connection")
        || lower.contains("timed out")
        || lower.contains("early eof")
    {
        SourceError::transient(message)
    } else if lower.contains("authentication failed") || lower.contains("permission denied") {
        SourceError::access_denied(message)
    } else {
        SourceError::build(message)
    }
}

/// Last `n` lines of `text`
fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{BuildInstructions, BuildSystem, FailureKind, ProjectType};
    use std::collections::BTreeMap;
    use yare::parameterized;

    fn repo_without_build() -> RepositoryInfo {
        RepositoryInfo {
            owner: "octo".into(),
            name: "docs".into(),
            url: "https://github.com/octo/docs".into(),
            description: None,
            default_branch: "main".into(),
            stars: 1,
            forks: 0,
            license: None,
            languages: BTreeMap::new(),
            key_files: vec!["README.md".into()],
            build_instructions: None,
        }
    }

    /// Local origin with one commit on `main`, or `None` when git is unavailable
    fn local_origin(dir: &Path) -> Option<String> {
        let git = |args: &[&str]| {
            std::process::Command::new("git")
                .args(["-c", "user.name=reelforge", "-c", "user.email=build@reelforge.test"])
                .args(args)
                .current_dir(dir)
                .output()
                .map(|out| out.status.success())
                .unwrap_or(false)
        };
        std::fs::write(dir.join("Makefile"), "all:\n\ttrue\n").unwrap();
        let ready = git(&["init", "-q"])
            && git(&["symbolic-ref", "HEAD", "refs/heads/main"])
            && git(&["add", "."])
            && git(&["commit", "-q", "-m", "init"]);
        ready.then(|| format!("file://{}", dir.display()))
    }

    fn repo_with_commands(url: &str, commands: &[&str]) -> RepositoryInfo {
        RepositoryInfo {
            owner: "octo".into(),
            name: "app".into(),
            url: url.to_string(),
            default_branch: "main".into(),
            key_files: vec!["Makefile".into()],
            build_instructions: Some(BuildInstructions {
                build_system: BuildSystem::Make,
                commands: commands.iter().map(|c| c.to_string()).collect(),
            }),
            ..repo_without_build()
        }
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|e| e.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn test_interrupted_build_removes_checkout() {
        let origin = TempDir::new().unwrap();
        let Some(url) = local_origin(origin.path()) else {
            return;
        };
        let work = TempDir::new().unwrap();
        let runner = LocalBuildRunner::new(work.path(), Duration::from_secs(60));
        let repo = repo_with_commands(&url, &["sleep 30"]);

        let result = tokio::time::timeout(Duration::from_secs(3), runner.build(&repo)).await;
        assert!(result.is_err());
        assert_eq!(entries(work.path()), 0);
    }

    #[tokio::test]
    async fn test_failed_build_removes_checkout() {
        let origin = TempDir::new().unwrap();
        let Some(url) = local_origin(origin.path()) else {
            return;
        };
        let work = TempDir::new().unwrap();
        let runner = LocalBuildRunner::new(work.path(), Duration::from_secs(30));

        let err = runner
            .build(&repo_with_commands(&url, &["exit 4"]))
            .await
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::BuildError);
        assert_eq!(entries(work.path()), 0);
    }

    #[tokio::test]
    async fn test_kept_workspace_survives_build() {
        let origin = TempDir::new().unwrap();
        let Some(url) = local_origin(origin.path()) else {
            return;
        };
        let work = TempDir::new().unwrap();
        let runner = LocalBuildRunner::new(work.path(), Duration::from_secs(30)).keep_workspace(true);

        let report = runner
            .build(&repo_with_commands(&url, &["true"]))
            .await
            .unwrap();
        let workspace = report.workspace.unwrap();
        assert!(workspace.join("Makefile").exists());
        assert_eq!(report.runtime.project_type, ProjectType::Generic);
        assert_eq!(entries(work.path()), 1);
    }

    #[tokio::test]
    async fn test_checkout_runtime_uses_package_scripts() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("package.json"),
            r#"{"scripts":{"start":"node server.js"},"dependencies":{"express":"4"}}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("yarn.lock"), "").unwrap();

        let runtime = inspect_checkout(dir.path()).await;
        assert_eq!(runtime.project_type, ProjectType::Express);
        assert_eq!(runtime.run_command.as_deref(), Some("yarn run start"));
    }

    #[test]
    fn test_tail_lines() {
        let text = (1..=50).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        let tail = tail_lines(&text, 3);
        assert_eq!(tail, "48\n49\n50");
        assert_eq!(tail_lines("one", 3), "one");
    }

    #[parameterized(
        missing = { "remote: Repository not found.\nfatal: repository 'x' not found", FailureKind::NotFound },
        dns = { "fatal: unable to access 'https://github.com/a/b/': Could not resolve host: github.com", FailureKind::TransientError },
        auth = { "fatal: Authentication failed for 'https://github.com/a/b/'", FailureKind::AccessDenied },
        other = { "fatal: destination path already exists", FailureKind::BuildError },
    )]
    fn test_classify_clone_failure(stderr: &str, expected: FailureKind) {
        assert_eq!(classify_clone_failure(stderr).kind, expected);
    }

    #[tokio::test]
    async fn test_nothing_to_build() {
        let dir = TempDir::new().unwrap();
        let runner = LocalBuildRunner::new(dir.path(), Duration::from_secs(5));
        let report = runner.build(&repo_without_build()).await.unwrap();
        assert!(report.steps.is_empty());
        assert!(report.build_system.is_none());
        assert_eq!(report.notes, vec!["No build step detected"]);
    }

    #[tokio::test]
    async fn test_run_step_captures_output_and_status() {
        let dir = TempDir::new().unwrap();
        let runner = LocalBuildRunner::new(dir.path(), Duration::from_secs(5));

        let ok = runner
            .run_step("echo compiled", dir.path(), Duration::from_secs(5))
            .await;
        assert!(ok.succeeded());
        assert_eq!(ok.log_tail, "compiled");

        let failed = runner
            .run_step("echo broken >&2; exit 3", dir.path(), Duration::from_secs(5))
            .await;
        assert_eq!(failed.exit_code, Some(3));
        assert_eq!(failed.log_tail, "broken");
    }

    #[tokio::test]
    async fn test_failing_step_stops_the_build() {
        let dir = TempDir::new().unwrap();
        let runner = LocalBuildRunner::new(dir.path(), Duration::from_secs(5));
        let commands = vec!["exit 2".to_string(), "echo never".to_string()];

        let err = runner
            .run_steps(&commands, dir.path(), Instant::now())
            .await
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::BuildError);
        assert!(!err.recoverable);
        assert!(err.message.contains("exited with status 2"));
    }

    #[tokio::test]
    async fn test_step_timeout() {
        let dir = TempDir::new().unwrap();
        let runner = LocalBuildRunner::new(dir.path(), Duration::from_secs(5));
        let step = runner
            .run_step("sleep 5", dir.path(), Duration::from_millis(100))
            .await;
        assert_eq!(step.exit_code, None);
        assert!(step.log_tail.starts_with("timed out"));
    }
}
