//! GitHub REST v3 client

use super::detect::parse_repository_url;
use super::error::SourceError;
use super::RepositorySource;
use crate::pipeline::{BuildInstructions, BuildSystem, RepositoryInfo};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

const API_BASE: &str = "https://api.github.com";

/// Root files worth reporting besides the build files
const NOTABLE_FILES: &[&str] = &[
    "README.md",
    "README.rst",
    "README",
    "LICENSE",
    "LICENSE.md",
    "requirements.txt",
    "Pipfile",
    "Gemfile",
    "yarn.lock",
    "package-lock.json",
    "build.gradle.kts",
    "Cargo.lock",
];

pub struct GitHubClient {
    http: Client,
    api_base: String,
}

impl GitHubClient {
    pub fn new(token: Option<String>, timeout: Duration) -> Result<Self, SourceError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("reelforge"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| SourceError::configuration("GITHUB_TOKEN contains invalid characters"))?;
            headers.insert(AUTHORIZATION, value);
        }

        let http = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| SourceError::configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_base: API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    async fn send(&self, path: &str, query: &[(&str, &str)]) -> Result<Response, SourceError> {
        let url = format!("{}{}", self.api_base, path);
        debug!(path, "GitHub API request");
        let response = self.http.get(&url).query(query).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let remaining = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Err(classify_status(
            status.as_u16(),
            remaining.as_deref(),
            format!("GitHub API returned {} for {}", status, path),
        ))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, SourceError> {
        Ok(self.send(path, query).await?.json::<T>().await?)
    }

    async fn root_files(&self, owner: &str, repo: &str) -> Result<Vec<String>, SourceError> {
        let path = format!("/repos/{}/{}/contents", owner, repo);
        match self.get_json::<Vec<ContentEntry>>(&path, &[]).await {
            Ok(entries) => Ok(select_key_files(entries)),
            // Empty repositories have no contents endpoint
            Err(e) if e.kind == crate::pipeline::FailureKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl RepositorySource for GitHubClient {
    async fn analyze(&self, url: &str) -> Result<RepositoryInfo, SourceError> {
        let (owner, name) = parse_repository_url(url)
            .ok_or_else(|| SourceError::not_found(format!("not a GitHub repository URL: {}", url)))?;

        let repo: RepoResponse = self
            .get_json(&format!("/repos/{}/{}", owner, name), &[])
            .await?;
        let languages: BTreeMap<String, u64> = self
            .get_json(&format!("/repos/{}/{}/languages", owner, name), &[])
            .await?;
        let key_files = self.root_files(&owner, &name).await?;
        let build_instructions = BuildInstructions::from_key_files(&key_files);

        Ok(RepositoryInfo {
            owner: repo.owner.login,
            name: repo.name,
            url: repo.html_url,
            description: repo.description,
            default_branch: repo.default_branch,
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            license: repo.license.and_then(|l| l.spdx_id),
            languages,
            key_files,
            build_instructions,
        })
    }

    async fn technology_popularity(&self, technology: &str) -> Result<u64, SourceError> {
        let query = format!("topic:{}", topic_slug(technology));
        let result: SearchResponse = self
            .get_json(
                "/search/repositories",
                &[("q", query.as_str()), ("per_page", "1")],
            )
            .await?;
        Ok(result.total_count)
    }
}

fn classify_status(status: u16, rate_limit_remaining: Option<&str>, message: String) -> SourceError {
    match status {
        403 if rate_limit_remaining == Some("0") => SourceError::rate_limited(message),
        _ => SourceError::from_status(status, message),
    }
}

fn select_key_files(entries: Vec<ContentEntry>) -> Vec<String> {
    entries
        .into_iter()
        .filter(|e| e.kind == "file" || e.name == ".github")
        .map(|e| e.name)
        .filter(|name| {
            BuildSystem::is_build_file(name)
                || NOTABLE_FILES.contains(&name.as_str())
                || name == ".github"
        })
        .collect()
}

/// GitHub topic name for a technology, e.g. `C++` -> `cpp`, `Node.js` -> `nodejs`
fn topic_slug(technology: &str) -> String {
    technology
        .to_lowercase()
        .replace("c++", "cpp")
        .replace("c#", "csharp")
        .replace(".js", "js")
        .replace('.', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Debug, Deserialize)]
struct RepoResponse {
    name: String,
    owner: OwnerResponse,
    html_url: String,
    description: Option<String>,
    default_branch: String,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    license: Option<LicenseResponse>,
}

#[derive(Debug, Deserialize)]
struct OwnerResponse {
    login: String,
}

#[derive(Debug, Deserialize)]
struct LicenseResponse {
    spdx_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentEntry {
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    total_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::FailureKind;
    use yare::parameterized;

    #[parameterized(
        not_found = { 404, None, FailureKind::NotFound },
        unauthorized = { 401, None, FailureKind::AccessDenied },
        forbidden = { 403, Some("12"), FailureKind::AccessDenied },
        rate_limited = { 403, Some("0"), FailureKind::RateLimited },
        too_many = { 429, None, FailureKind::RateLimited },
        server = { 502, None, FailureKind::TransientError },
    )]
    fn test_classify_status(status: u16, remaining: Option<&str>, expected: FailureKind) {
        assert_eq!(classify_status(status, remaining, "x".into()).kind, expected);
    }

    #[parameterized(
        cpp = { "C++", "cpp" },
        csharp = { "C#", "csharp" },
        node = { "Node.js", "nodejs" },
        spring = { "Spring Boot", "spring-boot" },
        aspnet = { "ASP.NET", "aspnet" },
        plain = { "Rust", "rust" },
    )]
    fn test_topic_slug(technology: &str, expected: &str) {
        assert_eq!(topic_slug(technology), expected);
    }

    #[test]
    fn test_repo_response_parsing() {
        let json = r#"{
            "name": "tokio",
            "owner": {"login": "tokio-rs"},
            "html_url": "https://github.com/tokio-rs/tokio",
            "description": "A runtime for writing reliable asynchronous applications",
            "default_branch": "master",
            "stargazers_count": 25000,
            "forks_count": 2300,
            "license": {"key": "mit", "spdx_id": "MIT"}
        }"#;
        let repo: RepoResponse = serde_json::from_str(json).unwrap();
        assert_eq!(repo.owner.login, "tokio-rs");
        assert_eq!(repo.license.and_then(|l| l.spdx_id).as_deref(), Some("MIT"));
    }

    #[test]
    fn test_select_key_files() {
        let json = r#"[
            {"name": ".github", "type": "dir"},
            {"name": "src", "type": "dir"},
            {"name": "Cargo.toml", "type": "file"},
            {"name": "README.md", "type": "file"},
            {"name": "rustfmt.toml", "type": "file"},
            {"name": "Dockerfile", "type": "file"}
        ]"#;
        let entries: Vec<ContentEntry> = serde_json::from_str(json).unwrap();
        assert_eq!(
            select_key_files(entries),
            vec![".github", "Cargo.toml", "README.md", "Dockerfile"]
        );
    }

    #[tokio::test]
    async fn test_analyze_rejects_non_github_url() {
        let client = GitHubClient::new(None, Duration::from_secs(1)).unwrap();
        let err = client.analyze("https://gitlab.com/a/b").await.unwrap_err();
        assert_eq!(err.kind, FailureKind::NotFound);
        assert!(!err.recoverable);
    }
}
