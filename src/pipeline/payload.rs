//! Typed payloads produced by each task
//!
//! Every task writes exactly one [`TaskPayload`] variant into the shared
//! context. Downstream tasks read them back through
//! [`TaskInputs`](super::context::TaskInputs).

use super::task::TaskName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub video_id: String,
    pub title: String,
    pub channel_id: String,
    pub channel_title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisOrigin {
    Video,
    DirectRepository,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoAnalysis {
    pub origin: AnalysisOrigin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<VideoMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<Transcript>,
    pub repository_urls: Vec<String>,
    pub technologies: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl VideoAnalysis {
    /// Analysis for a request that names the repository directly
    pub fn direct_repository(url: impl Into<String>) -> Self {
        Self {
            origin: AnalysisOrigin::DirectRepository,
            metadata: None,
            transcript: None,
            repository_urls: vec![url.into()],
            technologies: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildSystem {
    Make,
    Npm,
    Setuptools,
    Pyproject,
    Maven,
    Gradle,
    Cargo,
    Go,
    DockerCompose,
    Docker,
}

impl BuildSystem {
    /// Build files in priority order
    const FILES: [(&'static str, BuildSystem); 10] = [
        ("Makefile", BuildSystem::Make),
        ("package.json", BuildSystem::Npm),
        ("setup.py", BuildSystem::Setuptools),
        ("pyproject.toml", BuildSystem::Pyproject),
        ("pom.xml", BuildSystem::Maven),
        ("build.gradle", BuildSystem::Gradle),
        ("Cargo.toml", BuildSystem::Cargo),
        ("go.mod", BuildSystem::Go),
        ("docker-compose.yml", BuildSystem::DockerCompose),
        ("Dockerfile", BuildSystem::Docker),
    ];

    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::FILES
            .iter()
            .find(|(file, _)| *file == name)
            .map(|(_, system)| *system)
    }

    pub fn is_build_file(name: &str) -> bool {
        Self::from_file_name(name).is_some()
    }

    pub fn commands(self) -> Vec<String> {
        let commands: &[&str] = match self {
            BuildSystem::Make => &["make"],
            BuildSystem::Npm => &["npm install", "npm run build --if-present"],
            BuildSystem::Setuptools => &["python setup.py build"],
            BuildSystem::Pyproject => &["python -m pip wheel --no-deps -w dist ."],
            BuildSystem::Maven => &["mvn -B -q package -DskipTests"],
            BuildSystem::Gradle => &["gradle build -x test"],
            BuildSystem::Cargo => &["cargo build --release"],
            BuildSystem::Go => &["go build ./..."],
            BuildSystem::DockerCompose => &["docker-compose build"],
            BuildSystem::Docker => &["docker build -t reelforge-build ."],
        };
        commands.iter().map(|c| c.to_string()).collect()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BuildSystem::Make => "make",
            BuildSystem::Npm => "npm",
            BuildSystem::Setuptools => "setuptools",
            BuildSystem::Pyproject => "pyproject",
            BuildSystem::Maven => "maven",
            BuildSystem::Gradle => "gradle",
            BuildSystem::Cargo => "cargo",
            BuildSystem::Go => "go",
            BuildSystem::DockerCompose => "docker_compose",
            BuildSystem::Docker => "docker",
        }
    }
}

impl fmt::Display for BuildSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInstructions {
    pub build_system: BuildSystem,
    pub commands: Vec<String>,
}

impl BuildInstructions {
    /// Picks the highest-priority build system present among the repository's
    /// top-level files
    pub fn from_key_files<S: AsRef<str>>(files: &[S]) -> Option<Self> {
        BuildSystem::FILES
            .iter()
            .find(|(file, _)| files.iter().any(|f| f.as_ref() == *file))
            .map(|(_, system)| BuildInstructions {
                build_system: *system,
                commands: system.commands(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub owner: String,
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub default_branch: String,
    pub stars: u64,
    pub forks: u64,
    /// SPDX identifier when GitHub could detect one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    /// Bytes of code per language
    pub languages: BTreeMap<String, u64>,
    pub key_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_instructions: Option<BuildInstructions>,
}

impl RepositoryInfo {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Languages ordered by byte count, largest first
    pub fn ranked_languages(&self) -> Vec<&str> {
        let mut langs: Vec<(&String, &u64)> = self.languages.iter().collect();
        langs.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        langs.into_iter().map(|(name, _)| name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryAnalysis {
    pub repositories: Vec<RepositoryInfo>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl RepositoryAnalysis {
    pub fn primary(&self) -> Option<&RepositoryInfo> {
        self.repositories.first()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStep {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub log_tail: String,
    pub duration_ms: u64,
}

impl BuildStep {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Application kind inferred from manifests in the checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    React,
    Vue,
    Angular,
    Express,
    NextJs,
    Django,
    Flask,
    FastApi,
    Web,
    Generic,
}

impl ProjectType {
    const NODE_PACKAGES: [(&'static str, ProjectType); 6] = [
        ("react", ProjectType::React),
        ("vue", ProjectType::Vue),
        ("@angular/core", ProjectType::Angular),
        ("angular", ProjectType::Angular),
        ("express", ProjectType::Express),
        ("next", ProjectType::NextJs),
    ];

    const PYTHON_PACKAGES: [(&'static str, ProjectType); 3] = [
        ("django", ProjectType::Django),
        ("flask", ProjectType::Flask),
        ("fastapi", ProjectType::FastApi),
    ];

    fn detect(
        has: impl Fn(&str) -> bool,
        manifest: Option<&serde_json::Value>,
        requirements: Option<&str>,
    ) -> Self {
        if let Some(manifest) = manifest {
            let declared = |name: &str| {
                ["dependencies", "devDependencies"]
                    .iter()
                    .any(|section| manifest.get(section).and_then(|d| d.get(name)).is_some())
            };
            if let Some((_, kind)) = Self::NODE_PACKAGES.iter().find(|(name, _)| declared(*name)) {
                return *kind;
            }
        }

        if let Some(requirements) = requirements {
            let requirements = requirements.to_lowercase();
            if let Some((_, kind)) = Self::PYTHON_PACKAGES
                .iter()
                .find(|(name, _)| requirements.contains(*name))
            {
                return *kind;
            }
        }

        if has("index.html") {
            ProjectType::Web
        } else {
            ProjectType::Generic
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectType::React => "react",
            ProjectType::Vue => "vue",
            ProjectType::Angular => "angular",
            ProjectType::Express => "express",
            ProjectType::NextJs => "nextjs",
            ProjectType::Django => "django",
            ProjectType::Flask => "flask",
            ProjectType::FastApi => "fastapi",
            ProjectType::Web => "web",
            ProjectType::Generic => "generic",
        }
    }
}

impl fmt::Display for ProjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the built application is started
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeInfo {
    pub project_type: ProjectType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_command: Option<String>,
}

impl RuntimeInfo {
    /// Infers the run command from top-level file names plus the contents of
    /// `package.json` and `requirements.txt` when they were read
    pub fn detect<S: AsRef<str>>(
        files: &[S],
        package_json: Option<&str>,
        requirements: Option<&str>,
    ) -> Self {
        let has = |name: &str| files.iter().any(|f| f.as_ref() == name);
        let manifest: Option<serde_json::Value> =
            package_json.and_then(|raw| serde_json::from_str(raw).ok());
        let project_type = ProjectType::detect(has, manifest.as_ref(), requirements);

        let run_command = match &manifest {
            Some(manifest) => {
                let manager = if has("yarn.lock") { "yarn" } else { "npm" };
                node_run_command(manifest, manager)
            }
            None => python_run_command(project_type, has).or_else(|| {
                if has("Cargo.toml") {
                    Some("cargo run --release".to_string())
                } else if has("go.mod") {
                    Some("go run .".to_string())
                } else {
                    None
                }
            }),
        };

        Self {
            project_type,
            run_command,
        }
    }
}

fn node_run_command(manifest: &serde_json::Value, manager: &str) -> Option<String> {
    let scripts = manifest.get("scripts")?;
    let script = ["start", "serve", "dev"]
        .into_iter()
        .find(|name| scripts.get(*name).is_some())?;
    Some(match (manager, script) {
        ("npm", "start") => "npm start".to_string(),
        (manager, script) => format!("{} run {}", manager, script),
    })
}

fn python_run_command(project_type: ProjectType, has: impl Fn(&str) -> bool) -> Option<String> {
    match project_type {
        ProjectType::Django => Some("python manage.py runserver 0.0.0.0:8000".to_string()),
        ProjectType::Flask => ["app.py", "main.py", "wsgi.py", "application.py"]
            .into_iter()
            .find(|file| has(*file))
            .map(|file| format!("python {}", file)),
        ProjectType::FastApi => ["main", "app"]
            .into_iter()
            .find(|module| has(format!("{}.py", module).as_str()))
            .map(|module| format!("uvicorn {}:app --host 0.0.0.0", module)),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub repository: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_system: Option<BuildSystem>,
    pub steps: Vec<BuildStep>,
    pub runtime: RuntimeInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace: Option<PathBuf>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthRating {
    High,
    Medium,
    Low,
    Unknown,
}

impl GrowthRating {
    /// Rates a technology from the number of public repositories tagged with it
    pub fn from_repository_count(count: Option<u64>) -> Self {
        match count {
            Some(n) if n >= 50_000 => GrowthRating::High,
            Some(n) if n >= 5_000 => GrowthRating::Medium,
            Some(_) => GrowthRating::Low,
            None => GrowthRating::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnologyTrend {
    pub technology: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popularity_score: Option<u64>,
    pub growth: GrowthRating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopularityLevel {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPopularity {
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub engagement_rate: f64,
    pub level: PopularityLevel,
    pub insights: Vec<String>,
}

impl ContentPopularity {
    pub fn from_metrics(views: u64, likes: u64, comments: u64) -> Self {
        let engagement_rate = if views == 0 {
            0.0
        } else {
            (likes + comments) as f64 / views as f64 * 100.0
        };

        let level = if engagement_rate > 5.0 {
            PopularityLevel::High
        } else if engagement_rate > 2.0 {
            PopularityLevel::Medium
        } else {
            PopularityLevel::Low
        };

        let insights = match level {
            PopularityLevel::High => [
                "High engagement indicates strong audience interest in this content.",
                "Consider creating more content on this topic or related technologies.",
            ],
            PopularityLevel::Medium => [
                "Moderate engagement suggests potential interest in this content.",
                "Consider optimizing content to increase engagement.",
            ],
            PopularityLevel::Low => [
                "Low engagement may indicate limited audience interest in this content.",
                "Consider focusing on more popular topics or improving content quality.",
            ],
        };

        Self {
            views,
            likes,
            comments,
            engagement_rate,
            level,
            insights: insights.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketOpportunity {
    pub technology: String,
    pub description: String,
    pub recommendation: String,
}

impl MarketOpportunity {
    /// Only high and medium growth technologies are worth reporting
    pub fn for_trend(trend: &TechnologyTrend) -> Option<Self> {
        let tech = &trend.technology;
        let (description, recommendation) = match trend.growth {
            GrowthRating::High => (
                format!("Rapidly growing demand for {} solutions", tech),
                format!("Prioritize {} features in monetization strategy", tech),
            ),
            GrowthRating::Medium => (
                format!("Steady growth in {} adoption", tech),
                format!("Include {} as part of broader monetization strategy", tech),
            ),
            GrowthRating::Low | GrowthRating::Unknown => return None,
        };
        Some(Self {
            technology: tech.clone(),
            description,
            recommendation,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub technologies: Vec<TechnologyTrend>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_popularity: Option<ContentPopularity>,
    pub market_opportunities: Vec<MarketOpportunity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_technology: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl TrendReport {
    pub fn new(
        technologies: Vec<TechnologyTrend>,
        content_popularity: Option<ContentPopularity>,
        warnings: Vec<String>,
    ) -> Self {
        let market_opportunities = technologies
            .iter()
            .filter_map(MarketOpportunity::for_trend)
            .collect();
        // max_by_key keeps the last maximum; reverse so ties go to the earliest entry
        let top_technology = technologies
            .iter()
            .rev()
            .filter(|t| t.popularity_score.is_some())
            .max_by_key(|t| t.popularity_score)
            .map(|t| t.technology.clone());

        Self {
            technologies,
            content_popularity,
            market_opportunities,
            top_technology,
            warnings,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyCategory {
    ContentRepurposing,
    EducationalProducts,
    ApplicationDevelopment,
    ConsultingServices,
    AffiliateMarketing,
}

impl StrategyCategory {
    pub fn title(self) -> &'static str {
        match self {
            StrategyCategory::ContentRepurposing => "Content Repurposing",
            StrategyCategory::EducationalProducts => "Educational Products",
            StrategyCategory::ApplicationDevelopment => "Application Development",
            StrategyCategory::ConsultingServices => "Consulting Services",
            StrategyCategory::AffiliateMarketing => "Affiliate Marketing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    pub category: StrategyCategory,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub steps: Vec<String>,
    /// Free-form range such as `"$1,000-$5,000"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_revenue: Option<String>,
    pub priority: Priority,
}

impl Strategy {
    /// Lower bound of the estimated revenue range in dollars; zero when absent
    /// or unparseable
    pub fn revenue_lower_bound(&self) -> f64 {
        self.estimated_revenue
            .as_deref()
            .and_then(parse_revenue_lower_bound)
            .unwrap_or(0.0)
    }
}

fn parse_revenue_lower_bound(text: &str) -> Option<f64> {
    let first = text.split(['-', '–']).next()?.trim();
    let cleaned: String = first
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' ' | '+' | '/'))
        .collect();
    let lower = cleaned.to_ascii_lowercase();
    let (number, multiplier) = if let Some(n) = lower.strip_suffix('k') {
        (n, 1_000.0)
    } else if let Some(n) = lower.strip_suffix('m') {
        (n, 1_000_000.0)
    } else {
        (lower.as_str(), 1.0)
    };
    let digits: String = number
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse::<f64>().ok().map(|n| n * multiplier)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseClass {
    Permissive,
    Copyleft,
    None,
    Unknown,
}

impl LicenseClass {
    pub fn classify(spdx: Option<&str>) -> Self {
        let Some(id) = spdx else {
            return LicenseClass::None;
        };
        let id = id.to_ascii_uppercase();
        if id.is_empty() || id == "NOASSERTION" || id == "OTHER" {
            return LicenseClass::Unknown;
        }
        const PERMISSIVE: [&str; 5] = ["MIT", "APACHE", "BSD", "ISC", "UNLICENSE"];
        const COPYLEFT: [&str; 4] = ["GPL", "AGPL", "LGPL", "MPL"];
        if PERMISSIVE.iter().any(|p| id.starts_with(p)) {
            LicenseClass::Permissive
        } else if COPYLEFT.iter().any(|p| id.starts_with(p)) {
            LicenseClass::Copyleft
        } else {
            LicenseClass::Unknown
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonetizationPlan {
    pub strategies: Vec<Strategy>,
    pub ethical_considerations: Vec<String>,
    pub legal_considerations: Vec<String>,
    pub recommendations: Vec<String>,
    pub license: LicenseClass,
    pub reduced_confidence: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_inputs: Vec<TaskName>,
}

/// Everything the strategy generator gets to look at
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyInput {
    pub video: VideoAnalysis,
    pub repository: RepositoryAnalysis,
    pub trend: TrendReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum TaskPayload {
    Video(VideoAnalysis),
    Repository(RepositoryAnalysis),
    Build(BuildReport),
    Trend(TrendReport),
    Monetization(MonetizationPlan),
}

impl TaskPayload {
    /// The task that produces this kind of payload
    pub fn task(&self) -> TaskName {
        match self {
            TaskPayload::Video(_) => TaskName::VideoAnalysis,
            TaskPayload::Repository(_) => TaskName::RepositoryAnalysis,
            TaskPayload::Build(_) => TaskName::ApplicationBuild,
            TaskPayload::Trend(_) => TaskName::TrendAnalysis,
            TaskPayload::Monetization(_) => TaskName::Monetization,
        }
    }
}
