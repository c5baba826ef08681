//! Text scanners for repository links and technology mentions

use regex::Regex;
use std::sync::OnceLock;

const TECHNOLOGIES: &[&str] = &[
    "Python",
    "JavaScript",
    "TypeScript",
    "Java",
    "C#",
    "C++",
    "Go",
    "Rust",
    "React",
    "Angular",
    "Vue",
    "Next.js",
    "Svelte",
    "Node.js",
    "Express",
    "Django",
    "Flask",
    "FastAPI",
    "Spring Boot",
    "ASP.NET",
    "TensorFlow",
    "PyTorch",
    "scikit-learn",
    "Keras",
    "Docker",
    "Kubernetes",
    "AWS",
    "Azure",
    "GCP",
    "PostgreSQL",
    "MySQL",
    "MongoDB",
    "Redis",
    "Elasticsearch",
];

/// Keywords that are also ordinary English words only match with their exact casing
const CASE_SENSITIVE: &[&str] = &["Go", "Rust", "Express", "Vue", "Java"];

fn github_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:https?://)?(?:www\.)?github\.com/([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+)")
            .expect("valid regex")
    })
}

fn technology_patterns() -> &'static [(&'static str, Regex)] {
    static PATTERNS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        TECHNOLOGIES
            .iter()
            .map(|tech| {
                let flags = if CASE_SENSITIVE.contains(tech) { "" } else { "(?i)" };
                let pattern = format!(
                    r"{}(?:^|[^A-Za-z0-9_.+#-]){}(?:$|[^A-Za-z0-9_+#])",
                    flags,
                    regex::escape(tech)
                );
                (*tech, Regex::new(&pattern).expect("valid regex"))
            })
            .collect()
    })
}

/// Canonical `https://github.com/<owner>/<repo>` links found in `text`
///
/// A trailing `.git` is dropped, duplicates are removed case-insensitively and
/// first-seen order is kept.
pub fn github_repository_urls(text: &str) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut urls = Vec::new();

    for caps in github_regex().captures_iter(text) {
        let owner = &caps[1];
        let mut repo = caps[2].trim_end_matches('.');
        if let Some(stripped) = repo.strip_suffix(".git") {
            repo = stripped;
        }
        if owner.is_empty() || repo.is_empty() || is_reserved_owner(owner) {
            continue;
        }

        let url = format!("https://github.com/{}/{}", owner, repo);
        let key = url.to_lowercase();
        if !seen.contains(&key) {
            seen.push(key);
            urls.push(url);
        }
    }

    urls
}

/// GitHub paths that look like `<owner>/<repo>` but are site pages
fn is_reserved_owner(owner: &str) -> bool {
    matches!(
        owner.to_ascii_lowercase().as_str(),
        "features" | "topics" | "marketplace" | "sponsors" | "orgs" | "settings" | "about"
    )
}

/// Splits a repository URL into `(owner, repo)`
pub fn parse_repository_url(url: &str) -> Option<(String, String)> {
    let caps = github_regex().captures(url)?;
    let repo = caps[2].trim_end_matches('.');
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if repo.is_empty() {
        return None;
    }
    Some((caps[1].to_string(), repo.to_string()))
}

/// Known technologies mentioned in `text`, in catalogue order
pub fn technologies(text: &str) -> Vec<String> {
    technology_patterns()
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(name, _)| name.to_string())
        .collect()
}
