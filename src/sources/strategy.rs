//! Monetization strategy generation through an LLM

use super::error::SourceError;
use super::StrategyGenerator;
use crate::llm::{extract_json_from_markdown, ChatMessage, LLMClient, LLMRequest};
use crate::pipeline::{Priority, Strategy, StrategyCategory, StrategyInput};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

const SYSTEM_PROMPT: &str = "You are a monetization strategist for technical content creators. \
You only propose ethical and legal strategies that respect the original creators' rights.";

const MAX_DESCRIPTION_CHARS: usize = 600;

pub struct LlmStrategyGenerator {
    client: Arc<dyn LLMClient>,
    max_tokens: u32,
}

impl LlmStrategyGenerator {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self {
            client,
            max_tokens: 2048,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl StrategyGenerator for LlmStrategyGenerator {
    async fn generate(&self, input: &StrategyInput) -> Result<Vec<Strategy>, SourceError> {
        let start = Instant::now();
        let request = LLMRequest::new(vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_prompt(input)),
        ])
        .with_temperature(0.2)
        .with_max_tokens(self.max_tokens);

        let response = self.client.chat(request).await?;
        debug!(
            backend = self.client.name(),
            response_ms = response.response_time.as_millis() as u64,
            "Strategy generator responded"
        );

        let strategies = parse_strategies(&response.content)?;
        info!(
            count = strategies.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Generated monetization strategies"
        );
        Ok(strategies)
    }
}

fn build_prompt(input: &StrategyInput) -> String {
    let video = input.video.metadata.as_ref().map(|m| {
        json!({
            "title": m.title,
            "channel": m.channel_title,
            "description": truncate(&m.description, MAX_DESCRIPTION_CHARS),
            "views": m.view_count,
            "likes": m.like_count,
            "tags": m.tags,
        })
    });

    let repositories: Vec<_> = input
        .repository
        .repositories
        .iter()
        .map(|r| {
            json!({
                "name": r.full_name(),
                "description": r.description,
                "stars": r.stars,
                "license": r.license,
                "languages": r.ranked_languages().into_iter().take(5).collect::<Vec<_>>(),
            })
        })
        .collect();

    let build = input.build.as_ref().map(|b| {
        json!({
            "build_system": b.build_system,
            "steps": b.steps.len(),
            "succeeded": b.steps.iter().all(|s| s.succeeded()),
        })
    });

    let context = json!({
        "video": video,
        "technologies": input.video.technologies,
        "repositories": repositories,
        "top_technology": input.trend.top_technology,
        "market_opportunities": input.trend.market_opportunities,
        "engagement": input.trend.content_popularity.as_ref().map(|p| p.level),
        "build": build,
    });

    format!(
        "Analyze this content and propose monetization strategies.\n\n\
         Context:\n{}\n\n\
         Respond with a JSON array only. Each element must have:\n\
         - \"category\": one of content_repurposing, educational_products, application_development, consulting_services, affiliate_marketing\n\
         - \"title\": short title\n\
         - \"description\": one or two sentences\n\
         - \"steps\": array of concrete steps\n\
         - \"estimated_revenue\": a range such as \"$1,000-$5,000\"\n\
         - \"priority\": high, medium or low\n\
         Propose at least one strategy per category.",
        serde_json::to_string_pretty(&context).unwrap_or_default()
    )
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[derive(Debug, Deserialize)]
struct RawStrategy {
    category: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    steps: Vec<String>,
    estimated_revenue: Option<String>,
    priority: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawResponse {
    List(Vec<RawStrategy>),
    Wrapped { strategies: Vec<RawStrategy> },
}

/// Parses model output into strategies
///
/// Malformed output is reported as a recoverable transient error because a
/// second sample from the model may well be valid.
fn parse_strategies(content: &str) -> Result<Vec<Strategy>, SourceError> {
    let json = extract_json_from_markdown(content);
    let raw = match serde_json::from_str::<RawResponse>(json) {
        Ok(RawResponse::List(list)) | Ok(RawResponse::Wrapped { strategies: list }) => list,
        Err(e) => {
            return Err(SourceError::transient(format!(
                "strategy generator returned malformed JSON: {}",
                e
            )))
        }
    };

    let strategies: Vec<Strategy> = raw
        .into_iter()
        .filter_map(|r| {
            let Some(category) = parse_category(&r.category) else {
                warn!(category = %r.category, title = %r.title, "Dropping strategy with unknown category");
                return None;
            };
            Some(Strategy {
                category,
                title: r.title,
                description: r.description,
                steps: r.steps,
                estimated_revenue: r.estimated_revenue,
                priority: parse_priority(r.priority.as_deref()),
            })
        })
        .collect();

    if strategies.is_empty() {
        return Err(SourceError::transient(
            "strategy generator returned no usable strategies",
        ));
    }
    Ok(strategies)
}

fn normalize(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .replace([' ', '-'], "_")
}

fn parse_category(label: &str) -> Option<StrategyCategory> {
    match normalize(label).as_str() {
        "content_repurposing" => Some(StrategyCategory::ContentRepurposing),
        "educational_products" | "educational_product" | "education" => {
            Some(StrategyCategory::EducationalProducts)
        }
        "application_development" | "app_development" => {
            Some(StrategyCategory::ApplicationDevelopment)
        }
        "consulting_services" | "consulting" => Some(StrategyCategory::ConsultingServices),
        "affiliate_marketing" | "affiliate" => Some(StrategyCategory::AffiliateMarketing),
        _ => None,
    }
}

fn parse_priority(label: Option<&str>) -> Priority {
    match label.map(normalize).as_deref() {
        Some("high") => Priority::High,
        Some("low") => Priority::Low,
        _ => Priority::Medium,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{BackendError, MockLLMClient, MockResponse};
    use crate::pipeline::{FailureKind, RepositoryAnalysis, TrendReport, VideoAnalysis};

    fn input() -> StrategyInput {
        StrategyInput {
            video: VideoAnalysis::direct_repository("https://github.com/a/b"),
            repository: RepositoryAnalysis {
                repositories: vec![],
                warnings: vec![],
            },
            trend: TrendReport::new(vec![], None, vec![]),
            build: None,
        }
    }

    const FENCED: &str = r#"Sure! Here are some ideas:
```json
[
  {"category": "Consulting Services", "title": "Integration consulting",
   "description": "Help teams adopt the tool", "steps": ["Publish case study"],
   "estimated_revenue": "$5,000-$20,000", "priority": "High"},
  {"category": "affiliate_marketing", "title": "Hosting referrals",
   "description": "Recommend hosting", "priority": "low"},
  {"category": "crypto", "title": "Launch a token"}
]
```"#;

    #[test]
    fn test_parse_fenced_strategies() {
        let strategies = parse_strategies(FENCED).unwrap();
        assert_eq!(strategies.len(), 2);
        assert_eq!(strategies[0].category, StrategyCategory::ConsultingServices);
        assert_eq!(strategies[0].priority, Priority::High);
        assert_eq!(strategies[1].priority, Priority::Low);
        assert!(strategies[1].estimated_revenue.is_none());
    }

    #[test]
    fn test_parse_wrapped_object() {
        let content = r#"{"strategies": [{"category": "education", "title": "Course"}]}"#;
        let strategies = parse_strategies(content).unwrap();
        assert_eq!(strategies[0].category, StrategyCategory::EducationalProducts);
        assert_eq!(strategies[0].priority, Priority::Medium);
    }

    #[test]
    fn test_malformed_output_is_recoverable() {
        let err = parse_strategies("I cannot help with that").unwrap_err();
        assert_eq!(err.kind, FailureKind::TransientError);
        assert!(err.recoverable);
    }

    #[test]
    fn test_no_usable_strategies_is_recoverable() {
        let err = parse_strategies(r#"[{"category": "crypto", "title": "x"}]"#).unwrap_err();
        assert!(err.recoverable);
    }

    #[tokio::test]
    async fn test_generate_uses_llm_client() {
        let client = Arc::new(MockLLMClient::new());
        client.add_response(MockResponse::text(FENCED));
        let generator = LlmStrategyGenerator::new(client.clone());

        let strategies = generator.generate(&input()).await.unwrap();
        assert_eq!(strategies.len(), 2);

        let prompts = client.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("monetization strategies"));
    }

    #[tokio::test]
    async fn test_backend_rate_limit_maps_to_rate_limited() {
        let client = Arc::new(MockLLMClient::new());
        client.add_response(MockResponse::error(BackendError::RateLimitError {
            retry_after: Some(10),
        }));
        let generator = LlmStrategyGenerator::new(client);

        let err = generator.generate(&input()).await.unwrap_err();
        assert_eq!(err.kind, FailureKind::RateLimited);
        assert!(err.recoverable);
    }
}
