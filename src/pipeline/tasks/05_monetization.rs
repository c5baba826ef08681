use crate::pipeline::context::TaskInputs;
use crate::pipeline::payload::{
    LicenseClass, MonetizationPlan, Strategy, StrategyCategory, StrategyInput, TaskPayload,
};
use crate::pipeline::result::{TaskFailure, TaskResult};
use crate::pipeline::task::TaskName;
use crate::sources::StrategyGenerator;
use std::sync::Arc;
use tracing::{debug, info};

const GENERAL_ETHICS: [&str; 5] = [
    "Respect the original creator's intellectual property rights",
    "Give proper attribution to the original creators",
    "Ensure that monetization strategies do not mislead users about the relationship with the original project",
    "Be transparent about any modifications made to the original code",
    "Consider the impact of monetization on the open-source community",
];

const GENERAL_LEGAL: [&str; 5] = [
    "Comply with the terms of the repository's license",
    "Ensure that monetization strategies do not infringe on trademarks or patents",
    "Adhere to relevant data protection and privacy laws",
    "Comply with platform-specific terms of service for content distribution",
    "Consider tax implications of monetization strategies",
];

const NO_LICENSE: &str =
    "The repository does not have a clear license, which may limit monetization options";
const CLARIFY_LICENSE: &str =
    "Contact the repository owner to clarify licensing terms before monetization";
const KEEP_NOTICE: &str = "Include the original license and copyright notice in any distribution";

pub struct MonetizationTask {
    strategist: Arc<dyn StrategyGenerator>,
}

impl MonetizationTask {
    pub fn new(strategist: Arc<dyn StrategyGenerator>) -> Self {
        Self { strategist }
    }

    pub async fn execute(&self, inputs: &TaskInputs) -> TaskResult {
        match self.plan(inputs).await {
            Ok(plan) => TaskResult::Success(TaskPayload::Monetization(plan)),
            Err(failure) => TaskResult::Failure(failure),
        }
    }

    async fn plan(&self, inputs: &TaskInputs) -> Result<MonetizationPlan, TaskFailure> {
        let input = StrategyInput {
            video: inputs.require_video()?.clone(),
            repository: inputs.require_repository()?.clone(),
            trend: inputs.require_trend()?.clone(),
            build: inputs.build().cloned(),
        };
        let reduced_confidence = input.build.is_none();
        if reduced_confidence {
            info!("Build data unavailable, planning with reduced confidence");
        }

        let mut strategies = self.strategist.generate(&input).await?;
        rank_strategies(&mut strategies);

        let license_id = input.repository.primary().and_then(|r| r.license.as_deref());
        let license = LicenseClass::classify(license_id);

        let mut recommendations = Vec::new();
        let ethical_considerations = ethical_considerations(&strategies, license, &mut recommendations);
        let legal_considerations =
            legal_considerations(&strategies, license_id, license, &mut recommendations);
        if reduced_confidence {
            recommendations.push(
                "Build the application to validate the development strategies; they were ranked without build results"
                    .to_string(),
            );
        }

        debug!(
            strategies = strategies.len(),
            license = ?license,
            reduced_confidence,
            "Monetization plan assembled"
        );

        Ok(MonetizationPlan {
            strategies,
            ethical_considerations,
            legal_considerations,
            recommendations,
            license,
            reduced_confidence,
            missing_inputs: if reduced_confidence {
                vec![TaskName::ApplicationBuild]
            } else {
                Vec::new()
            },
        })
    }
}

/// Highest estimated revenue first, then highest priority. Equal strategies
/// keep the generator's order.
fn rank_strategies(strategies: &mut [Strategy]) {
    strategies.sort_by(|a, b| {
        b.revenue_lower_bound()
            .total_cmp(&a.revenue_lower_bound())
            .then_with(|| b.priority.cmp(&a.priority))
    });
}

fn categories(strategies: &[Strategy]) -> Vec<StrategyCategory> {
    let mut seen = Vec::new();
    for strategy in strategies {
        if !seen.contains(&strategy.category) {
            seen.push(strategy.category);
        }
    }
    seen
}

fn ethical_considerations(
    strategies: &[Strategy],
    license: LicenseClass,
    recommendations: &mut Vec<String>,
) -> Vec<String> {
    let mut lines: Vec<String> = GENERAL_ETHICS.iter().map(|s| s.to_string()).collect();
    if license == LicenseClass::None {
        lines.push(NO_LICENSE.to_string());
        push_unique(recommendations, CLARIFY_LICENSE);
    } else {
        lines.push("Adhere to the specific terms of the repository's license".to_string());
    }

    for category in categories(strategies) {
        lines.push(
            match category {
                StrategyCategory::ContentRepurposing => {
                    "Ensure that content repurposing does not misrepresent the original content"
                }
                StrategyCategory::EducationalProducts => {
                    "Clearly distinguish between original content and added educational material"
                }
                StrategyCategory::ApplicationDevelopment => {
                    "Respect the terms of the license for derivative works"
                }
                StrategyCategory::ConsultingServices => {
                    "Be transparent about the relationship with the original project"
                }
                StrategyCategory::AffiliateMarketing => "Disclose affiliate relationships to users",
            }
            .to_string(),
        );
    }
    lines
}

fn legal_considerations(
    strategies: &[Strategy],
    license_id: Option<&str>,
    license: LicenseClass,
    recommendations: &mut Vec<String>,
) -> Vec<String> {
    let mut lines: Vec<String> = GENERAL_LEGAL.iter().map(|s| s.to_string()).collect();

    let family = license_id.map(|id| id.to_ascii_uppercase());
    match (license, family.as_deref()) {
        (LicenseClass::None, _) | (_, None) => {
            lines.push(NO_LICENSE.to_string());
            push_unique(recommendations, CLARIFY_LICENSE);
        }
        (_, Some(id)) if id.starts_with("MIT") => {
            lines.push("MIT License allows commercial use with attribution".to_string());
            push_unique(recommendations, KEEP_NOTICE);
        }
        (_, Some(id)) if id.starts_with("APACHE") => {
            lines.extend([
                "Apache License allows commercial use with attribution".to_string(),
                "Must include a copy of the license in any distribution".to_string(),
                "Must state changes made to the original code".to_string(),
            ]);
        }
        (LicenseClass::Copyleft, Some(id)) if id.starts_with("MPL") => {
            lines.extend([
                "Mozilla Public License requires modifications to be released under the same license"
                    .to_string(),
                "Can combine with proprietary code under certain conditions".to_string(),
            ]);
        }
        (LicenseClass::Copyleft, Some(_)) => {
            lines.extend([
                "GPL requires derivative works to be distributed under the same license".to_string(),
                "Source code of derivative works must be made available".to_string(),
            ]);
            push_unique(
                recommendations,
                "Consider consulting with a legal expert before monetizing GPL-licensed code",
            );
        }
        (_, Some(id)) if id.starts_with("BSD") => {
            lines.push("BSD License allows commercial use with attribution".to_string());
            push_unique(recommendations, KEEP_NOTICE);
        }
        (_, Some(_)) => {
            lines.push(
                "The repository has a license, but the type could not be determined".to_string(),
            );
            push_unique(
                recommendations,
                "Review the license carefully or consult with a legal expert before monetization",
            );
        }
    }

    for category in categories(strategies) {
        let [first, second] = match category {
            StrategyCategory::ContentRepurposing => [
                "Ensure that content repurposing complies with copyright law",
                "Consider fair use/fair dealing provisions for educational content",
            ],
            StrategyCategory::EducationalProducts => [
                "Comply with educational licensing requirements",
                "Consider trademark issues when referencing technologies",
            ],
            StrategyCategory::ApplicationDevelopment => [
                "Ensure that derivative applications comply with the original license",
                "Consider patent implications for commercial applications",
            ],
            StrategyCategory::ConsultingServices => [
                "Clearly define the scope of consulting services in contracts",
                "Consider non-disclosure agreements for client projects",
            ],
            StrategyCategory::AffiliateMarketing => [
                "Comply with disclosure requirements for affiliate marketing",
                "Adhere to platform-specific affiliate marketing policies",
            ],
        };
        lines.push(first.to_string());
        lines.push(second.to_string());
    }
    lines
}

fn push_unique(lines: &mut Vec<String>, line: &str) {
    if !lines.iter().any(|l| l == line) {
        lines.push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::payload::{Priority, RepositoryAnalysis, TrendReport, VideoAnalysis};
    use crate::pipeline::request::Request;
    use crate::pipeline::FailureKind;
    use crate::sources::mock::{
        sample_build_report, sample_repository, sample_strategies, MockStrategyGenerator,
    };
    use crate::sources::SourceError;

    const URL: &str = "https://github.com/octo/app";

    fn inputs(license: Option<&str>, with_build: bool) -> TaskInputs {
        let mut repository = sample_repository(URL);
        repository.license = license.map(str::to_string);
        let mut inputs = TaskInputs::new(Request::video("abc123"))
            .with_payload(TaskPayload::Video(VideoAnalysis::direct_repository(URL)))
            .with_payload(TaskPayload::Repository(RepositoryAnalysis {
                repositories: vec![repository],
                warnings: vec![],
            }))
            .with_payload(TaskPayload::Trend(TrendReport::new(vec![], None, vec![])));
        if with_build {
            inputs = inputs.with_payload(TaskPayload::Build(sample_build_report(URL)));
        }
        inputs
    }

    fn plan(result: TaskResult) -> MonetizationPlan {
        match result {
            TaskResult::Success(TaskPayload::Monetization(plan)) => plan,
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_rank_by_revenue_then_priority() {
        let mut strategies = sample_strategies();
        rank_strategies(&mut strategies);
        let titles: Vec<_> = strategies.iter().map(|s| s.title.as_str()).collect();
        // Course and consulting tie on $2,000; course has the higher priority
        assert_eq!(
            titles,
            vec!["Video course", "Adoption consulting", "Hosting referrals"]
        );
    }

    #[test]
    fn test_rank_is_stable_for_equal_strategies() {
        let mut strategies = sample_strategies();
        for s in &mut strategies {
            s.estimated_revenue = None;
            s.priority = Priority::Medium;
        }
        let before: Vec<_> = strategies.iter().map(|s| s.title.clone()).collect();
        rank_strategies(&mut strategies);
        let after: Vec<_> = strategies.iter().map(|s| s.title.clone()).collect();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_full_plan_with_mit_license() {
        let generator = Arc::new(MockStrategyGenerator::default());
        let task = MonetizationTask::new(generator.clone());

        let plan = plan(task.execute(&inputs(Some("MIT"), true)).await);
        assert!(!plan.reduced_confidence);
        assert!(plan.missing_inputs.is_empty());
        assert_eq!(plan.license, LicenseClass::Permissive);
        assert_eq!(plan.strategies[0].title, "Video course");
        assert!(plan
            .legal_considerations
            .contains(&"MIT License allows commercial use with attribution".to_string()));
        assert!(plan.recommendations.contains(&KEEP_NOTICE.to_string()));
        assert!(generator.last_input().unwrap().build.is_some());
    }

    #[tokio::test]
    async fn test_missing_build_reduces_confidence() {
        let generator = Arc::new(MockStrategyGenerator::default());
        let task = MonetizationTask::new(generator.clone());

        let plan = plan(task.execute(&inputs(Some("MIT"), false)).await);
        assert!(plan.reduced_confidence);
        assert_eq!(plan.missing_inputs, vec![TaskName::ApplicationBuild]);
        assert!(generator.last_input().unwrap().build.is_none());
    }

    #[tokio::test]
    async fn test_unlicensed_repository() {
        let task = MonetizationTask::new(Arc::new(MockStrategyGenerator::default()));
        let plan = plan(task.execute(&inputs(None, true)).await);
        assert_eq!(plan.license, LicenseClass::None);
        assert!(plan.ethical_considerations.contains(&NO_LICENSE.to_string()));
        assert!(plan.legal_considerations.contains(&NO_LICENSE.to_string()));
        // Recommended once even though both evaluations flag it
        assert_eq!(
            plan.recommendations
                .iter()
                .filter(|r| r.as_str() == CLARIFY_LICENSE)
                .count(),
            1
        );
    }

    #[tokio::test]
    async fn test_copyleft_license() {
        let task = MonetizationTask::new(Arc::new(MockStrategyGenerator::default()));
        let plan = plan(task.execute(&inputs(Some("GPL-3.0"), true)).await);
        assert_eq!(plan.license, LicenseClass::Copyleft);
        assert!(plan.legal_considerations.iter().any(|l| l.starts_with("GPL requires")));
    }

    #[tokio::test]
    async fn test_category_specific_lines() {
        let task = MonetizationTask::new(Arc::new(MockStrategyGenerator::default()));
        let plan = plan(task.execute(&inputs(Some("Apache-2.0"), true)).await);
        assert!(plan
            .ethical_considerations
            .contains(&"Disclose affiliate relationships to users".to_string()));
        assert!(plan
            .legal_considerations
            .contains(&"Consider non-disclosure agreements for client projects".to_string()));
        assert!(plan
            .legal_considerations
            .contains(&"Must state changes made to the original code".to_string()));
    }

    #[tokio::test]
    async fn test_generator_failure_maps_to_task_failure() {
        let generator = MockStrategyGenerator::new();
        generator.push(Err(SourceError::rate_limited("too many requests")));
        let task = MonetizationTask::new(Arc::new(generator));

        let result = task.execute(&inputs(Some("MIT"), true)).await;
        let failure = result.failure().unwrap();
        assert_eq!(failure.kind, FailureKind::RateLimited);
        assert!(failure.recoverable);
    }

    #[tokio::test]
    async fn test_missing_trend_is_configuration_error() {
        let task = MonetizationTask::new(Arc::new(MockStrategyGenerator::default()));
        let inputs = TaskInputs::new(Request::video("abc123"))
            .with_payload(TaskPayload::Video(VideoAnalysis::direct_repository(URL)));
        let result = task.execute(&inputs).await;
        assert_eq!(
            result.failure().map(|f| f.kind),
            Some(FailureKind::ConfigurationError)
        );
    }
}
