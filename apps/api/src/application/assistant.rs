//! Application assistant: the LLM seam behind job offer analysis and
//! cover-letter composition.
//!
//! `AppState` holds an `Arc<dyn ApplicationAssistant>`. The default backend is
//! `LlmApplicationAssistant`; tests swap in a canned implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::application::prompts::{
    ANALYZE_PROMPT_TEMPLATE, ANALYZE_SYSTEM, COMPOSE_PROMPT_TEMPLATE, COMPOSE_SYSTEM,
    REFINEMENT_TEMPLATE,
};
use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::models::application::JobOfferAnalysis;

/// What the assistant reads out of a job posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedAnalysis {
    pub company_name: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ComposedLetter {
    cover_body: String,
}

#[async_trait]
pub trait ApplicationAssistant: Send + Sync {
    async fn analyze(&self, job_body: &str) -> Result<ExtractedAnalysis, AppError>;

    /// Writes a cover-letter body for the analysed offer, optionally refined by
    /// free-text instructions.
    async fn compose(
        &self,
        analysis: &JobOfferAnalysis,
        refinement: Option<&str>,
    ) -> Result<String, AppError>;
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "- (none listed)".to_string();
    }
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn analyze_prompt(job_body: &str) -> String {
    ANALYZE_PROMPT_TEMPLATE.replace("{job_body}", job_body)
}

fn compose_prompt(analysis: &JobOfferAnalysis, refinement: Option<&str>) -> String {
    let refinement = refinement
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|r| REFINEMENT_TEMPLATE.replace("{prompt}", r))
        .unwrap_or_default();

    COMPOSE_PROMPT_TEMPLATE
        .replace("{company_name}", &analysis.company_name)
        .replace("{title}", &analysis.title)
        .replace("{summary}", &analysis.summary)
        .replace("{requirements}", &bullet_list(&analysis.requirements))
        .replace("{tasks}", &bullet_list(&analysis.tasks))
        .replace("{refinement}", &refinement)
}

pub struct LlmApplicationAssistant {
    llm: LlmClient,
}

impl LlmApplicationAssistant {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ApplicationAssistant for LlmApplicationAssistant {
    async fn analyze(&self, job_body: &str) -> Result<ExtractedAnalysis, AppError> {
        self.llm
            .call_json::<ExtractedAnalysis>(&analyze_prompt(job_body), ANALYZE_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(format!("Job offer analysis failed: {e}")))
    }

    async fn compose(
        &self,
        analysis: &JobOfferAnalysis,
        refinement: Option<&str>,
    ) -> Result<String, AppError> {
        let letter = self
            .llm
            .call_json::<ComposedLetter>(&compose_prompt(analysis, refinement), COMPOSE_SYSTEM)
            .await
            .map_err(|e| AppError::Llm(format!("Cover letter composition failed: {e}")))?;
        Ok(letter.cover_body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn analysis() -> JobOfferAnalysis {
        JobOfferAnalysis {
            url: "https://acme.test/jobs/1".to_string(),
            company_name: "Acme".to_string(),
            title: "Rust Engineer".to_string(),
            summary: "Build the billing platform.".to_string(),
            requirements: vec!["Rust".to_string(), "Postgres".to_string()],
            tasks: vec![],
            added: Utc::now(),
        }
    }

    #[test]
    fn test_analyze_prompt_embeds_body() {
        let prompt = analyze_prompt("We are hiring a Rust engineer.");
        assert!(prompt.ends_with("We are hiring a Rust engineer."));
        assert!(!prompt.contains("{job_body}"));
    }

    #[test]
    fn test_compose_prompt_fills_every_placeholder() {
        let prompt = compose_prompt(&analysis(), None);
        assert!(prompt.contains("COMPANY: Acme"));
        assert!(prompt.contains("- Rust\n- Postgres"));
        assert!(prompt.contains("- (none listed)"));
        for placeholder in ["{company_name}", "{title}", "{tasks}", "{refinement}"] {
            assert!(!prompt.contains(placeholder), "{placeholder} left in prompt");
        }
        assert!(!prompt.contains("additional instructions"));
    }

    #[test]
    fn test_compose_prompt_with_refinement() {
        let prompt = compose_prompt(&analysis(), Some("  Mention open source work. "));
        assert!(prompt.contains("additional instructions: Mention open source work."));
    }

    #[test]
    fn test_blank_refinement_is_ignored() {
        let prompt = compose_prompt(&analysis(), Some("   "));
        assert!(!prompt.contains("additional instructions"));
    }

    #[test]
    fn test_extracted_analysis_tolerates_missing_lists() {
        let parsed: ExtractedAnalysis =
            serde_json::from_str(r#"{"company_name": "Acme", "title": "Dev"}"#).unwrap();
        assert!(parsed.requirements.is_empty());
        assert!(parsed.summary.is_empty());
    }
}
