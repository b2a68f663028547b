//! Documents produced while preparing an application for a job offer.

use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Document;

/// Raw posting text delivered by the crawler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOfferBody {
    pub url: String,
    pub body: String,
    #[serde(with = "ts_milliseconds", default = "Utc::now")]
    pub added: DateTime<Utc>,
}

impl Document for JobOfferBody {
    const COLLECTION: &'static str = "job_offers_body";
    const KEY_FIELD: &'static str = "url";
    const FIELDS: &'static [&'static str] = &["url", "body", "added"];

    fn key(&self) -> &str {
        &self.url
    }
}

/// Structured reading of a posting, extracted by the LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOfferAnalysis {
    pub url: String,
    pub company_name: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<String>,
    #[serde(with = "ts_milliseconds", default = "Utc::now")]
    pub added: DateTime<Utc>,
}

impl Document for JobOfferAnalysis {
    const COLLECTION: &'static str = "job_offers_analyze";
    const KEY_FIELD: &'static str = "url";
    const FIELDS: &'static [&'static str] = &[
        "url",
        "company_name",
        "title",
        "summary",
        "requirements",
        "tasks",
        "added",
    ];

    fn key(&self) -> &str {
        &self.url
    }
}

/// Composed cover-letter body for a job offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOfferApplication {
    pub url: String,
    pub cover_body: String,
    /// Refinement instructions the body was composed with, if any.
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(with = "ts_milliseconds", default = "Utc::now")]
    pub added: DateTime<Utc>,
}

impl Document for JobOfferApplication {
    const COLLECTION: &'static str = "job_offers_application";
    const KEY_FIELD: &'static str = "url";
    const FIELDS: &'static [&'static str] = &["url", "cover_body", "prompt", "added"];

    fn key(&self) -> &str {
        &self.url
    }
}

/// A cover letter archived in object storage. One job offer may have several.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverLetterDoc {
    pub url: String,
    pub document_id: String,
    pub name: String,
    #[serde(with = "ts_milliseconds", default = "Utc::now")]
    pub added: DateTime<Utc>,
}

impl Document for CoverLetterDoc {
    const COLLECTION: &'static str = "cover_letter_docs";
    const KEY_FIELD: &'static str = "document_id";
    const FIELDS: &'static [&'static str] = &["url", "document_id", "name", "added"];

    fn key(&self) -> &str {
        &self.document_id
    }
}
