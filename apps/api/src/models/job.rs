use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Document;

pub const URL: &str = "url";
pub const SITE_URL: &str = "site_url";
pub const HIDDEN: &str = "state.hidden";
pub const STORED: &str = "state.stored";

/// A job posting found on a target site. Identity is the posting `url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOffer {
    pub url: String,
    pub site_url: String,
    pub title: String,
    #[serde(with = "ts_milliseconds", default = "Utc::now")]
    pub added: DateTime<Utc>,
    #[serde(default)]
    pub state: JobOfferState,
}

/// Review state of a job offer. The `is_*` flags only track work in progress
/// for the current request and are never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(dead_code)]
pub struct JobOfferState {
    pub seen: bool,
    pub hidden: bool,
    /// A cover letter for this offer has been archived.
    pub stored: bool,
    #[serde(skip)]
    pub is_analyzing: bool,
    #[serde(skip)]
    pub is_composing: bool,
    #[serde(skip)]
    pub is_storing: bool,
}

impl JobOffer {
    pub fn new(
        url: impl Into<String>,
        site_url: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            site_url: site_url.into(),
            title: title.into(),
            added: Utc::now(),
            state: JobOfferState::default(),
        }
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.state.hidden = hidden;
        self
    }
}

impl Document for JobOffer {
    const COLLECTION: &'static str = "job_offers";
    const KEY_FIELD: &'static str = URL;
    const FIELDS: &'static [&'static str] = &["url", "site_url", "title", "added", "state"];

    fn key(&self) -> &str {
        &self.url
    }
}
