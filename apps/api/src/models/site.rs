use chrono::serde::ts_milliseconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Document;

pub const URL: &str = "url";
pub const JOBS_TOTAL: &str = "jobs.total";
pub const JOBS_UNSEEN: &str = "jobs.unseen";

/// A target website crawled for job offers. Identity is the site `url`.
///
/// `jobs` caches aggregates over the site's job offers. It is only refreshed
/// by the statistics service, never computed on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[allow(dead_code)]
pub struct JobSite {
    pub url: String,
    pub title: String,
    #[serde(with = "ts_milliseconds", default = "Utc::now")]
    pub added: DateTime<Utc>,
    /// A crawl is running for this site. Request-local, never persisted.
    #[serde(skip)]
    pub crawling: bool,
    #[serde(default)]
    pub jobs: JobStatistics,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobStatistics {
    pub total: u64,
    pub unseen: u64,
}

impl JobSite {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            added: Utc::now(),
            crawling: false,
            jobs: JobStatistics::default(),
        }
    }
}

impl Document for JobSite {
    const COLLECTION: &'static str = "target_sites";
    const KEY_FIELD: &'static str = "url";
    const FIELDS: &'static [&'static str] = &["url", "title", "added", "jobs"];

    fn key(&self) -> &str {
        &self.url
    }
}
