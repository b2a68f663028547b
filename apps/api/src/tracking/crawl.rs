//! Crawl completion reports.
//!
//! The crawler posts its run statistics when it stops. A report turns them into
//! a user-facing outcome message and reconciles the site's job counters, since
//! a crawl may have written job offers while counters were being refreshed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::models::site::{JobSite, JobStatistics};
use crate::store::StoreError;
use crate::tracking::statistics::SiteStatisticsService;

const FINISHED: &str = "finished";

/// Run statistics posted by the crawler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlSummary {
    pub finish_reason: String,
    #[serde(default)]
    pub item_scraped_count: Option<u64>,
    #[serde(default)]
    pub elapsed_time_seconds: f64,
    /// Any further crawler statistics, echoed back in failure messages.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlStatus {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlReport {
    pub status: CrawlStatus,
    pub message: String,
    pub jobs: JobStatistics,
}

impl CrawlSummary {
    pub fn is_finished(&self) -> bool {
        self.finish_reason == FINISHED
    }

    /// The message shown once the crawl of `site_url` stopped.
    pub fn outcome(&self, site_url: &str) -> (CrawlStatus, String) {
        if self.is_finished() {
            let message = format!(
                "Scraped [{}] items in {:?} seconds from [{site_url}]",
                self.item_scraped_count.unwrap_or(0),
                self.elapsed_time_seconds
            );
            (CrawlStatus::Success, message)
        } else {
            let stats = serde_json::to_string(self).unwrap_or_else(|_| self.finish_reason.clone());
            (CrawlStatus::Failure, format!("Crawling failed: {stats}"))
        }
    }
}

/// Builds the report for a finished crawl and reconciles the site's counters.
pub async fn report_crawl(
    statistics: &SiteStatisticsService,
    site: &JobSite,
    summary: &CrawlSummary,
) -> Result<CrawlReport, StoreError> {
    let (status, message) = summary.outcome(&site.url);
    match status {
        CrawlStatus::Success => info!("{message}"),
        CrawlStatus::Failure => warn!("{message}"),
    }

    let jobs = statistics.reconcile(site).await?;
    Ok(CrawlReport {
        status,
        message,
        jobs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::JobOffer;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    fn summary(value: Value) -> CrawlSummary {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_finished_crawl_message() {
        let s = summary(json!({
            "finish_reason": "finished",
            "item_scraped_count": 12,
            "elapsed_time_seconds": 3.5
        }));
        let (status, message) = s.outcome("https://acme.test");
        assert_eq!(status, CrawlStatus::Success);
        assert_eq!(
            message,
            "Scraped [12] items in 3.5 seconds from [https://acme.test]"
        );
    }

    #[test]
    fn test_missing_item_count_reads_as_zero() {
        let s = summary(json!({ "finish_reason": "finished", "elapsed_time_seconds": 1.0 }));
        let (_, message) = s.outcome("https://acme.test");
        assert!(message.starts_with("Scraped [0] items"));
    }

    #[test]
    fn test_whole_seconds_keep_their_decimal() {
        let s = summary(json!({
            "finish_reason": "finished",
            "item_scraped_count": 3,
            "elapsed_time_seconds": 4.0
        }));
        let (_, message) = s.outcome("https://acme.test");
        assert_eq!(
            message,
            "Scraped [3] items in 4.0 seconds from [https://acme.test]"
        );
    }

    #[test]
    fn test_other_finish_reason_is_failure() {
        let s = summary(json!({
            "finish_reason": "closespider_timeout",
            "elapsed_time_seconds": 60.0,
            "log_count/ERROR": 2
        }));
        let (status, message) = s.outcome("https://acme.test");
        assert_eq!(status, CrawlStatus::Failure);
        assert!(message.starts_with("Crawling failed: "));
        assert!(message.contains("closespider_timeout"));
        assert!(message.contains("log_count/ERROR"));
    }

    #[tokio::test]
    async fn test_report_reconciles_counters() {
        let service = SiteStatisticsService::new(Arc::new(MemoryStore::new()));
        let site = JobSite::new("https://acme.test", "Acme");
        service.sites().add_site(&site).await.unwrap();
        service
            .jobs()
            .add_job(&JobOffer::new("https://acme.test/1", &site.url, "One"))
            .await
            .unwrap();

        let s = summary(json!({ "finish_reason": "finished", "item_scraped_count": 1 }));
        let report = report_crawl(&service, &site, &s).await.unwrap();
        assert_eq!(report.status, CrawlStatus::Success);
        assert_eq!(report.jobs, JobStatistics { total: 1, unseen: 1 });
        assert_eq!(
            service.sites().site_for_url(&site.url).await.unwrap().jobs,
            report.jobs
        );
    }
}
