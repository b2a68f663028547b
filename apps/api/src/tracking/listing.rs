//! Paged site listing and the job overview shown next to it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::site::JobSite;
use crate::store::{Filter, FindOptions, SortDirection, StoreError};
use crate::tracking::jobs::JobOfferRepository;
use crate::tracking::sites::SiteRepository;

pub const DEFAULT_PAGE_SIZE: u64 = 50;
pub const DEFAULT_SORT: &str = "title";

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

fn default_sort() -> String {
    DEFAULT_SORT.to_string()
}

/// Query parameters of `GET /api/v1/sites`. Pages are zero-based.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SitePageRequest {
    #[serde(default)]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    #[serde(default = "default_sort")]
    pub sort: String,
    #[serde(default)]
    pub reverse: bool,
}

impl Default for SitePageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
            sort: default_sort(),
            reverse: false,
        }
    }
}

impl SitePageRequest {
    fn find_options(&self) -> FindOptions {
        let direction = if self.reverse {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        FindOptions::new()
            .skip(self.page.saturating_mul(self.page_size))
            .limit(self.page_size)
            .sort_by(self.sort.to_lowercase(), direction)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SitePage {
    pub sites: Vec<JobSite>,
    pub page: u64,
    pub page_size: u64,
    pub num_sites: u64,
    pub total_pages: u64,
    pub at_beginning: bool,
    pub at_end: bool,
    /// Sites on this page added before the start of yesterday.
    pub num_sites_before_yesterday: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobsOverview {
    pub num_jobs: u64,
    pub num_jobs_before_yesterday: u64,
}

/// Midnight UTC at the start of the day before `now`.
pub fn start_of_yesterday(now: DateTime<Utc>) -> DateTime<Utc> {
    let yesterday = now.date_naive() - Duration::days(1);
    yesterday.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc()
}

pub async fn site_page(
    sites: &SiteRepository,
    request: &SitePageRequest,
) -> Result<SitePage, StoreError> {
    if request.page_size == 0 {
        return Err(StoreError::InvalidQuery(
            "page_size must be at least 1".to_string(),
        ));
    }

    let num_sites = sites.count_sites().await?;
    let listed = sites.list(&request.find_options()).await?.try_collect()?;

    let cutoff = start_of_yesterday(Utc::now());
    let num_sites_before_yesterday = listed
        .iter()
        .filter(|site: &&JobSite| site.added < cutoff)
        .count() as u64;

    Ok(SitePage {
        sites: listed,
        page: request.page,
        page_size: request.page_size,
        num_sites,
        total_pages: num_sites.div_ceil(request.page_size),
        at_beginning: request.page == 0,
        at_end: request
            .page
            .saturating_mul(request.page_size)
            .saturating_add(request.page_size)
            > num_sites,
        num_sites_before_yesterday,
    })
}

pub async fn jobs_overview(jobs: &JobOfferRepository) -> Result<JobsOverview, StoreError> {
    let cutoff = start_of_yesterday(Utc::now()).timestamp_millis();
    Ok(JobsOverview {
        num_jobs: jobs.count_jobs(&Filter::All).await?,
        num_jobs_before_yesterday: jobs.count_jobs(&Filter::lt("added", cutoff)).await?,
    })
}
