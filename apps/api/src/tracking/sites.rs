use std::sync::Arc;

use tracing::{debug, info};

use crate::models::site::{self, JobSite};
use crate::store::{Collection, Cursor, DocumentStore, Filter, FindOptions, Patch, StoreError};

/// Counter values to persist on a site. An absent field is left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatisticsUpdate {
    pub total: Option<u64>,
    pub unseen: Option<u64>,
}

impl StatisticsUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    pub fn unseen(mut self, unseen: u64) -> Self {
        self.unseen = Some(unseen);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.total.is_none() && self.unseen.is_none()
    }

    fn to_patch(self) -> Patch {
        let mut patch = Patch::default();
        if let Some(total) = self.total {
            patch = patch.and_set(site::JOBS_TOTAL, total);
        }
        if let Some(unseen) = self.unseen {
            patch = patch.and_set(site::JOBS_UNSEEN, unseen);
        }
        patch
    }
}

/// Target site access and the cached job counters stored on each site.
#[derive(Clone)]
pub struct SiteRepository {
    sites: Collection<JobSite>,
}

impl SiteRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            sites: Collection::new(store),
        }
    }

    fn by_url(url: &str) -> Filter {
        Filter::eq(site::URL, url)
    }

    pub async fn add_site(&self, site: &JobSite) -> Result<(), StoreError> {
        self.sites.add(site).await?;
        info!("Added site {} ({})", site.title, site.url);
        Ok(())
    }

    /// The single site stored under `url`.
    pub async fn site_for_url(&self, url: &str) -> Result<JobSite, StoreError> {
        self.sites.one(&Self::by_url(url)).await
    }

    pub async fn list(&self, options: &FindOptions) -> Result<Cursor<JobSite>, StoreError> {
        self.sites.all(options).await
    }

    pub async fn count_sites(&self) -> Result<u64, StoreError> {
        self.sites.count(&Filter::All).await
    }

    /// Removes every site document stored under the site's url.
    pub async fn delete_site(&self, site: &JobSite) -> Result<u64, StoreError> {
        self.sites.delete_many(&Self::by_url(&site.url)).await
    }

    /// Persists whichever counters `update` carries. A site that vanished in
    /// the meantime is not an error.
    pub async fn update_jobs_statistics(
        &self,
        site: &JobSite,
        update: StatisticsUpdate,
    ) -> Result<(), StoreError> {
        if update.is_empty() {
            return Ok(());
        }

        self.sites
            .update_one(&Self::by_url(&site.url), &update.to_patch(), false)
            .await?;
        debug!(
            "Updated job statistics of {}: total={:?} unseen={:?}",
            site.url, update.total, update.unseen
        );
        Ok(())
    }
}
