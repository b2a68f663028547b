use std::sync::Arc;

use tracing::info;

use crate::models::job::{self, JobOffer};
use crate::models::site::JobSite;
use crate::store::{Collection, DocumentStore, Filter, FindOptions, Patch, StoreError};

/// Job offer access: visibility state and per-site queries.
#[derive(Clone)]
pub struct JobOfferRepository {
    jobs: Collection<JobOffer>,
}

impl JobOfferRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            jobs: Collection::new(store),
        }
    }

    fn for_site(site_url: &str) -> Filter {
        Filter::eq(job::SITE_URL, site_url)
    }

    fn by_url(url: &str) -> Filter {
        Filter::eq(job::URL, url)
    }

    pub async fn add_job(&self, job: &JobOffer) -> Result<(), StoreError> {
        self.jobs.add(job).await
    }

    pub async fn job_for_url(&self, url: &str) -> Result<JobOffer, StoreError> {
        self.jobs.one(&Self::by_url(url)).await
    }

    pub async fn jobs_for_site(&self, site_url: &str) -> Result<Vec<JobOffer>, StoreError> {
        self.jobs.filter(&Self::for_site(site_url)).await?.try_collect()
    }

    pub async fn all_jobs(&self) -> Result<Vec<JobOffer>, StoreError> {
        self.jobs.all(&FindOptions::new()).await?.try_collect()
    }

    pub async fn hide_job(&self, job: &JobOffer) -> Result<(), StoreError> {
        self.set_hidden(job, true).await
    }

    pub async fn show_job(&self, job: &JobOffer) -> Result<(), StoreError> {
        self.set_hidden(job, false).await
    }

    async fn set_hidden(&self, job: &JobOffer, hidden: bool) -> Result<(), StoreError> {
        self.jobs
            .update_one(&Self::by_url(&job.url), &Patch::set(job::HIDDEN, hidden), true)
            .await?;
        Ok(())
    }

    /// Marks the offer as having an archived cover letter. Tolerates an offer
    /// that no longer exists.
    pub async fn mark_stored(&self, url: &str) -> Result<(), StoreError> {
        self.jobs
            .update_one(&Self::by_url(url), &Patch::set(job::STORED, true), false)
            .await?;
        Ok(())
    }

    /// Jobs of the site that are not hidden. Offers without a hidden flag count.
    pub async fn count_jobs_unseen_for_site(&self, site: &JobSite) -> Result<u64, StoreError> {
        let filter = Self::for_site(&site.url).and(Filter::ne(job::HIDDEN, true));
        self.jobs.count(&filter).await
    }

    pub async fn count_jobs_total_for_site(&self, site: &JobSite) -> Result<u64, StoreError> {
        self.jobs.count(&Self::for_site(&site.url)).await
    }

    pub async fn count_jobs(&self, filter: &Filter) -> Result<u64, StoreError> {
        self.jobs.count(filter).await
    }

    /// Deletes every job offer of the site and returns how many were removed.
    pub async fn clear_jobs_for_site(&self, site: &JobSite) -> Result<u64, StoreError> {
        let deleted = self.jobs.delete_many(&Self::for_site(&site.url)).await?;
        info!("Deleted {deleted} job offers of {}", site.url);
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const SITE: &str = "https://acme.test";

    async fn repository() -> JobOfferRepository {
        let repo = JobOfferRepository::new(Arc::new(MemoryStore::new()));
        let jobs = [
            JobOffer::new("https://acme.test/1", SITE, "Backend"),
            JobOffer::new("https://acme.test/2", SITE, "Frontend").with_hidden(true),
            JobOffer::new("https://other.test/1", "https://other.test", "Ops"),
        ];
        for job in &jobs {
            repo.add_job(job).await.unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn test_counts_are_scoped_to_site() {
        let repo = repository().await;
        let site = JobSite::new(SITE, "Acme");
        assert_eq!(repo.count_jobs_total_for_site(&site).await.unwrap(), 2);
        assert_eq!(repo.count_jobs_unseen_for_site(&site).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_hide_and_show_persist_flag() {
        let repo = repository().await;
        let job = repo.job_for_url("https://acme.test/1").await.unwrap();

        repo.hide_job(&job).await.unwrap();
        assert!(repo.job_for_url(&job.url).await.unwrap().state.hidden);

        repo.show_job(&job).await.unwrap();
        assert!(!repo.job_for_url(&job.url).await.unwrap().state.hidden);
    }

    #[tokio::test]
    async fn test_hide_unknown_job_is_not_found() {
        let repo = repository().await;
        let ghost = JobOffer::new("https://acme.test/404", SITE, "Ghost");
        let err = repo.hide_job(&ghost).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_clear_jobs_leaves_other_sites() {
        let repo = repository().await;
        let site = JobSite::new(SITE, "Acme");
        assert_eq!(repo.clear_jobs_for_site(&site).await.unwrap(), 2);
        assert!(repo.jobs_for_site(SITE).await.unwrap().is_empty());
        assert_eq!(repo.all_jobs().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mark_stored_tolerates_missing_job() {
        let repo = repository().await;
        repo.mark_stored("https://acme.test/404").await.unwrap();
        repo.mark_stored("https://acme.test/1").await.unwrap();
        assert!(repo.job_for_url("https://acme.test/1").await.unwrap().state.stored);
    }
}
