//! Site statistics reconciliation.
//!
//! Every job mutation goes through `SiteStatisticsService`, which performs the
//! mutation and then refreshes the cached counters on the owning site:
//!
//! | operation  | counters written            |
//! |------------|-----------------------------|
//! | add_job    | total + unseen (recounted)  |
//! | hide/show  | unseen (recounted)          |
//! | clear_jobs | total = 0, unseen = 0       |
//! | delete     | none, the site is removed   |
//!
//! The steps are not transactional. A failed counter write leaves the job
//! mutation in place and `reconcile` repairs the counters later.

use std::sync::Arc;

use tracing::info;

use crate::models::job::JobOffer;
use crate::models::site::{JobSite, JobStatistics};
use crate::store::{DocumentStore, StoreError};
use crate::tracking::jobs::JobOfferRepository;
use crate::tracking::sites::{SiteRepository, StatisticsUpdate};

#[derive(Clone)]
pub struct SiteStatisticsService {
    jobs: JobOfferRepository,
    sites: SiteRepository,
}

impl SiteStatisticsService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            jobs: JobOfferRepository::new(Arc::clone(&store)),
            sites: SiteRepository::new(store),
        }
    }

    pub fn jobs(&self) -> &JobOfferRepository {
        &self.jobs
    }

    pub fn sites(&self) -> &SiteRepository {
        &self.sites
    }

    /// Inserts the job, then recounts both counters of its site.
    pub async fn add_job(&self, job: &JobOffer) -> Result<(), StoreError> {
        self.jobs.add_job(job).await?;
        info!("Added job {} for {}", job.url, job.site_url);
        self.update_statistics_for_job_site(job).await
    }

    /// Always recounts `unseen`, even when the job was already hidden.
    pub async fn hide_job(&self, job: &JobOffer) -> Result<(), StoreError> {
        self.jobs.hide_job(job).await?;
        info!("Hid job {}", job.url);
        self.update_unseen_for_job_site(job).await
    }

    pub async fn show_job(&self, job: &JobOffer) -> Result<(), StoreError> {
        self.jobs.show_job(job).await?;
        info!("Showed job {}", job.url);
        self.update_unseen_for_job_site(job).await
    }

    /// Deletes all jobs of the site and zeroes its counters without recounting.
    pub async fn clear_jobs(&self, site: &JobSite) -> Result<u64, StoreError> {
        let deleted = self.jobs.clear_jobs_for_site(site).await?;
        self.sites
            .update_jobs_statistics(site, StatisticsUpdate::new().total(0).unseen(0))
            .await?;
        Ok(deleted)
    }

    /// Cascade delete: the site's jobs first, then the site itself. Returns the
    /// number of deleted jobs.
    pub async fn delete(&self, site: &JobSite) -> Result<u64, StoreError> {
        let deleted_jobs = self.jobs.clear_jobs_for_site(site).await?;
        let deleted_sites = self.sites.delete_site(site).await?;
        info!(
            "Deleted site {} ({deleted_sites} documents) and {deleted_jobs} jobs",
            site.url
        );
        Ok(deleted_jobs)
    }

    /// Recounts and persists both counters of the site.
    pub async fn reconcile(&self, site: &JobSite) -> Result<JobStatistics, StoreError> {
        let statistics = JobStatistics {
            total: self.jobs.count_jobs_total_for_site(site).await?,
            unseen: self.jobs.count_jobs_unseen_for_site(site).await?,
        };
        self.sites
            .update_jobs_statistics(
                site,
                StatisticsUpdate::new()
                    .total(statistics.total)
                    .unseen(statistics.unseen),
            )
            .await?;
        Ok(statistics)
    }

    async fn update_statistics_for_job_site(&self, job: &JobOffer) -> Result<(), StoreError> {
        let site = self.sites.site_for_url(&job.site_url).await?;
        self.reconcile(&site).await?;
        Ok(())
    }

    async fn update_unseen_for_job_site(&self, job: &JobOffer) -> Result<(), StoreError> {
        let site = self.sites.site_for_url(&job.site_url).await?;
        let unseen = self.jobs.count_jobs_unseen_for_site(&site).await?;
        self.sites
            .update_jobs_statistics(&site, StatisticsUpdate::new().unseen(unseen))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Filter, FindOptions, MemoryStore, Patch};
    use async_trait::async_trait;
    use serde_json::Value;

    const SITE_A: &str = "https://a.test";

    async fn service_with_site() -> (SiteStatisticsService, JobSite) {
        let service = SiteStatisticsService::new(Arc::new(MemoryStore::new()));
        let site = JobSite::new(SITE_A, "A");
        service.sites().add_site(&site).await.unwrap();
        (service, site)
    }

    async fn stats(service: &SiteStatisticsService, url: &str) -> JobStatistics {
        service.sites().site_for_url(url).await.unwrap().jobs
    }

    #[tokio::test]
    async fn test_add_job_counts_total_and_unseen() {
        let (service, _) = service_with_site().await;

        service
            .add_job(&JobOffer::new("j1", SITE_A, "One"))
            .await
            .unwrap();
        assert_eq!(stats(&service, SITE_A).await, JobStatistics { total: 1, unseen: 1 });

        service
            .add_job(&JobOffer::new("j2", SITE_A, "Two").with_hidden(true))
            .await
            .unwrap();
        assert_eq!(stats(&service, SITE_A).await, JobStatistics { total: 2, unseen: 1 });
    }

    #[tokio::test]
    async fn test_add_hide_add_scenario() {
        let (service, _) = service_with_site().await;

        let j1 = JobOffer::new("j1", SITE_A, "One");
        service.add_job(&j1).await.unwrap();
        assert_eq!(stats(&service, SITE_A).await, JobStatistics { total: 1, unseen: 1 });

        service.hide_job(&j1).await.unwrap();
        assert_eq!(stats(&service, SITE_A).await, JobStatistics { total: 1, unseen: 0 });

        service
            .add_job(&JobOffer::new("j2", SITE_A, "Two").with_hidden(true))
            .await
            .unwrap();
        assert_eq!(stats(&service, SITE_A).await, JobStatistics { total: 2, unseen: 0 });
    }

    #[tokio::test]
    async fn test_hide_then_show_restores_unseen() {
        let (service, _) = service_with_site().await;
        for url in ["j1", "j2", "j3"] {
            service
                .add_job(&JobOffer::new(url, SITE_A, url))
                .await
                .unwrap();
        }
        let before = stats(&service, SITE_A).await;
        let j2 = service.jobs().job_for_url("j2").await.unwrap();

        service.hide_job(&j2).await.unwrap();
        assert_eq!(stats(&service, SITE_A).await.unseen, before.unseen - 1);

        service.show_job(&j2).await.unwrap();
        assert_eq!(stats(&service, SITE_A).await, before);
    }

    #[tokio::test]
    async fn test_repeated_hide_is_idempotent() {
        let (service, _) = service_with_site().await;
        let j1 = JobOffer::new("j1", SITE_A, "One");
        service.add_job(&j1).await.unwrap();

        service.hide_job(&j1).await.unwrap();
        service.hide_job(&j1).await.unwrap();
        assert_eq!(stats(&service, SITE_A).await, JobStatistics { total: 1, unseen: 0 });
    }

    #[tokio::test]
    async fn test_hide_job_of_unknown_site_fails_after_toggle() {
        let service = SiteStatisticsService::new(Arc::new(MemoryStore::new()));
        let orphan = JobOffer::new("j1", "https://gone.test", "Orphan");
        service.jobs().add_job(&orphan).await.unwrap();

        let err = service.hide_job(&orphan).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert!(service.jobs().job_for_url("j1").await.unwrap().state.hidden);
    }

    #[tokio::test]
    async fn test_clear_jobs_zeroes_counters() {
        let (service, site) = service_with_site().await;
        for (i, hidden) in [false, true, false].into_iter().enumerate() {
            service
                .add_job(&JobOffer::new(format!("j{i}"), SITE_A, "Job").with_hidden(hidden))
                .await
                .unwrap();
        }

        let deleted = service.clear_jobs(&site).await.unwrap();
        assert_eq!(deleted, 3);
        assert_eq!(stats(&service, SITE_A).await, JobStatistics::default());
        assert!(service.jobs().jobs_for_site(SITE_A).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_jobs_on_empty_site() {
        let (service, site) = service_with_site().await;
        assert_eq!(service.clear_jobs(&site).await.unwrap(), 0);
        assert_eq!(stats(&service, SITE_A).await, JobStatistics::default());
    }

    #[tokio::test]
    async fn test_delete_cascades_to_jobs() {
        let (service, site) = service_with_site().await;
        let other = JobSite::new("https://b.test", "B");
        service.sites().add_site(&other).await.unwrap();
        service
            .add_job(&JobOffer::new("j1", SITE_A, "One"))
            .await
            .unwrap();
        service
            .add_job(&JobOffer::new("k1", "https://b.test", "Other"))
            .await
            .unwrap();

        assert_eq!(service.delete(&site).await.unwrap(), 1);

        assert_eq!(
            service
                .jobs()
                .count_jobs(&Filter::eq("site_url", SITE_A))
                .await
                .unwrap(),
            0
        );
        let err = service.sites().site_for_url(SITE_A).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(stats(&service, "https://b.test").await.total, 1);
    }

    #[tokio::test]
    async fn test_reconcile_repairs_stale_counters() {
        let store = Arc::new(MemoryStore::new());
        let service = SiteStatisticsService::new(store.clone());
        let site = JobSite::new(SITE_A, "A");
        service.sites().add_site(&site).await.unwrap();
        // Jobs written behind the service's back leave the counters stale.
        service
            .jobs()
            .add_job(&JobOffer::new("j1", SITE_A, "One"))
            .await
            .unwrap();
        service
            .jobs()
            .add_job(&JobOffer::new("j2", SITE_A, "Two").with_hidden(true))
            .await
            .unwrap();
        assert_eq!(stats(&service, SITE_A).await, JobStatistics::default());

        let repaired = service.reconcile(&site).await.unwrap();
        assert_eq!(repaired, JobStatistics { total: 2, unseen: 1 });
        assert_eq!(stats(&service, SITE_A).await, repaired);
    }

    /// Delegates to a `MemoryStore` but refuses every update on sites.
    struct ReadOnlySites(MemoryStore);

    #[async_trait]
    impl DocumentStore for ReadOnlySites {
        async fn find(
            &self,
            collection: &str,
            filter: &Filter,
            options: &FindOptions,
        ) -> Result<Vec<Value>, StoreError> {
            self.0.find(collection, filter, options).await
        }

        async fn insert_one(&self, collection: &str, document: Value) -> Result<(), StoreError> {
            self.0.insert_one(collection, document).await
        }

        async fn update_one(
            &self,
            collection: &str,
            filter: &Filter,
            patch: &Patch,
        ) -> Result<u64, StoreError> {
            if collection == "target_sites" {
                return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
            }
            self.0.update_one(collection, filter, patch).await
        }

        async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
            self.0.delete_one(collection, filter).await
        }

        async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
            self.0.delete_many(collection, filter).await
        }

        async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
            self.0.count(collection, filter).await
        }
    }

    #[tokio::test]
    async fn test_failed_counter_write_keeps_job() {
        let service = SiteStatisticsService::new(Arc::new(ReadOnlySites(MemoryStore::new())));
        service
            .sites()
            .add_site(&JobSite::new(SITE_A, "A"))
            .await
            .unwrap();

        let err = service
            .add_job(&JobOffer::new("j1", SITE_A, "One"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Database(_)));
        assert!(service.jobs().job_for_url("j1").await.is_ok());
        assert_eq!(stats(&service, SITE_A).await, JobStatistics::default());
    }
}
