use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::application::assistant::ApplicationAssistant;
use crate::errors::AppError;
use crate::models::application::{JobOfferAnalysis, JobOfferApplication, JobOfferBody};
use crate::models::job::{self, JobOffer};
use crate::store::{Collection, DocumentStore, Filter};

/// Analysis and cover-letter composition for single job offers.
///
/// Each step replaces the stored result of the previous run, so repeating a
/// step never leaves two analyses or applications for one offer.
#[derive(Clone)]
pub struct ApplicationService {
    bodies: Collection<JobOfferBody>,
    analyses: Collection<JobOfferAnalysis>,
    applications: Collection<JobOfferApplication>,
    assistant: Arc<dyn ApplicationAssistant>,
}

fn by_url(url: &str) -> Filter {
    Filter::eq(job::URL, url)
}

impl ApplicationService {
    pub fn new(store: Arc<dyn DocumentStore>, assistant: Arc<dyn ApplicationAssistant>) -> Self {
        Self {
            bodies: Collection::new(Arc::clone(&store)),
            analyses: Collection::new(Arc::clone(&store)),
            applications: Collection::new(store),
            assistant,
        }
    }

    /// Stores the posting text for `url`, replacing an earlier one.
    pub async fn save_job_body(&self, url: &str, body: &str) -> Result<(), AppError> {
        let document = JobOfferBody {
            url: url.to_string(),
            body: body.to_string(),
            added: Utc::now(),
        };
        self.bodies.replace(&document).await?;
        Ok(())
    }

    pub async fn analyze_job(&self, job: &JobOffer) -> Result<JobOfferAnalysis, AppError> {
        let body = self
            .bodies
            .one_or_none(&by_url(&job.url))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No posting text stored for {}", job.url)))?;

        info!("Analyzing job offer {}", job.url);
        let extracted = self.assistant.analyze(&body.body).await?;

        let analysis = JobOfferAnalysis {
            url: job.url.clone(),
            company_name: extracted.company_name,
            title: extracted.title,
            summary: extracted.summary,
            requirements: extracted.requirements,
            tasks: extracted.tasks,
            added: Utc::now(),
        };
        self.analyses.replace(&analysis).await?;
        info!(
            "Analyzed {} ({} requirements, {} tasks)",
            job.url,
            analysis.requirements.len(),
            analysis.tasks.len()
        );
        Ok(analysis)
    }

    /// Composes a cover-letter body from the stored analysis of `job`.
    pub async fn compose_application(
        &self,
        job: &JobOffer,
        refinement: Option<&str>,
    ) -> Result<JobOfferApplication, AppError> {
        let analysis = self.load_job_analysis(job).await?.ok_or_else(|| {
            AppError::NotFound(format!("Job offer {} is not analyzed yet", job.url))
        })?;

        info!("Composing application for {}", job.url);
        let cover_body = self.assistant.compose(&analysis, refinement).await?;

        let application = JobOfferApplication {
            url: job.url.clone(),
            cover_body,
            prompt: refinement.map(str::to_string),
            added: Utc::now(),
        };
        self.applications.replace(&application).await?;
        Ok(application)
    }

    pub async fn load_job_analysis(
        &self,
        job: &JobOffer,
    ) -> Result<Option<JobOfferAnalysis>, AppError> {
        Ok(self.analyses.one_or_none(&by_url(&job.url)).await?)
    }

    pub async fn load_job_application(
        &self,
        job: &JobOffer,
    ) -> Result<Option<JobOfferApplication>, AppError> {
        Ok(self.applications.one_or_none(&by_url(&job.url)).await?)
    }
}
