use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::job::JobOffer;
use crate::models::site::{JobSite, JobStatistics};
use crate::state::AppState;
use crate::tracking::crawl::{report_crawl, CrawlReport, CrawlSummary};
use crate::tracking::listing::{jobs_overview, site_page, JobsOverview, SitePage, SitePageRequest};

#[derive(Deserialize)]
pub struct UrlQuery {
    pub url: String,
}

#[derive(Deserialize)]
pub struct SiteUrlQuery {
    pub site_url: String,
}

#[derive(Deserialize)]
pub struct NewSite {
    pub url: String,
    pub title: String,
}

#[derive(Serialize)]
pub struct DeleteSiteResponse {
    pub url: String,
    pub title: String,
    pub deleted_jobs: u64,
}

#[derive(Serialize)]
pub struct ClearJobsResponse {
    pub deleted_jobs: u64,
    pub jobs: JobStatistics,
}

fn require_non_empty(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("'{field}' must not be empty")));
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Sites
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/sites
pub async fn handle_list_sites(
    State(state): State<AppState>,
    Query(request): Query<SitePageRequest>,
) -> Result<Json<SitePage>, AppError> {
    let page = site_page(state.statistics.sites(), &request).await?;
    Ok(Json(page))
}

/// POST /api/v1/sites
pub async fn handle_add_site(
    State(state): State<AppState>,
    Json(req): Json<NewSite>,
) -> Result<(StatusCode, Json<JobSite>), AppError> {
    require_non_empty("url", &req.url)?;
    let site = JobSite::new(req.url, req.title);
    state.statistics.sites().add_site(&site).await?;
    Ok((StatusCode::CREATED, Json(site)))
}

/// DELETE /api/v1/sites?url=
pub async fn handle_delete_site(
    State(state): State<AppState>,
    Query(params): Query<UrlQuery>,
) -> Result<Json<DeleteSiteResponse>, AppError> {
    let site = state.statistics.sites().site_for_url(&params.url).await?;
    let deleted_jobs = state.statistics.delete(&site).await?;
    Ok(Json(DeleteSiteResponse {
        url: site.url,
        title: site.title,
        deleted_jobs,
    }))
}

/// GET /api/v1/sites/lookup?url=
pub async fn handle_get_site(
    State(state): State<AppState>,
    Query(params): Query<UrlQuery>,
) -> Result<Json<JobSite>, AppError> {
    let site = state.statistics.sites().site_for_url(&params.url).await?;
    Ok(Json(site))
}

/// POST /api/v1/sites/clear?url=
pub async fn handle_clear_jobs(
    State(state): State<AppState>,
    Query(params): Query<UrlQuery>,
) -> Result<Json<ClearJobsResponse>, AppError> {
    let site = state.statistics.sites().site_for_url(&params.url).await?;
    let deleted_jobs = state.statistics.clear_jobs(&site).await?;
    Ok(Json(ClearJobsResponse {
        deleted_jobs,
        jobs: JobStatistics::default(),
    }))
}

/// POST /api/v1/sites/reconcile?url=
pub async fn handle_reconcile(
    State(state): State<AppState>,
    Query(params): Query<UrlQuery>,
) -> Result<Json<JobStatistics>, AppError> {
    let site = state.statistics.sites().site_for_url(&params.url).await?;
    let jobs = state.statistics.reconcile(&site).await?;
    Ok(Json(jobs))
}

/// POST /api/v1/sites/crawl-report?url=
pub async fn handle_crawl_report(
    State(state): State<AppState>,
    Query(params): Query<UrlQuery>,
    Json(summary): Json<CrawlSummary>,
) -> Result<Json<CrawlReport>, AppError> {
    let site = state.statistics.sites().site_for_url(&params.url).await?;
    let report = report_crawl(&state.statistics, &site, &summary).await?;
    Ok(Json(report))
}

// ────────────────────────────────────────────────────────────────────────────
// Jobs
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/jobs?site_url=
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(params): Query<SiteUrlQuery>,
) -> Result<Json<Vec<JobOffer>>, AppError> {
    let jobs = state.statistics.jobs().jobs_for_site(&params.site_url).await?;
    Ok(Json(jobs))
}

/// POST /api/v1/jobs
pub async fn handle_add_job(
    State(state): State<AppState>,
    Json(job): Json<JobOffer>,
) -> Result<(StatusCode, Json<JobOffer>), AppError> {
    require_non_empty("url", &job.url)?;
    require_non_empty("site_url", &job.site_url)?;
    state.statistics.add_job(&job).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/v1/jobs/overview
pub async fn handle_jobs_overview(
    State(state): State<AppState>,
) -> Result<Json<JobsOverview>, AppError> {
    let overview = jobs_overview(state.statistics.jobs()).await?;
    Ok(Json(overview))
}

/// GET /api/v1/jobs/lookup?url=
pub async fn handle_get_job(
    State(state): State<AppState>,
    Query(params): Query<UrlQuery>,
) -> Result<Json<JobOffer>, AppError> {
    let job = state.statistics.jobs().job_for_url(&params.url).await?;
    Ok(Json(job))
}

/// POST /api/v1/jobs/hide?url=
pub async fn handle_hide_job(
    State(state): State<AppState>,
    Query(params): Query<UrlQuery>,
) -> Result<Json<JobSite>, AppError> {
    let job = state.statistics.jobs().job_for_url(&params.url).await?;
    state.statistics.hide_job(&job).await?;
    let site = state.statistics.sites().site_for_url(&job.site_url).await?;
    Ok(Json(site))
}

/// POST /api/v1/jobs/show?url=
pub async fn handle_show_job(
    State(state): State<AppState>,
    Query(params): Query<UrlQuery>,
) -> Result<Json<JobSite>, AppError> {
    let job = state.statistics.jobs().job_for_url(&params.url).await?;
    state.statistics.show_job(&job).await?;
    let site = state.statistics.sites().site_for_url(&job.site_url).await?;
    Ok(Json(site))
}
