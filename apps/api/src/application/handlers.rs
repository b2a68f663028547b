use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::application::storage::CoverLetter;
use crate::errors::AppError;
use crate::models::application::{CoverLetterDoc, JobOfferAnalysis, JobOfferApplication};
use crate::models::job::JobOffer;
use crate::state::AppState;
use crate::tracking::handlers::UrlQuery;

#[derive(Deserialize)]
pub struct JobBodyRequest {
    pub url: String,
    pub body: String,
}

#[derive(Deserialize)]
pub struct ComposeRequest {
    pub url: String,
    #[serde(default)]
    pub prompt: Option<String>,
}

/// Everything prepared so far for one job offer.
#[derive(Serialize)]
pub struct ApplicationOverview {
    pub job: JobOffer,
    pub analysis: Option<JobOfferAnalysis>,
    pub application: Option<JobOfferApplication>,
    pub cover_letters: Vec<CoverLetterDoc>,
}

/// POST /api/v1/jobs/body
pub async fn handle_save_job_body(
    State(state): State<AppState>,
    Json(req): Json<JobBodyRequest>,
) -> Result<StatusCode, AppError> {
    if req.url.trim().is_empty() {
        return Err(AppError::Validation("'url' must not be empty".to_string()));
    }
    state.applications.save_job_body(&req.url, &req.body).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/applications?url=
pub async fn handle_get_application(
    State(state): State<AppState>,
    Query(params): Query<UrlQuery>,
) -> Result<Json<ApplicationOverview>, AppError> {
    let job = state.statistics.jobs().job_for_url(&params.url).await?;
    let analysis = state.applications.load_job_analysis(&job).await?;
    let application = state.applications.load_job_application(&job).await?;
    let cover_letters = state.storage.load_cover_letter_docs(&job).await?;
    Ok(Json(ApplicationOverview {
        job,
        analysis,
        application,
        cover_letters,
    }))
}

/// POST /api/v1/applications/analyze?url=
pub async fn handle_analyze(
    State(state): State<AppState>,
    Query(params): Query<UrlQuery>,
) -> Result<Json<JobOfferAnalysis>, AppError> {
    let job = state.statistics.jobs().job_for_url(&params.url).await?;
    let analysis = state.applications.analyze_job(&job).await?;
    Ok(Json(analysis))
}

/// POST /api/v1/applications/compose
pub async fn handle_compose(
    State(state): State<AppState>,
    Json(req): Json<ComposeRequest>,
) -> Result<Json<JobOfferApplication>, AppError> {
    let job = state.statistics.jobs().job_for_url(&req.url).await?;
    let application = state
        .applications
        .compose_application(&job, req.prompt.as_deref())
        .await?;
    Ok(Json(application))
}

/// POST /api/v1/applications/store?url=
pub async fn handle_store_cover_letter(
    State(state): State<AppState>,
    Query(params): Query<UrlQuery>,
) -> Result<(StatusCode, Json<CoverLetterDoc>), AppError> {
    let job = state.statistics.jobs().job_for_url(&params.url).await?;
    let analysis = state
        .applications
        .load_job_analysis(&job)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job offer {} is not analyzed yet", job.url)))?;
    let application = state
        .applications
        .load_job_application(&job)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No application composed for {}", job.url)))?;

    let letter = CoverLetter::from_analysis(&analysis, &application, Utc::now().date_naive());
    let doc = state.storage.store_cover_letter(&letter).await?;
    Ok((StatusCode::CREATED, Json(doc)))
}
