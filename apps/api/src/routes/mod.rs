pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::application::handlers as applications;
use crate::state::AppState;
use crate::tracking::handlers as tracking;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Sites
        .route(
            "/api/v1/sites",
            get(tracking::handle_list_sites)
                .post(tracking::handle_add_site)
                .delete(tracking::handle_delete_site),
        )
        .route("/api/v1/sites/lookup", get(tracking::handle_get_site))
        .route("/api/v1/sites/clear", post(tracking::handle_clear_jobs))
        .route("/api/v1/sites/reconcile", post(tracking::handle_reconcile))
        .route(
            "/api/v1/sites/crawl-report",
            post(tracking::handle_crawl_report),
        )
        // Jobs
        .route(
            "/api/v1/jobs",
            get(tracking::handle_list_jobs).post(tracking::handle_add_job),
        )
        .route("/api/v1/jobs/overview", get(tracking::handle_jobs_overview))
        .route("/api/v1/jobs/lookup", get(tracking::handle_get_job))
        .route("/api/v1/jobs/hide", post(tracking::handle_hide_job))
        .route("/api/v1/jobs/show", post(tracking::handle_show_job))
        .route("/api/v1/jobs/body", post(applications::handle_save_job_body))
        // Applications
        .route(
            "/api/v1/applications",
            get(applications::handle_get_application),
        )
        .route(
            "/api/v1/applications/analyze",
            post(applications::handle_analyze),
        )
        .route(
            "/api/v1/applications/compose",
            post(applications::handle_compose),
        )
        .route(
            "/api/v1/applications/store",
            post(applications::handle_store_cover_letter),
        )
        .with_state(state)
}
