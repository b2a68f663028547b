use std::sync::Arc;

use crate::application::{
    ApplicationAssistant, ApplicationService, DocumentArchive, StorageService,
};
use crate::config::Config;
use crate::store::DocumentStore;
use crate::tracking::SiteStatisticsService;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Every site and job mutation goes through here so counters stay in step.
    pub statistics: SiteStatisticsService,
    pub applications: ApplicationService,
    pub storage: StorageService,
    pub config: Config,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        assistant: Arc<dyn ApplicationAssistant>,
        archive: Arc<dyn DocumentArchive>,
        template: Arc<str>,
        config: Config,
    ) -> Self {
        Self {
            statistics: SiteStatisticsService::new(Arc::clone(&store)),
            applications: ApplicationService::new(Arc::clone(&store), assistant),
            storage: StorageService::new(store, archive, template),
            config,
        }
    }
}
