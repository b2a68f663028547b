//! Job tracking: sites, their job offers, and the cached per-site counters.

pub mod crawl;
pub mod handlers;
pub mod jobs;
pub mod listing;
pub mod sites;
pub mod statistics;

pub use statistics::SiteStatisticsService;
