// Route exports
pub mod discovery;
pub mod messages;

use std::sync::Arc;

use actix_web::web;

use crate::config::MatchingSettings;
use crate::core::Matcher;
use crate::realtime::ConnectionRegistry;
use crate::services::{CacheManager, DirectoryClient, LikeMatchCoordinator, PgRelationshipStore};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<DirectoryClient>,
    pub cache: Arc<CacheManager>,
    pub store: Arc<PgRelationshipStore>,
    pub coordinator: Arc<LikeMatchCoordinator>,
    pub registry: Arc<ConnectionRegistry>,
    pub matcher: Matcher,
    pub matching: MatchingSettings,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(discovery::configure)
            .configure(messages::configure),
    );
}
