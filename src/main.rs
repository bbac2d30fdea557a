use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use std::sync::Arc;
use tracing::{error, info};

use amora_core::config::Settings;
use amora_core::core::Matcher;
use amora_core::realtime::{self, ConnectionRegistry, RealtimeContext};
use amora_core::routes::{self, AppState};
use amora_core::services::{
    CacheManager, DirectoryClient, LikeMatchCoordinator, ModerationClient, PgRelationshipStore,
    TokenVerifier,
};

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .content_type("application/json")
            .body(serde_json::to_string(self).unwrap())
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Initialize logging
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting Amora core service...");

    // Load configuration
    let settings = Settings::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        panic!("Configuration error: {}", e);
    });

    info!("Configuration loaded successfully");

    // External collaborators
    let directory = Arc::new(DirectoryClient::new(
        settings.directory.base_url.clone(),
        settings.directory.api_key.clone(),
        settings.directory.timeout_secs,
    ));
    let moderation = Arc::new(ModerationClient::new(
        settings.moderation.base_url.clone(),
        settings.moderation.api_key.clone(),
        settings.moderation.timeout_secs,
    ));

    info!("Directory and moderation clients initialized");

    // Cache manager
    let cache_ttl = settings.cache.ttl_secs.unwrap_or(120);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(1000);

    let cache = match CacheManager::new(&settings.cache.redis_url, l1_cache_size, cache_ttl).await {
        Ok(c) => {
            info!("Cache manager initialized (L1: {} entries, TTL: {}s)", l1_cache_size, cache_ttl);
            Arc::new(c)
        }
        Err(e) => {
            error!("Failed to connect to Redis: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, "Redis connection required"));
        }
    };

    // Relationship store (PostgreSQL)
    let store = Arc::new(
        PgRelationshipStore::from_settings(
            &settings.database.url,
            settings.database.max_connections,
            settings.database.min_connections,
        )
        .await
        .unwrap_or_else(|e| {
            error!("Failed to connect to PostgreSQL: {}", e);
            panic!("PostgreSQL connection error: {}", e);
        }),
    );

    info!(
        "Relationship store initialized (max: {} connections)",
        settings.database.max_connections.unwrap_or(10)
    );

    let verifier = Arc::new(TokenVerifier::new(&settings.auth.jwt_secret));
    let coordinator = Arc::new(LikeMatchCoordinator::new(store.clone()));
    let registry = Arc::new(ConnectionRegistry::new());
    let matcher = Matcher::new();

    // Real-time gateway
    let realtime_ctx = Arc::new(RealtimeContext {
        registry: registry.clone(),
        store: store.clone(),
        moderation: moderation.clone(),
        directory: directory.clone(),
        cache: cache.clone(),
        max_message_length: settings.realtime.max_message_length,
    });

    let gateway_addr = format!("{}:{}", settings.realtime.host, settings.realtime.port);
    {
        let ctx = realtime_ctx.clone();
        let verifier = verifier.clone();
        tokio::spawn(async move {
            if let Err(e) = realtime::gateway::run(gateway_addr, ctx, verifier).await {
                error!("real-time gateway terminated: {}", e);
            }
        });
    }

    realtime::spawn_heartbeat_tasks(registry.clone(), settings.realtime.clone());
    info!("Real-time gateway and heartbeat tasks started");

    // Pass-ledger retention sweep, once a day
    {
        let store = store.clone();
        let retention_days = settings.matching.pass_retention_days as i64;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(24 * 3600));
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let cutoff = chrono::Utc::now() - chrono::Duration::days(retention_days);
                if let Err(e) = store.purge_passes_older_than(cutoff).await {
                    error!("pass retention sweep failed: {}", e);
                }
            }
        });
    }

    // Build application state
    let app_state = AppState {
        directory,
        cache,
        store,
        coordinator,
        registry,
        matcher,
        matching: settings.matching.clone(),
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    let verifier_data = web::Data::from(verifier);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(verifier_data.clone())
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
