use actix_cors::Cors;
use actix_web::{web, App, HttpServer, HttpResponse, middleware, error, http::StatusCode};
use fedlease_score::config::{CacheBackend, Settings};
use fedlease_score::core::{
    HistogramDistribution, MatchConstraintPipeline, MatchScoreEngine, Matcher,
    NeighborhoodScoreEngine, SharedSpatialIndex, SpatialIndex,
};
use fedlease_score::models::GovernmentPropertyRecord;
use fedlease_score::routes::{self, scores::AppState};
use fedlease_score::services::normalize::government_records_from_json;
use fedlease_score::services::{
    CacheStore, InMemoryRecordStore, MemoryCacheStore, PostgresClient, RecordStore,
    RestRecordStore, ScoreCache, ScoringService, StoreCollections,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, error};
use tracing_subscriber::EnvFilter;

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
            .json(self)
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

fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    match format {
        "pretty" => subscriber.pretty().init(),
        "compact" => subscriber.compact().init(),
        _ => subscriber.json().init(),
    }
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", context, err);
    std::io::Error::other(format!("{}: {}", context, err))
}

fn read_json(path: &str) -> std::io::Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(std::io::Error::other)
}

/// Load the government property reference set from Postgres or the seed file
async fn load_reference_records(
    settings: &Settings,
    postgres: Option<&PostgresClient>,
) -> std::io::Result<Vec<GovernmentPropertyRecord>> {
    if let Some(postgres) = postgres {
        return postgres
            .load_government_properties()
            .await
            .map_err(|e| startup_error("Failed to load government properties", e));
    }

    match &settings.index.seed_path {
        Some(path) => {
            let seed = read_json(path).map_err(|e| startup_error("Failed to read index seed file", e))?;
            government_records_from_json(&seed).map_err(|e| startup_error("Invalid index seed file", e))
        }
        None => {
            warn!("No database or index seed file configured, starting with an empty spatial index");
            Ok(Vec::new())
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load();

    // LOG_LEVEL / LOG_FORMAT override the logging section
    let (default_level, default_format) = match &settings {
        Ok(settings) => (settings.logging.level.clone(), settings.logging.format.clone()),
        Err(_) => ("info".to_string(), "json".to_string()),
    };
    let log_level = std::env::var("LOG_LEVEL").unwrap_or(default_level);
    let log_format = std::env::var("LOG_FORMAT").unwrap_or(default_format);
    init_tracing(&log_level, &log_format);

    info!("Starting FedLease scoring service...");

    let settings = settings.map_err(|e| startup_error("Failed to load configuration", e))?;

    info!("Configuration loaded successfully");

    // Initialize PostgreSQL client (optional - the service runs in memory without it)
    let postgres = match &settings.database.url {
        Some(url) => {
            let client = PostgresClient::from_settings(
                url,
                settings.database.max_connections,
                settings.database.min_connections,
                settings.database.acquire_timeout_secs,
                settings.database.idle_timeout_secs,
            )
            .await
            .map_err(|e| startup_error("Failed to connect to PostgreSQL", e))?;
            info!("PostgreSQL client initialized");
            Some(Arc::new(client))
        }
        None => None,
    };

    // Spatial index over the government property reference set
    let records = load_reference_records(&settings, postgres.as_deref()).await?;
    info!("Indexing {} government properties", records.len());
    let index = Arc::new(SharedSpatialIndex::new(SpatialIndex::build(records)));

    // Percentile reference distribution, seeded from persisted scores
    let distribution = Arc::new(HistogramDistribution::new());
    if let Some(postgres) = &postgres {
        match postgres.load_reference_scores().await {
            Ok(scores) => {
                info!("Seeding percentile distribution with {} scores", scores.len());
                distribution.reset_from(scores);
            }
            Err(e) => warn!("Failed to load reference scores, percentiles start at the default: {}", e),
        }
    }

    let scoring_settings = &settings.scoring;
    let neighborhood = NeighborhoodScoreEngine::new(
        scoring_settings.neighborhood_weights.clone(),
        scoring_settings.grades.clone(),
        scoring_settings.tuning.clone(),
        distribution,
    );

    let pipeline = MatchConstraintPipeline::from_names(scoring_settings.check_order.as_slice())
        .map_err(|e| startup_error("Invalid scoring.check_order", e))?;
    info!("Constraint pipeline: {:?}", pipeline.check_names());

    let matcher = Matcher::new(
        pipeline,
        MatchScoreEngine::new(
            scoring_settings.match_weights.clone(),
            scoring_settings.grades.clone(),
            scoring_settings.competitive.clone(),
        ),
    );

    info!(
        "Engines initialized with weights {} / {}, grades {}",
        scoring_settings.neighborhood_weights.version,
        scoring_settings.match_weights.version,
        scoring_settings.grades.version
    );

    // Score cache
    let cache_store: Arc<dyn CacheStore> = match (settings.cache.backend, &postgres) {
        (CacheBackend::Postgres, Some(postgres)) => Arc::new(postgres.cache_store()),
        _ => Arc::new(MemoryCacheStore::new(settings.cache.max_entries)),
    };
    let cache = ScoreCache::new(cache_store, chrono::Duration::hours(settings.cache.ttl_hours));

    info!("Score cache initialized ({:?}, TTL: {}h)", settings.cache.backend, settings.cache.ttl_hours);

    // Listing/opportunity store
    let record_store: Arc<dyn RecordStore> = match &settings.store.endpoint {
        Some(endpoint) => {
            let collections = StoreCollections {
                listings: settings.store.listings_collection.clone(),
                opportunities: settings.store.opportunities_collection.clone(),
                broker_profiles: settings.store.broker_profiles_collection.clone(),
            };
            let store = RestRecordStore::new(
                endpoint.clone(),
                settings.store.api_key.clone(),
                settings.store.timeout_secs,
                collections,
            )
            .map_err(|e| startup_error("Failed to create record store client", e))?;
            info!("Record store client initialized for {}", endpoint);
            Arc::new(store)
        }
        None => {
            let store = match &settings.store.seed_path {
                Some(path) => {
                    let seed = read_json(path).map_err(|e| startup_error("Failed to read store seed file", e))?;
                    InMemoryRecordStore::from_seed(&seed)
                        .map_err(|e| startup_error("Invalid store seed file", e))?
                }
                None => InMemoryRecordStore::new(),
            };
            let (listings, opportunities) = store.counts();
            info!("In-memory record store with {} listings, {} opportunities", listings, opportunities);
            Arc::new(store)
        }
    };

    let scoring = Arc::new(
        ScoringService::new(index, neighborhood, matcher, cache, record_store)
            .with_max_batch_size(scoring_settings.max_batch_size),
    );

    // Background index refresh
    if settings.index.refresh_interval_secs > 0 {
        let scoring = Arc::clone(&scoring);
        let settings = settings.clone();
        let postgres = postgres.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(settings.index.refresh_interval_secs));
            interval.tick().await;
            loop {
                interval.tick().await;
                match load_reference_records(&settings, postgres.as_deref()).await {
                    Ok(records) => scoring.replace_index(records),
                    Err(e) => warn!("Index refresh failed, keeping the current index: {}", e),
                }
            }
        });
    }

    // Background cache sweep
    if settings.cache.sweep_interval_secs > 0 {
        let scoring = Arc::clone(&scoring);
        let period = Duration::from_secs(settings.cache.sweep_interval_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                if let Err(e) = scoring.sweep_cache().await {
                    warn!("Cache sweep failed: {}", e);
                }
            }
        });
    }

    // Build application state
    let app_state = AppState { scoring };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
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
