use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use elo_sync::config::Settings;
use elo_sync::core::GuildSynchronizer;
use elo_sync::routes::{self, guilds::AppState};
use elo_sync::services::{DiscordClient, PostgresClient, RatingApiClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
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

fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

fn io_error(e: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration
    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return Err(io_error(e));
        }
    };

    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.logging.level.clone());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.logging.format.clone());
    init_logging(&log_level, &log_format);

    info!("Starting Elo sync service...");

    let engine_config = Arc::new(settings.engine_config().map_err(|e| {
        error!("Invalid guild configuration: {}", e);
        io_error(e)
    })?);

    info!("Configuration loaded for {} guilds", engine_config.guilds.len());

    // Initialize PostgreSQL client
    let postgres = Arc::new(
        PostgresClient::from_settings(
            &settings.database.url,
            settings.database.max_connections,
            settings.database.min_connections,
        )
        .await
        .map_err(|e| {
            error!("Failed to connect to PostgreSQL: {}", e);
            io_error(e)
        })?,
    );

    info!("PostgreSQL client initialized");

    let ratings = Arc::new(
        RatingApiClient::new(
            settings.rating_api.endpoint.clone(),
            settings.rating_api.region.clone(),
            &settings.rating_api.user_agent,
            Duration::from_secs(settings.rating_api.timeout_secs),
        )
        .map_err(io_error)?,
    );

    let discord = Arc::new(
        DiscordClient::new(
            settings.discord.api_base.clone(),
            settings.discord.token.clone(),
            Duration::from_secs(settings.discord.timeout_secs),
            Duration::from_secs(settings.discord.role_cache_ttl_secs),
        )
        .map_err(io_error)?,
    );

    info!("Rating and Discord clients initialized");

    let synchronizer = Arc::new(
        GuildSynchronizer::new(
            Arc::clone(&engine_config),
            postgres.clone(),
            ratings,
            discord,
        )
        .with_max_concurrent_fetches(settings.sync.max_concurrent_fetches),
    );

    if settings.sync.enabled {
        let interval = Duration::from_secs(settings.sync.interval_secs);
        info!("Scheduled Elo update every {}s", interval.as_secs());
        actix_web::rt::spawn(Arc::clone(&synchronizer).run_periodic(interval));
    }

    // Build application state
    let app_state = AppState {
        config: engine_config,
        repository: postgres,
        synchronizer,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(2);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
