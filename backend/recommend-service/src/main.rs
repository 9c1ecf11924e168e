use std::fs::File;
use std::io::{self, BufReader};
use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpResponse, HttpServer};
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recommend_service::cache::RecommendationCache;
use recommend_service::db::{schema, PgRecordStore, RecordStore};
use recommend_service::handlers::{self, AppState};
use recommend_service::ingest::IngestPipeline;
use recommend_service::services::RecommendationService;
use recommend_service::Config;

async fn health_summary(state: web::Data<AppState>) -> HttpResponse {
    match state.store.ping().await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "recommend-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "error": format!("Record store unreachable: {}", e),
            "service": "recommend-service"
        })),
    }
}

async fn connect_pool(config: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .context("failed to connect to the record store database")?;

    schema::ensure_schema(&pool)
        .await
        .context("failed to ensure record store schema")?;

    Ok(pool)
}

/// Offline batch ingestion: `recommend-service ingest <file>`.
async fn run_ingest(config: &Config, path: &str) -> anyhow::Result<()> {
    let pool = connect_pool(config).await?;
    let store: Arc<dyn RecordStore> = Arc::new(PgRecordStore::new(pool));
    let pipeline = IngestPipeline::with_batch_size(store, config.ingest.batch_size);

    let file = File::open(path).with_context(|| format!("failed to open input file {}", path))?;
    let report = pipeline
        .ingest(BufReader::new(file))
        .await
        .context("ingestion run failed")?;

    if report.lost_batches() > 0 {
        tracing::warn!(
            lost = report.lost_batches(),
            "Some batches failed to commit; re-run the affected input range to recover"
        );
    }
    Ok(())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // CLI subcommand: run the batch pipeline against the configured store
    // and exit instead of serving.
    {
        let mut args = std::env::args();
        let _bin = args.next();
        if let Some(cmd) = args.next() {
            if cmd == "ingest" {
                let Some(path) = args.next() else {
                    eprintln!("usage: recommend-service ingest <file>");
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        "missing input file",
                    ));
                };
                return run_ingest(&config, &path).await.map_err(|e| {
                    tracing::error!("Ingestion failed: {:#}", e);
                    io::Error::new(io::ErrorKind::Other, e.to_string())
                });
            }
        }
    }

    tracing::info!("Starting recommend-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let pool = match connect_pool(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Database initialization failed: {:#}", e);
            eprintln!("ERROR: Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let store: Arc<dyn RecordStore> = Arc::new(PgRecordStore::new(pool));
    let cache = Arc::new(RecommendationCache::new(Duration::from_secs(
        config.recommendation.cache_ttl_secs,
    )));
    let recommendations = Arc::new(RecommendationService::new(
        store.clone(),
        cache,
        config.recommendation.attribution,
    ));

    let state = web::Data::new(AppState {
        recommendations,
        store,
        identity: config.identity.clone(),
    });

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", bind_address);

    let allowed_origins = config.cors.allowed_origins.clone();
    HttpServer::new(move || {
        let mut cors = Cors::default();
        for origin in allowed_origins.split(',') {
            let origin = origin.trim();
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header().max_age(3600);

        App::new()
            .app_data(state.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .route("/api/v1/health", web::get().to(health_summary))
            .service(
                web::scope("/api/v1")
                    .route("/recommendations", web::get().to(handlers::get_recommendations)),
            )
    })
    .bind(&bind_address)?
    .run()
    .await
}
