//! ScholarPort API Gateway
//!
//! The entry point for all external API requests. Handles:
//! - Request routing for the article and citation services
//! - Request validation
//! - Observability (logging, metrics, tracing)

mod handlers;
mod validation;

use axum::{
    extract::{MatchedPath, Request},
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, patch, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use scholarport_common::{config::AppConfig, db::DbPool, metrics};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, Level};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(true)
        .json()
        .init();

    info!("Starting ScholarPort API v{}", scholarport_common::VERSION);

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;

    let config = Arc::new(config);

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .install()?;
        info!("Prometheus exporter on {}", metrics_addr);
    }
    metrics::register_metrics();

    // Initialize database connection
    let db = DbPool::new(&config.database).await?;

    // Create app state
    let state = AppState {
        config: config.clone(),
        db,
    };

    // Build the router
    let app = create_router(state)?;

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Result<Router, Box<dyn std::error::Error>> {
    // CORS: restrict to the configured frontend origin when one is set
    let cors = match &state.config.server.client_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // Article routes
    let article_routes = Router::new()
        .route("/", get(handlers::articles::list_articles))
        .route("/", post(handlers::articles::create_article))
        .route("/search", get(handlers::articles::search_articles))
        .route("/{id}", get(handlers::articles::get_article))
        .route("/{id}", put(handlers::articles::update_article))
        .route("/{id}", delete(handlers::articles::delete_article))
        .route("/{id}/stats", get(handlers::articles::article_stats))
        // Citation routes nested under an article
        .route("/{id}/citations", get(handlers::citations::list_citations))
        .route("/{id}/citations", post(handlers::citations::create_citation))
        .route(
            "/{id}/citations/stats",
            get(handlers::citations::citation_stats),
        )
        .route(
            "/{id}/citations/bulk",
            post(handlers::citations::bulk_import_citations),
        );

    // Direct citation routes
    let citation_routes = Router::new()
        .route("/search", get(handlers::citations::search_citations))
        .route("/{id}", get(handlers::citations::get_citation))
        .route("/{id}", put(handlers::citations::update_citation))
        .route("/{id}", delete(handlers::citations::delete_citation))
        .route("/{id}/verify", patch(handlers::citations::verify_citation))
        .route(
            "/{id}/formatted",
            get(handlers::citations::formatted_citation),
        );

    let app = Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        .nest("/api/articles", article_routes)
        .nest("/api/citations", citation_routes)
        .layer(middleware::from_fn(track_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state);

    Ok(app)
}

/// Record request count and latency, labeled by the matched route template
async fn track_metrics(req: Request, next: Next) -> Response {
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let tracker = metrics::RequestMetrics::start(req.method().as_str(), &endpoint);
    let response = next.run(req).await;
    tracker.finish(response.status().as_u16());

    response
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
