use axum::body::Body;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use http::header::{ACCEPT, CONTENT_TYPE, ORIGIN};
use http::Method;
use rust_embed::RustEmbed;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_http::trace::{DefaultOnFailure, DefaultOnResponse};
use tower_http::LatencyUnit;

mod config;
mod handlers;
pub mod health;
pub mod status;
mod ws;

pub use config::Config;

use crate::ServiceState;

pub const STATUS_PREFIX: &str = "/_status";
pub const WS_PATH: &str = "/ws";
pub const HEALTH_PATH: &str = "/health";

#[derive(RustEmbed)]
#[folder = "static"]
struct StaticAssets;

fn asset_response(path: &str) -> Option<Response> {
    let content = StaticAssets::get(path)?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    Some(
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, mime.as_ref().to_string())],
            Body::from(content.data.into_owned()),
        )
            .into_response(),
    )
}

async fn index_handler(headers: http::HeaderMap) -> Response {
    match asset_response("index.html") {
        Some(response) => response,
        None => handlers::not_found_handler(headers).await,
    }
}

async fn static_handler(uri: Uri, headers: http::HeaderMap) -> Response {
    let path = uri
        .path()
        .trim_start_matches('/')
        .trim_start_matches("static/");

    match asset_response(path) {
        Some(response) => response,
        None => handlers::not_found_handler(headers).await,
    }
}

/// Every route the relay serves, without the tracing layer
pub fn router(state: ServiceState) -> Router {
    // read-only cross-origin access, e.g. a dashboard polling /health
    let cors = CorsLayer::new()
        .allow_methods(vec![Method::GET])
        .allow_headers(vec![ACCEPT, ORIGIN, CONTENT_TYPE])
        .allow_origin(Any)
        .allow_credentials(false);

    Router::new()
        .route(WS_PATH, get(ws::handler))
        .route(HEALTH_PATH, get(status::handler))
        .nest(STATUS_PREFIX, health::router(state.clone()))
        .route("/", get(index_handler))
        .route("/static/*path", get(static_handler))
        .fallback(handlers::not_found_handler)
        .layer(cors)
        .with_state(state)
}

/// Run the relay HTTP server (WebSocket, health and demo client)
pub async fn run(
    config: Config,
    state: ServiceState,
    mut shutdown_rx: watch::Receiver<()>,
) -> Result<(), HttpServerError> {
    let listen_addr = config.listen_addr;
    let log_level = config.log_level;
    let trace_layer = TraceLayer::new_for_http()
        .on_response(
            DefaultOnResponse::new()
                .include_headers(false)
                .level(log_level)
                .latency_unit(LatencyUnit::Micros),
        )
        .on_failure(DefaultOnFailure::new().latency_unit(LatencyUnit::Micros));

    tracing::info!("Static files embedded in binary");
    let app = router(state).layer(trace_layer);

    tracing::info!(addr = ?listen_addr, "Relay server listening");
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        })
        .await?;

    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    #[error("an error occurred running the HTTP server: {0}")]
    ServingFailed(#[from] std::io::Error),
}
