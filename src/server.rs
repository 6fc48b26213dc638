use crate::app::ports::EventStore;
use crate::domain::{EntityId, Event};
use crate::storage::sqlite::EVENT_DATE_FORMAT;
use crate::telemetry;
use axum::{
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Extension, Router,
};
use hyper::Server;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Row shape served by `GET /api/events`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EventRecord {
    pub event_id: Option<EntityId>,
    pub event_artist: String,
    pub event_date: String,
    pub event_price: String,
    pub venue_name: String,
    pub city_name: String,
    pub event_has_showtime: bool,
}

impl From<&Event> for EventRecord {
    fn from(event: &Event) -> Self {
        Self {
            event_id: event.id,
            event_artist: event.artist.clone(),
            event_date: event.showtime.format(EVENT_DATE_FORMAT).to_string(),
            event_price: event.price.clone(),
            venue_name: event.venue.name.clone(),
            city_name: event.city.name.clone(),
            event_has_showtime: event.has_showtime,
        }
    }
}

/// Health check endpoint
async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "gigs-scraper",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn list_events(Extension(store): Extension<Arc<dyn EventStore>>) -> axum::response::Response {
    match store.list_all_events().await {
        Ok(mut events) => {
            events.sort_by_key(|e| e.showtime);
            let records: Vec<EventRecord> = events.iter().map(EventRecord::from).collect();
            Json(records).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to list events");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "internal server error" })),
            )
                .into_response()
        }
    }
}

/// Prometheus text exposition of the scrape and reconcile metrics.
async fn render_metrics() -> axum::response::Response {
    match telemetry::render() {
        Some(body) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}

/// Read-only router: `/health`, `/metrics` and `/api/events`.
pub fn create_server(store: Arc<dyn EventStore>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(render_metrics))
        .route("/api/events", get(list_events))
        .layer(Extension(store))
        .layer(cors)
}

/// Serves the read API until `cancel` fires.
pub async fn start_server(
    store: Arc<dyn EventStore>,
    port: u16,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let app = create_server(store);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!(%addr, "HTTP server listening");

    Server::try_bind(&addr)?
        .serve(app.into_make_service())
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    info!("HTTP server stopped");
    Ok(())
}
