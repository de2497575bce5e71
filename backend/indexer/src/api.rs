//! Axum REST API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::error;

use crate::db::{self, EventFilter};
use crate::errors::Result;
use crate::events::EventRecord;

#[derive(Clone)]
pub struct ApiState {
    pub pool: SqlitePool,
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events", get(get_all_events))
        .route("/contributors/:address/events", get(get_contributor_events))
        .route("/currencies/:currency/events", get(get_currency_events))
        .with_state(state)
}

// ─────────────────────────────────────────────────────────
// Request / response shapes
// ─────────────────────────────────────────────────────────

/// `?event_type=contribution_recorded`
#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    pub event_type: Option<String>,
}

#[derive(Serialize)]
pub struct EventsResponse {
    pub count: usize,
    pub events: Vec<EventRecord>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn respond(result: Result<Vec<EventRecord>>) -> Response {
    match result {
        Ok(events) => {
            let count = events.len();
            (StatusCode::OK, Json(EventsResponse { count, events })).into_response()
        }
        Err(e) => {
            error!("Event query failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /events`
pub async fn get_all_events(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<EventsQuery>,
) -> Response {
    let filter = EventFilter {
        event_type: query.event_type.as_deref(),
        ..EventFilter::default()
    };
    respond(db::get_events(&state.pool, &filter).await)
}

/// `GET /contributors/:address/events`
///
/// Every event keyed by `address`: its contributions, qualification
/// changes, refunds and claims.
pub async fn get_contributor_events(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
    Query(query): Query<EventsQuery>,
) -> Response {
    let filter = EventFilter {
        account: Some(&address),
        event_type: query.event_type.as_deref(),
        ..EventFilter::default()
    };
    respond(db::get_events(&state.pool, &filter).await)
}

/// `GET /currencies/:currency/events`
pub async fn get_currency_events(
    State(state): State<Arc<ApiState>>,
    Path(currency): Path<String>,
    Query(query): Query<EventsQuery>,
) -> Response {
    let filter = EventFilter {
        currency: Some(&currency),
        event_type: query.event_type.as_deref(),
        ..EventFilter::default()
    };
    respond(db::get_events(&state.pool, &filter).await)
}
