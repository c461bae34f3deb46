use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use lovebug_common::{Platform, Severity};
use lovebug_store::{ReportFilter, SearchParams};

use crate::AppState;

// --- Query structs ---

#[derive(Deserialize)]
pub struct ReportsQuery {
    limit: Option<i64>,
    offset: Option<i64>,
    severity: Option<String>,
    platform: Option<String>,
    hours: Option<i64>,
}

#[derive(Deserialize)]
pub struct StatsQuery {
    hours: Option<i64>,
}

#[derive(Deserialize)]
pub struct HotspotsQuery {
    limit: Option<i64>,
    radius: Option<f64>,
    hours: Option<i64>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    keyword: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    radius: Option<f64>,
    severity: Option<String>,
    platform: Option<String>,
    hours: Option<i64>,
    limit: Option<i64>,
}

#[derive(Deserialize)]
pub struct DistrictsQuery {
    hours: Option<i64>,
}

// --- Helpers ---

fn since_from_hours(hours: i64) -> DateTime<Utc> {
    Utc::now() - Duration::hours(hours.clamp(1, 168))
}

// --- Handlers ---

/// `GET /` — service banner.
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "러브버그 맵 API가 실행 중입니다",
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now(),
    }))
}

/// `GET /health` — store ping plus scheduler and live-channel status.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let postgres = match state.reader.ping().await {
        Ok(()) => "connected".to_string(),
        Err(e) => format!("error: {e}"),
    };

    Json(serde_json::json!({
        "api": "running",
        "postgres": postgres,
        "scheduler": "running",
        "websocket_clients": state.registry.count().await,
        "timestamp": Utc::now(),
    }))
}

/// `GET /api/v1/reports` — recent reports, filtered and paginated.
pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportsQuery>,
) -> impl IntoResponse {
    let filter = ReportFilter {
        severity: params.severity.as_deref().and_then(Severity::parse),
        platform: params.platform.as_deref().and_then(Platform::parse),
        since: params.hours.map(since_from_hours),
        limit: params.limit.unwrap_or(100).clamp(1, 1000),
        offset: params.offset.unwrap_or(0).max(0),
    };

    match state.reader.recent(&filter).await {
        Ok(reports) => Json(reports).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to load reports");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `GET /api/v1/reports/{id}` — one report by store id.
pub async fn report_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let uuid = match Uuid::parse_str(&id) {
        Ok(u) => u,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };

    match state.reader.by_id(uuid).await {
        Ok(Some(report)) => Json(report).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to load report");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `GET /api/v1/stats` — aggregated statistics over the last N hours.
pub async fn stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StatsQuery>,
) -> impl IntoResponse {
    let since = since_from_hours(params.hours.unwrap_or(24));

    match state.reader.stats(since).await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to load stats");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `GET /api/v1/hotspots` — report clusters ranked by count.
pub async fn hotspots(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HotspotsQuery>,
) -> impl IntoResponse {
    let since = since_from_hours(params.hours.unwrap_or(24));
    let limit = params.limit.unwrap_or(10).clamp(1, 50);
    let radius = params.radius.unwrap_or(1.0).clamp(0.1, 10.0);

    match state.reader.hotspots(since, limit, radius).await {
        Ok(spots) => Json(spots).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to load hotspots");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `GET /api/v1/search` — keyword / filter / bounding-box search.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> impl IntoResponse {
    let center = match (params.latitude, params.longitude, params.radius) {
        (Some(lat), Some(lng), Some(radius)) => Some((lat, lng, radius.clamp(0.1, 50.0))),
        _ => None,
    };

    let search_params = SearchParams {
        keyword: params.keyword.filter(|k| !k.is_empty()),
        severity: params.severity.as_deref().and_then(Severity::parse),
        platform: params.platform.as_deref().and_then(Platform::parse),
        since: params.hours.map(since_from_hours),
        center,
        limit: params.limit.unwrap_or(50).clamp(1, 200),
    };

    match state.reader.search(&search_params).await {
        Ok(reports) => Json(reports).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to search reports");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// `GET /api/v1/districts` — per-district counts and severity.
pub async fn districts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DistrictsQuery>,
) -> impl IntoResponse {
    let since = since_from_hours(params.hours.unwrap_or(24));

    match state.reader.districts(since).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to load district summary");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
