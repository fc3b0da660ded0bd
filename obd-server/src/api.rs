//! REST API and SSE routes

use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use futures::stream::{Stream, StreamExt as FuturesStreamExt};
use obd_core::{
    aggregate::{self, ChartSeries, Projection, Timeframe},
    diagnostics::DiagnosticInfo,
    model::{EarningsEntry, FieldMask, GeoPoint, TelemetrySample},
    reward::RateCard,
    session::{SessionError, SessionSnapshot, TickEvent},
    source::{self, SourceInfo},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use tower_http::cors::CorsLayer;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/source", get(source_info))
        .route("/api/session", get(session_snapshot))
        .route("/api/sharing/toggle", post(toggle_sharing))
        .route("/api/sharing/tick", post(tick_now))
        .route("/api/earnings", get(earnings))
        .route("/api/earnings/reset", post(reset_earnings))
        .route("/api/dashboard", get(dashboard))
        .route("/api/map", get(map))
        .route("/api/telemetry/stream", get(telemetry_stream))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn session_error_response(e: SessionError) -> (StatusCode, String) {
    match e {
        SessionError::EmptySource { .. } => (StatusCode::CONFLICT, e.to_string()),
        SessionError::MissingSample { .. } => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// Shown by views that need a current reading while sharing is off
#[derive(Serialize)]
struct IdleView {
    sharing: bool,
    message: &'static str,
}

fn idle(message: &'static str) -> Response {
    Json(IdleView {
        sharing: false,
        message,
    })
    .into_response()
}

// === Source & Session Endpoints ===

async fn source_info(State(state): State<AppState>) -> Json<SourceInfo> {
    Json(source::describe(state.store.source()))
}

async fn session_snapshot(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.store.snapshot().await)
}

// === Sharing Commands ===

async fn toggle_sharing(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let sharing = state
        .driver
        .toggle_sharing()
        .await
        .map_err(session_error_response)?;

    Ok(Json(serde_json::json!({ "sharing": sharing })))
}

async fn tick_now(
    State(state): State<AppState>,
) -> Result<Json<TickEvent>, (StatusCode, String)> {
    let event = state
        .driver
        .tick_now()
        .await
        .map_err(session_error_response)?
        .ok_or((StatusCode::CONFLICT, "Sharing is paused".to_string()))?;

    Ok(Json(event))
}

async fn reset_earnings(State(state): State<AppState>) -> impl IntoResponse {
    state.store.reset_earnings().await;
    StatusCode::NO_CONTENT
}

// === Earnings View ===

#[derive(Deserialize)]
struct EarningsQuery {
    timeframe: Option<String>,
}

#[derive(Serialize)]
struct EarningsView {
    sharing: bool,
    total: f64,
    history: Vec<EarningsEntry>,
    projection: Projection,
    chart: ChartSeries,
    rates: RateCard,
}

async fn earnings(
    State(state): State<AppState>,
    Query(query): Query<EarningsQuery>,
) -> Result<Json<EarningsView>, (StatusCode, String)> {
    let timeframe = match query.timeframe {
        Some(raw) => raw
            .parse::<Timeframe>()
            .map_err(|e| (StatusCode::BAD_REQUEST, e))?,
        None => Timeframe::default(),
    };

    let session = state.store.read().await;
    let history = session.earnings_history();

    Ok(Json(EarningsView {
        sharing: session.is_sharing(),
        total: session.cumulative_earnings(),
        history: history.to_vec(),
        projection: session.projection(),
        chart: aggregate::chart_series(history, timeframe, state.chart_window),
        rates: RateCard::current(),
    }))
}

// === Dashboard & Map Views ===

#[derive(Serialize)]
struct DashboardView {
    sharing: bool,
    sample: TelemetrySample,
    speed_history: Vec<f64>,
    rpm_history: Vec<f64>,
    diagnostics: Vec<DiagnosticInfo>,
    vehicle_id: String,
    last_updated: DateTime<Utc>,
}

async fn dashboard(State(state): State<AppState>) -> Response {
    let session = state.store.read().await;
    let sample = match session.current_sample() {
        Some(sample) if session.is_sharing() => sample.clone(),
        _ => return idle("Start sharing data to view your dashboard"),
    };

    Json(DashboardView {
        sharing: true,
        vehicle_id: sample.vehicle_id.clone(),
        last_updated: sample.timestamp,
        speed_history: session.speed_gauge(),
        rpm_history: session.rpm_gauge(),
        diagnostics: session
            .diagnostic_codes_seen()
            .iter()
            .map(|code| DiagnosticInfo::lookup(code))
            .collect(),
        sample,
    })
    .into_response()
}

#[derive(Serialize)]
struct MapView {
    sharing: bool,
    position: GeoPoint,
    speed_kmph: f64,
    route: Vec<GeoPoint>,
}

async fn map(State(state): State<AppState>) -> Response {
    let session = state.store.read().await;
    let sample = match session.current_sample() {
        Some(sample) if session.is_sharing() => sample,
        _ => return idle("Start sharing data to view your location"),
    };

    Json(MapView {
        sharing: true,
        position: sample.position(),
        speed_kmph: sample.speed_kmph.0,
        route: session.route_trail(),
    })
    .into_response()
}

// === Telemetry Stream Endpoint ===

#[derive(Deserialize)]
struct StreamQuery {
    fields: Option<String>,
}

async fn telemetry_stream(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.store.subscribe();
    let field_mask = query.fields.map(|f| FieldMask::parse(&f));

    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        let mask = field_mask.clone();
        async move {
            match result {
                Ok(event) => {
                    // Serialize with field mask
                    let sample = match event.sample.to_value_filtered(mask.as_ref()) {
                        Ok(sample) => sample,
                        Err(e) => {
                            tracing::error!("Failed to serialize sample: {}", e);
                            return None;
                        }
                    };
                    let payload = serde_json::json!({
                        "index": event.index,
                        "reward": event.reward,
                        "cumulative_earnings": event.cumulative_earnings,
                        "timestamp": event.timestamp,
                        "sample": sample,
                    });
                    Some(Ok(Event::default().data(payload.to_string())))
                }
                Err(e) => {
                    tracing::warn!("Broadcast stream error: {}", e);
                    None
                }
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
