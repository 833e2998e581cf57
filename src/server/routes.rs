// HTTP control surface
//
// Small localhost API: one status snapshot plus imperative knobs for the
// pipeline and the tuning parameters. Parameter writes go straight into the
// shared atomics; pipeline start/stop crosses to the engine thread, which
// blocks, so those handlers hop through `spawn_blocking`.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::response::Json;
use axum::routing::{get, post};
use serde::Serialize;
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::audio::device::RenderEndpointFinder;
use crate::audio::format::SampleEncoding;
use crate::audio::parameters::HapticMode;
use crate::server::error::ServerError;
use crate::server::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/start", post(start))
        .route("/stop", post(stop))
        .route("/gain/:value", post(set_gain))
        .route("/frequency/:value", post(set_frequency))
        .route("/generate/:value", post(set_tone_frequency))
        .route("/test-mode/:state", post(set_test_mode))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StickSnapshot {
    ls_x: f32,
    ls_y: f32,
    rs_x: f32,
    rs_y: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    connected: bool,
    running: bool,
    device: String,
    channels: Option<u16>,
    sample_rate: Option<u32>,
    encoding: Option<SampleEncoding>,
    gain: f32,
    filter: f32,
    generator_freq: f32,
    test_mode: bool,
    controller_connected: bool,
    buttons: Vec<&'static str>,
    sticks: StickSnapshot,
}

async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>, ServerError> {
    let filter = state.endpoint_filter.clone();
    let pipeline = Arc::clone(&state.pipeline);

    // Device probe and engine query both block
    let (endpoint, running) = tokio::task::spawn_blocking(move || {
        let info = RenderEndpointFinder::new(filter).probe();
        (info, pipeline.is_running())
    })
    .await
    .map_err(|e| ServerError::Internal(e.to_string()))?;

    let (buttons, sticks) = {
        let guard = state
            .controller_state
            .read()
            .map_err(|_| ServerError::Internal("controller state poisoned".into()))?;
        (
            guard.buttons.names(),
            StickSnapshot {
                ls_x: guard.sticks[0],
                ls_y: guard.sticks[1],
                rs_x: guard.sticks[2],
                rs_y: guard.sticks[3],
            },
        )
    };

    Ok(Json(StatusResponse {
        connected: endpoint.is_some(),
        running,
        device: endpoint
            .as_ref()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "Searching...".to_string()),
        channels: endpoint.as_ref().map(|i| i.channels),
        sample_rate: endpoint.as_ref().map(|i| i.sample_rate),
        encoding: endpoint.as_ref().and_then(|i| i.encoding),
        gain: state.params.gain(),
        filter: state.params.filter_cutoff_hz(),
        generator_freq: state.params.test_tone_hz(),
        test_mode: state.params.mode() == HapticMode::TestTone,
        controller_connected: state.controller_status.is_connected(),
        buttons,
        sticks,
    }))
}

async fn start(State(state): State<AppState>) -> Result<Json<Value>, ServerError> {
    let pipeline = Arc::clone(&state.pipeline);
    tokio::task::spawn_blocking(move || pipeline.start())
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))??;

    info!("haptics started");
    Ok(Json(json!({ "status": "Started" })))
}

async fn stop(State(state): State<AppState>) -> Result<Json<Value>, ServerError> {
    let pipeline = Arc::clone(&state.pipeline);
    tokio::task::spawn_blocking(move || pipeline.stop())
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))??;

    info!("haptics stopped");
    Ok(Json(json!({ "status": "Stopped" })))
}

async fn set_gain(
    State(state): State<AppState>,
    Path(value): Path<f32>,
) -> Result<Json<Value>, ServerError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ServerError::BadRequest(format!(
            "gain must be a non-negative number, got {value}"
        )));
    }

    state.params.set_gain(value);
    info!(gain = value, "gain set");
    Ok(Json(json!({ "gain": state.params.gain() })))
}

async fn set_frequency(
    State(state): State<AppState>,
    Path(value): Path<f32>,
) -> Result<Json<Value>, ServerError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ServerError::BadRequest(format!(
            "cutoff frequency must be positive, got {value}"
        )));
    }

    state.params.set_filter_cutoff_hz(value);
    info!(cutoff_hz = value, "filter cutoff set");
    Ok(Json(json!({ "filter": state.params.filter_cutoff_hz() })))
}

async fn set_tone_frequency(
    State(state): State<AppState>,
    Path(value): Path<f32>,
) -> Result<Json<Value>, ServerError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ServerError::BadRequest(format!(
            "tone frequency must be positive, got {value}"
        )));
    }

    state.params.set_test_tone_hz(value);
    info!(frequency_hz = value, "tone frequency set");
    Ok(Json(json!({ "generatorFreq": state.params.test_tone_hz() })))
}

async fn set_test_mode(
    State(state): State<AppState>,
    Path(value): Path<String>,
) -> Result<Json<Value>, ServerError> {
    // Anything other than an explicit "on" falls back to loopback
    let mode = if value.eq_ignore_ascii_case("on") {
        HapticMode::TestTone
    } else {
        HapticMode::Loopback
    };

    state.params.set_mode(mode);
    info!(test_mode = mode == HapticMode::TestTone, "mode switched");
    Ok(Json(json!({ "testMode": mode == HapticMode::TestTone })))
}
