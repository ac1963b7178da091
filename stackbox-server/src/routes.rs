use crate::error::{ApiError, Result as ApiResult};
use crate::health;

use std::panic::Location;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use error_location::ErrorLocation;
use serde_json::{Value, json};
use stackbox_config::ServiceKey;
use stackbox_supervisor::{ControlPanel, SupervisorError};
use tower_http::cors::{Any, CorsLayer};

pub type AppState = Arc<ControlPanel>;

/// Build the application router with all endpoints
pub fn build_router(panel: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/binaries", get(binaries))
        .route("/bootstrap", post(bootstrap))
        .route("/services", get(services))
        .route("/services/{key}", get(service_status))
        .route("/services/{key}/toggle", post(toggle_service))
        .route("/backup", post(backup))
        .route("/interpreters", get(interpreters))
        .route("/interpreters/{version}/activate", post(activate_interpreter))
        .route("/interpreters/{version}/shell", post(interpreter_shell))
        .route("/debug/paths", get(debug_paths))
        .with_state(panel)
        // Local frontends only, but they may be served from any origin
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

fn parse_key(key: &str) -> ApiResult<ServiceKey> {
    key.parse().map_err(|_| {
        ApiError::from(SupervisorError::UnknownService {
            key: key.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })
    })
}

async fn binaries(State(panel): State<AppState>) -> Json<Value> {
    Json(json!({ "binaries": panel.check_binaries() }))
}

async fn bootstrap(State(panel): State<AppState>) -> ApiResult<Json<Value>> {
    let report = panel.create_directory_structure().await?;
    Ok(Json(json!({ "bootstrap": report })))
}

async fn services(State(panel): State<AppState>) -> Json<Value> {
    Json(json!(panel.status_all().await))
}

async fn service_status(
    State(panel): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<Value>> {
    let key = parse_key(&key)?;
    let snapshot = panel.status(&key)?;
    Ok(Json(json!(snapshot)))
}

async fn toggle_service(
    State(panel): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<Value>> {
    let key = parse_key(&key)?;
    let running = panel.toggle(&key).await?;
    Ok(Json(json!({ "service": key.to_string(), "running": running })))
}

async fn backup(State(panel): State<AppState>) -> ApiResult<Json<Value>> {
    let report = panel.backup_database().await?;
    Ok(Json(json!({ "backup": report })))
}

async fn interpreters(State(panel): State<AppState>) -> Json<Value> {
    Json(json!({ "interpreters": panel.interpreters().await }))
}

async fn activate_interpreter(
    State(panel): State<AppState>,
    Path(version): Path<String>,
) -> ApiResult<Json<Value>> {
    let active = panel.activate_interpreter(&version).await?;
    Ok(Json(json!({ "active": active.to_string() })))
}

async fn interpreter_shell(
    State(panel): State<AppState>,
    Path(version): Path<String>,
) -> ApiResult<Json<Value>> {
    let outcome = panel.open_interpreter_shell(&version).await?;
    Ok(Json(json!({ "shell": outcome })))
}

async fn debug_paths(State(panel): State<AppState>) -> Json<Value> {
    Json(json!(panel.debug_paths().await))
}
