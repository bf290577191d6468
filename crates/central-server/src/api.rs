use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use infrastructure::database::entities::{actions, cameras, device_models, devices};
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use crate::state::AppState;

/// CRUD surface over Devices/DeviceModels/Actions/Cameras. Deliberately
/// thin: no rule evaluation, no MQTT — that all lives in `edge-agent`.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/api/devices", get(list_devices).post(create_device))
        .route("/api/devices/{id}", get(get_device).put(update_device).delete(delete_device))
        .route("/api/device-models", get(list_device_models))
        .route("/api/actions", get(list_actions).post(create_action))
        .route("/api/actions/{id}", get(get_action).put(update_action).delete(delete_action))
        .route("/api/cameras", get(list_cameras))
        .layer(cors)
        .with_state(state)
}

fn db_err(e: sea_orm::DbErr) -> (StatusCode, String) {
    error!("database error: {e}");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

async fn list_devices(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match devices::Entity::find().all(&state.db).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => db_err(e).into_response(),
    }
}

async fn get_device(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> impl IntoResponse {
    match devices::Entity::find_by_id(id).one(&state.db).await {
        Ok(Some(device)) => Json(device).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => db_err(e).into_response(),
    }
}

#[derive(Deserialize)]
struct CreateDevice {
    mqtt_client_id: String,
    topic_prefix: String,
    model_id: i64,
    #[serde(default)]
    parameters: serde_json::Value,
    #[serde(default)]
    poll_interval: i64,
    #[serde(default = "default_poll_unit")]
    poll_interval_unit: String,
}

fn default_poll_unit() -> String {
    "seconds".to_string()
}

async fn create_device(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateDevice>,
) -> impl IntoResponse {
    let now = chrono::Utc::now().fixed_offset();
    let model = devices::ActiveModel {
        mqtt_client_id: Set(body.mqtt_client_id),
        topic_prefix: Set(body.topic_prefix),
        model_id: Set(body.model_id),
        enabled: Set(true),
        parameters: Set(body.parameters),
        values: Set(serde_json::json!({})),
        status: Set("offline".to_string()),
        last_seen: Set(None),
        poll_interval: Set(body.poll_interval),
        poll_interval_unit: Set(body.poll_interval_unit),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    match model.insert(&state.db).await {
        Ok(device) => (StatusCode::CREATED, Json(device)).into_response(),
        Err(e) => db_err(e).into_response(),
    }
}

#[derive(Deserialize)]
struct UpdateDevice {
    topic_prefix: Option<String>,
    enabled: Option<bool>,
    parameters: Option<serde_json::Value>,
    poll_interval: Option<i64>,
}

async fn update_device(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateDevice>,
) -> impl IntoResponse {
    let existing = match devices::Entity::find_by_id(id).one(&state.db).await {
        Ok(Some(d)) => d,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => return db_err(e).into_response(),
    };

    let mut active: devices::ActiveModel = existing.into();
    if let Some(topic_prefix) = body.topic_prefix {
        active.topic_prefix = Set(topic_prefix);
    }
    if let Some(enabled) = body.enabled {
        active.enabled = Set(enabled);
    }
    if let Some(parameters) = body.parameters {
        active.parameters = Set(parameters);
    }
    if let Some(poll_interval) = body.poll_interval {
        active.poll_interval = Set(poll_interval);
    }
    active.updated_at = Set(chrono::Utc::now().fixed_offset());

    match active.update(&state.db).await {
        Ok(device) => Json(device).into_response(),
        Err(e) => db_err(e).into_response(),
    }
}

async fn delete_device(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> impl IntoResponse {
    match devices::Entity::delete_by_id(id).exec(&state.db).await {
        Ok(res) if res.rows_affected > 0 => StatusCode::NO_CONTENT.into_response(),
        Ok(_) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => db_err(e).into_response(),
    }
}

async fn list_device_models(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match device_models::Entity::find().all(&state.db).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => db_err(e).into_response(),
    }
}

async fn list_actions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match actions::Entity::find().all(&state.db).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => db_err(e).into_response(),
    }
}

async fn get_action(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> impl IntoResponse {
    match actions::Entity::find_by_id(id).one(&state.db).await {
        Ok(Some(action)) => Json(action).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => db_err(e).into_response(),
    }
}

#[derive(Deserialize)]
struct CreateAction {
    name: String,
    #[serde(default)]
    description: String,
    chain: serde_json::Value,
}

async fn create_action(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateAction>,
) -> impl IntoResponse {
    let now = chrono::Utc::now().fixed_offset();
    let model = actions::ActiveModel {
        name: Set(body.name),
        description: Set(body.description),
        enabled: Set(true),
        chain: Set(body.chain),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    match model.insert(&state.db).await {
        Ok(action) => (StatusCode::CREATED, Json(action)).into_response(),
        Err(e) => db_err(e).into_response(),
    }
}

#[derive(Deserialize)]
struct UpdateAction {
    description: Option<String>,
    enabled: Option<bool>,
    chain: Option<serde_json::Value>,
}

async fn update_action(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateAction>,
) -> impl IntoResponse {
    let existing = match actions::Entity::find_by_id(id).one(&state.db).await {
        Ok(Some(a)) => a,
        Ok(None) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => return db_err(e).into_response(),
    };

    let mut active: actions::ActiveModel = existing.into();
    if let Some(description) = body.description {
        active.description = Set(description);
    }
    if let Some(enabled) = body.enabled {
        active.enabled = Set(enabled);
    }
    if let Some(chain) = body.chain {
        active.chain = Set(chain);
    }
    active.updated_at = Set(chrono::Utc::now().fixed_offset());

    match active.update(&state.db).await {
        Ok(action) => Json(action).into_response(),
        Err(e) => db_err(e).into_response(),
    }
}

async fn delete_action(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> impl IntoResponse {
    match actions::Entity::delete_by_id(id).exec(&state.db).await {
        Ok(res) if res.rows_affected > 0 => StatusCode::NO_CONTENT.into_response(),
        Ok(_) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => db_err(e).into_response(),
    }
}

async fn list_cameras(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match cameras::Entity::find().all(&state.db).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => db_err(e).into_response(),
    }
}
