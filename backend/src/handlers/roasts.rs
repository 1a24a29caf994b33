//! HTTP handlers for roast import endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::{ImportReport, ImportService};
use crate::store::RoastProfile;
use crate::AppState;

fn import_service(state: &AppState) -> ImportService {
    ImportService::new(state.store.clone(), state.config.import.target_unit)
}

/// Import a logger export as a new roast profile
pub async fn import_roast(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(payload): Json<Value>,
) -> AppResult<(StatusCode, Json<ImportReport>)> {
    let report = import_service(&state)
        .import_new(current_user.0.user_id, payload)
        .await?;
    Ok((StatusCode::CREATED, Json(report)))
}

/// Get a roast profile summary by ID
pub async fn get_roast(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(roast_id): Path<Uuid>,
) -> AppResult<Json<RoastProfile>> {
    let profile = import_service(&state)
        .get_profile(current_user.0.user_id, roast_id)
        .await?;
    Ok(Json(profile))
}

/// Replace a roast's data with a new export
pub async fn reimport_roast(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(roast_id): Path<Uuid>,
    Json(payload): Json<Value>,
) -> AppResult<Json<ImportReport>> {
    let report = import_service(&state)
        .reimport(current_user.0.user_id, roast_id, payload)
        .await?;
    Ok(Json(report))
}

/// Delete a roast's imported rows, keeping the profile summary
pub async fn clear_roast_data(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(roast_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    import_service(&state)
        .clear_roast_data(current_user.0.user_id, roast_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
