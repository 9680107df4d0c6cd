use std::sync::Arc;

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use tracing::info;

use crate::auth::AdminUser;
use crate::controller::AppState;
use crate::errors::ApiError;
use crate::models::stall::{AvailabilityResponse, Stall, StallSize, StallStats, StallStatus};
use crate::repositories::stalls_repo::{NewStall, StallChanges, StallsRepo};

pub fn router(app_state: AppState) -> Router {
    let stalls_repo = Arc::new(StallsRepo::new(app_state.postgres_connection));

    Router::new()
        .route("/", get(get_all_stalls).post(create_stall))
        .route("/available", get(get_available_stalls))
        .route("/search", get(search_stalls))
        .route("/status/:status", get(get_stalls_by_status))
        .route("/admin/stats", get(get_stall_stats))
        .route(
            "/:id",
            get(get_stall).put(update_stall).delete(delete_stall),
        )
        .route("/:id/status", patch(update_stall_status))
        .route("/:id/availability", get(check_stall_availability))
        .route_layer(Extension(stalls_repo))
}

/// Read endpoints are public so the portal can show the floor before login;
/// every mutation below is admin-only.
pub async fn get_all_stalls(
    Extension(stalls_repo): Extension<Arc<StallsRepo>>,
) -> Result<Json<Vec<Stall>>, ApiError> {
    Ok(Json(stalls_repo.list_stalls().await?))
}

#[derive(Clone, Deserialize, Debug)]
pub struct AvailableStallsQuery {
    pub size: Option<String>,
    pub location: Option<String>,
}

pub async fn get_available_stalls(
    Extension(stalls_repo): Extension<Arc<StallsRepo>>,
    Query(query): Query<AvailableStallsQuery>,
) -> Result<Json<Vec<Stall>>, ApiError> {
    let size = query
        .size
        .map(|s| s.parse::<StallSize>())
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let stalls = stalls_repo
        .list_available(size, query.location.as_deref())
        .await?;
    Ok(Json(stalls))
}

#[derive(Clone, Deserialize, Debug)]
pub struct SearchQuery {
    pub q: String,
}

pub async fn search_stalls(
    Extension(stalls_repo): Extension<Arc<StallsRepo>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Stall>>, ApiError> {
    Ok(Json(stalls_repo.search(&query.q).await?))
}

pub async fn get_stalls_by_status(
    Extension(stalls_repo): Extension<Arc<StallsRepo>>,
    Path(status): Path<String>,
) -> Result<Json<Vec<Stall>>, ApiError> {
    let status = status
        .parse::<StallStatus>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok(Json(stalls_repo.list_by_status(status).await?))
}

pub async fn get_stall_stats(
    _admin: AdminUser,
    Extension(stalls_repo): Extension<Arc<StallsRepo>>,
) -> Result<Json<StallStats>, ApiError> {
    Ok(Json(stalls_repo.stats().await?))
}

pub async fn get_stall(
    Extension(stalls_repo): Extension<Arc<StallsRepo>>,
    Path(id): Path<i64>,
) -> Result<Json<Stall>, ApiError> {
    let stall = stalls_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Stall not found with id: {}", id)))?;

    Ok(Json(stall))
}

pub async fn check_stall_availability(
    Extension(stalls_repo): Extension<Arc<StallsRepo>>,
    Path(id): Path<i64>,
) -> Result<Json<AvailabilityResponse>, ApiError> {
    let response = match stalls_repo.find_by_id(id).await? {
        Some(stall) => AvailabilityResponse::for_stall(&stall),
        None => AvailabilityResponse::not_found(),
    };

    Ok(Json(response))
}

#[derive(Clone, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateStallRequest {
    pub stall_code: String,
    pub name: Option<String>,
    pub size: StallSize,
    pub status: Option<StallStatus>,
    pub price: f64,
    pub location: Option<String>,
    pub description: Option<String>,
}

pub async fn create_stall(
    _admin: AdminUser,
    Extension(stalls_repo): Extension<Arc<StallsRepo>>,
    Json(body): Json<CreateStallRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if body.stall_code.trim().is_empty() {
        return Err(ApiError::BadRequest("Stall code is required".to_string()));
    }

    if stalls_repo.stall_code_exists(&body.stall_code).await? {
        return Err(ApiError::Conflict(format!(
            "Stall with code '{}' already exists",
            body.stall_code
        )));
    }

    let stall = stalls_repo
        .insert_stall(NewStall {
            stall_code: body.stall_code,
            name: body.name,
            size: body.size,
            status: body.status.unwrap_or(StallStatus::Available),
            price: body.price,
            location: body.location,
            description: body.description,
        })
        .await?;

    info!("Created stall {} ({})", stall.stall_code, stall.id);
    Ok((StatusCode::CREATED, Json(stall)))
}

#[derive(Clone, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStallRequest {
    pub name: Option<String>,
    pub size: Option<StallSize>,
    pub price: Option<f64>,
    pub location: Option<String>,
    pub description: Option<String>,
}

pub async fn update_stall(
    _admin: AdminUser,
    Extension(stalls_repo): Extension<Arc<StallsRepo>>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateStallRequest>,
) -> Result<Json<Stall>, ApiError> {
    let changes = StallChanges {
        name: body.name,
        size: body.size,
        price: body.price,
        location: body.location,
        description: body.description,
    };

    let stall = stalls_repo
        .update_stall(id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Stall not found with id: {}", id)))?;

    Ok(Json(stall))
}

#[derive(Clone, Deserialize, Debug)]
pub struct StallStatusRequest {
    pub status: String,
}

pub async fn update_stall_status(
    _admin: AdminUser,
    Extension(stalls_repo): Extension<Arc<StallsRepo>>,
    Path(id): Path<i64>,
    Json(body): Json<StallStatusRequest>,
) -> Result<Json<Stall>, ApiError> {
    let status = body
        .status
        .parse::<StallStatus>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let stall = stalls_repo
        .update_status(id, status)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Stall not found with id: {}", id)))?;

    info!("Stall {} status set to {}", id, status);
    Ok(Json(stall))
}

pub async fn delete_stall(
    _admin: AdminUser,
    Extension(stalls_repo): Extension<Arc<StallsRepo>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !stalls_repo.delete_stall(id).await? {
        return Err(ApiError::NotFound(format!(
            "Stall not found with id: {}",
            id
        )));
    }

    info!("Deleted stall {}", id);
    Ok(StatusCode::NO_CONTENT)
}
