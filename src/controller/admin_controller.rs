use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use crate::auth::AdminUser;
use crate::controller::AppState;
use crate::errors::ApiError;
use crate::repositories::reservations_repo::ReservationsRepo;
use crate::repositories::stalls_repo::StallsRepo;
use crate::repositories::users_repo::UsersRepo;
use crate::repositories::PgPool;

pub fn router(app_state: AppState) -> Router {
    let stalls_repo = Arc::new(StallsRepo::new(app_state.postgres_connection.clone()));
    let reservations_repo = Arc::new(ReservationsRepo::new(app_state.postgres_connection.clone()));
    let users_repo = Arc::new(UsersRepo::new(app_state.postgres_connection.clone()));

    Router::new()
        .route("/stats", get(get_dashboard_stats))
        .route("/health", get(get_system_health))
        .route_layer(Extension(stalls_repo))
        .route_layer(Extension(reservations_repo))
        .route_layer(Extension(users_repo))
        .route_layer(Extension(app_state.postgres_connection))
}

#[derive(Clone, Copy, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_stalls: i64,
    pub available_stalls: i64,
    pub reserved_stalls: i64,
    pub total_reservations: i64,
    pub pending_reservations: i64,
    pub total_users: i64,
}

pub async fn get_dashboard_stats(
    _admin: AdminUser,
    Extension(stalls_repo): Extension<Arc<StallsRepo>>,
    Extension(reservations_repo): Extension<Arc<ReservationsRepo>>,
    Extension(users_repo): Extension<Arc<UsersRepo>>,
) -> Result<Json<DashboardStats>, ApiError> {
    let stall_stats = stalls_repo.stats().await?;
    let reservation_stats = reservations_repo.stats().await?;
    let total_users = users_repo.count_users().await?;

    Ok(Json(DashboardStats {
        total_stalls: stall_stats.total_stalls,
        available_stalls: stall_stats.available_stalls,
        reserved_stalls: stall_stats.reserved_stalls,
        total_reservations: reservation_stats.total_reservations,
        pending_reservations: reservation_stats.pending_reservations,
        total_users,
    }))
}

pub async fn get_system_health(
    _admin: AdminUser,
    Extension(pool): Extension<PgPool>,
) -> impl IntoResponse {
    let database_up = match pool.get().await {
        Ok(conn) => conn.query_one("SELECT 1;", &[]).await.is_ok(),
        Err(e) => {
            warn!("Health probe failed to reach the pool due to: {}", e);
            false
        }
    };

    if database_up {
        (StatusCode::OK, Json(json!({"status": "ok", "database": "up"}))).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "degraded", "database": "down"})),
        )
            .into_response()
    }
}
