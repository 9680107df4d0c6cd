use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Router};
use tracing::warn;

use crate::controller::AppState;
use crate::repositories::PgPool;

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(get_health_check))
        .route("/health/ready", get(get_readiness_check))
        .layer(Extension(app_state.postgres_connection))
}

async fn get_health_check() -> Result<StatusCode, StatusCode> {
    Ok(StatusCode::OK)
}

/// Readiness requires a live database round trip.
async fn get_readiness_check(Extension(pool): Extension<PgPool>) -> impl IntoResponse {
    let conn = match pool.get().await {
        Ok(conn) => conn,
        Err(e) => {
            warn!("Readiness check failed to reach the pool due to: {}", e);
            return (StatusCode::SERVICE_UNAVAILABLE, "Database unavailable").into_response();
        }
    };

    match conn.query_one("SELECT 1;", &[]).await {
        Ok(_) => StatusCode::OK.into_response(),
        Err(e) => {
            warn!("Readiness probe query failed due to: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "Database unavailable").into_response()
        }
    }
}
