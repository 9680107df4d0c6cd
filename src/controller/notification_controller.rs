use std::sync::Arc;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{delete, get, patch, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{AdminUser, AuthUser};
use crate::controller::AppState;
use crate::errors::ApiError;
use crate::models::notification::{Notification, NotificationKind, NotificationStats};
use crate::repositories::notifications_repo::NotificationsRepo;
use crate::repositories::users_repo::UsersRepo;

pub fn router(app_state: AppState) -> Router {
    let notifications_repo = Arc::new(NotificationsRepo::new(
        app_state.postgres_connection.clone(),
    ));
    let users_repo = Arc::new(UsersRepo::new(app_state.postgres_connection));

    Router::new()
        .route("/", get(get_notifications))
        .route("/count/unread", get(get_unread_count))
        .route("/read-all", patch(mark_all_read))
        .route("/stats", get(get_notification_stats))
        .route("/send", post(send_notification))
        .route("/broadcast", post(broadcast_notification))
        .route("/:id", delete(delete_notification))
        .route("/:id/read", patch(mark_notification_read))
        .route_layer(Extension(notifications_repo))
        .route_layer(Extension(users_repo))
}

pub async fn get_notifications(
    Extension(notifications_repo): Extension<Arc<NotificationsRepo>>,
    user: AuthUser,
) -> Result<Json<Vec<Notification>>, ApiError> {
    Ok(Json(notifications_repo.list_for_user(user.user_id).await?))
}

#[derive(Clone, Copy, Serialize, Debug)]
pub struct UnreadCountResponse {
    pub count: i64,
}

pub async fn get_unread_count(
    Extension(notifications_repo): Extension<Arc<NotificationsRepo>>,
    user: AuthUser,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let count = notifications_repo.unread_count(user.user_id).await?;
    Ok(Json(UnreadCountResponse { count }))
}

pub async fn mark_notification_read(
    Extension(notifications_repo): Extension<Arc<NotificationsRepo>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !notifications_repo.mark_read(id, user.user_id).await? {
        return Err(ApiError::NotFound(format!(
            "Notification not found with id: {}",
            id
        )));
    }

    Ok(StatusCode::OK)
}

#[derive(Clone, Copy, Serialize, Debug)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

pub async fn mark_all_read(
    Extension(notifications_repo): Extension<Arc<NotificationsRepo>>,
    user: AuthUser,
) -> Result<Json<MarkAllReadResponse>, ApiError> {
    let updated = notifications_repo.mark_all_read(user.user_id).await?;
    Ok(Json(MarkAllReadResponse { updated }))
}

pub async fn delete_notification(
    Extension(notifications_repo): Extension<Arc<NotificationsRepo>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !notifications_repo
        .delete_notification(id, user.user_id)
        .await?
    {
        return Err(ApiError::NotFound(format!(
            "Notification not found with id: {}",
            id
        )));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_notification_stats(
    Extension(notifications_repo): Extension<Arc<NotificationsRepo>>,
    user: AuthUser,
) -> Result<Json<NotificationStats>, ApiError> {
    Ok(Json(notifications_repo.stats_for_user(user.user_id).await?))
}

#[derive(Clone, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationRequest {
    pub user_id: i64,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
}

pub async fn send_notification(
    _admin: AdminUser,
    Extension(notifications_repo): Extension<Arc<NotificationsRepo>>,
    Extension(users_repo): Extension<Arc<UsersRepo>>,
    Json(body): Json<SendNotificationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if users_repo.find_by_id(body.user_id).await?.is_none() {
        return Err(ApiError::NotFound(format!(
            "User not found with id: {}",
            body.user_id
        )));
    }

    let notification = notifications_repo
        .insert_notification(body.user_id, &body.title, &body.message, body.kind, None)
        .await?;

    info!("Notification {} sent to user {}", notification.id, body.user_id);
    Ok((StatusCode::CREATED, Json(notification)))
}

#[derive(Clone, Deserialize, Debug)]
pub struct BroadcastNotificationRequest {
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
}

#[derive(Clone, Copy, Serialize, Debug)]
pub struct BroadcastResponse {
    pub recipients: u64,
}

pub async fn broadcast_notification(
    _admin: AdminUser,
    Extension(notifications_repo): Extension<Arc<NotificationsRepo>>,
    Json(body): Json<BroadcastNotificationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let recipients = notifications_repo
        .insert_for_all_users(&body.title, &body.message, body.kind)
        .await?;

    info!("Broadcast notification delivered to {} users", recipients);
    Ok((StatusCode::CREATED, Json(BroadcastResponse { recipients })))
}
