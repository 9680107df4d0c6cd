use std::sync::Arc;

use axum::extract::{Path, Query};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, patch, post};
use axum::{Extension, Json, Router};
use serde::Deserialize;
use time::Date;
use tracing::info;
use uuid::Uuid;

use crate::auth::{AdminUser, AuthUser};
use crate::controller::{AppState, ReservationPolicy};
use crate::errors::ApiError;
use crate::models::notification::NotificationKind;
use crate::models::reservation::{
    QrCodeResponse, Reservation, ReservationStats, ReservationStatus,
};
use crate::models::stall::StallStatus;
use crate::repositories::notifications_repo::NotificationsRepo;
use crate::repositories::reservations_repo::{NewReservation, ReservationsRepo};
use crate::repositories::stalls_repo::StallsRepo;

pub fn router(app_state: AppState) -> Router {
    let reservations_repo = Arc::new(ReservationsRepo::new(app_state.postgres_connection.clone()));
    let stalls_repo = Arc::new(StallsRepo::new(app_state.postgres_connection.clone()));
    let notifications_repo = Arc::new(NotificationsRepo::new(app_state.postgres_connection));

    Router::new()
        .route("/", post(create_reservation))
        .route("/my-reservations", get(get_my_reservations))
        .route("/search", get(search_reservations))
        .route("/verify-qr", get(verify_qr_code))
        .route("/admin/all", get(get_all_reservations))
        .route("/admin/status/:status", get(get_reservations_by_status))
        .route("/admin/stats", get(get_reservation_stats))
        .route("/user/:user_id", get(get_user_reservations))
        .route("/:id", get(get_reservation).delete(delete_reservation))
        .route("/:id/cancel", patch(cancel_reservation))
        .route("/:id/status", patch(update_reservation_status))
        .route("/:id/qrcode", get(get_reservation_qr_code))
        .route_layer(Extension(reservations_repo))
        .route_layer(Extension(stalls_repo))
        .route_layer(Extension(notifications_repo))
        .route_layer(Extension(app_state.reservation_policy))
}

#[derive(Clone, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    pub stall_ids: Vec<i64>,
    pub business_name: Option<String>,
    pub contact_person: Option<String>,
    pub start_date: Date,
    pub end_date: Date,
    pub notes: Option<String>,
}

pub async fn create_reservation(
    Extension(reservations_repo): Extension<Arc<ReservationsRepo>>,
    Extension(stalls_repo): Extension<Arc<StallsRepo>>,
    Extension(notifications_repo): Extension<Arc<NotificationsRepo>>,
    Extension(policy): Extension<ReservationPolicy>,
    user: AuthUser,
    Json(body): Json<CreateReservationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if body.stall_ids.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one stall must be selected".to_string(),
        ));
    }
    validate_date_range(body.start_date, body.end_date)?;

    let held = reservations_repo
        .count_active_stalls_for_user(user.user_id)
        .await?;
    let requested = body.stall_ids.len() as i64;
    if held + requested > policy.max_stalls_per_vendor {
        return Err(ApiError::Conflict(format!(
            "Cannot reserve more than {} stalls. You currently have {} stalls reserved.",
            policy.max_stalls_per_vendor, held
        )));
    }

    let stalls = stalls_repo.list_by_ids(&body.stall_ids).await?;
    for stall_id in &body.stall_ids {
        if !stalls.iter().any(|stall| stall.id == *stall_id) {
            return Err(ApiError::NotFound(format!(
                "Stall not found with id: {}",
                stall_id
            )));
        }
    }
    for stall in &stalls {
        if stall.status != StallStatus::Available {
            return Err(ApiError::Conflict(format!(
                "Stall {} is not available",
                stall.stall_code
            )));
        }
    }
    for stall_id in &body.stall_ids {
        let overlapping = reservations_repo
            .count_overlapping(*stall_id, body.start_date, body.end_date)
            .await?;
        if overlapping > 0 {
            return Err(ApiError::Conflict(format!(
                "Stall {} is not available for the selected dates",
                stall_id
            )));
        }
    }

    let total_price: f64 = stalls.iter().map(|stall| stall.price).sum();

    let reservation = reservations_repo
        .insert_reservation(NewReservation {
            user_id: user.user_id,
            user_email: user.email.clone(),
            business_name: body.business_name,
            contact_person: body.contact_person,
            stall_ids: body.stall_ids.clone(),
            start_date: body.start_date,
            end_date: body.end_date,
            total_price,
            notes: body.notes,
        })
        .await?;

    let qr_code = generate_qr_code(reservation.id, user.user_id);
    reservations_repo
        .set_qr_code(reservation.id, &qr_code)
        .await?;

    // Reservations auto-confirm; payment collection happens off-platform
    let reservation = reservations_repo
        .confirm(reservation.id)
        .await?
        .ok_or_else(|| {
            ApiError::Internal(anyhow::anyhow!(
                "Reservation {} vanished during confirmation",
                reservation.id
            ))
        })?;

    stalls_repo
        .set_status_many(&body.stall_ids, StallStatus::Reserved)
        .await?;

    notifications_repo
        .insert_notification(
            user.user_id,
            "Stall Reservation Confirmation",
            &format!(
                "Reservation #{} for {} stall(s) from {} to {} is confirmed.",
                reservation.id, requested, reservation.start_date, reservation.end_date
            ),
            NotificationKind::Reservation,
            Some(&reservation.id.to_string()),
        )
        .await?;

    info!(
        "Reservation {} created for user {} covering {} stall(s)",
        reservation.id, user.user_id, requested
    );

    Ok((StatusCode::CREATED, Json(reservation)))
}

pub async fn get_my_reservations(
    Extension(reservations_repo): Extension<Arc<ReservationsRepo>>,
    user: AuthUser,
) -> Result<Json<Vec<Reservation>>, ApiError> {
    Ok(Json(reservations_repo.list_for_user(user.user_id).await?))
}

pub async fn get_reservation(
    Extension(reservations_repo): Extension<Arc<ReservationsRepo>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Reservation>, ApiError> {
    let reservation = find_owned_reservation(&reservations_repo, id, &user).await?;
    Ok(Json(reservation))
}

#[derive(Clone, Deserialize, Debug)]
pub struct CancelReservationRequest {
    pub reason: Option<String>,
}

pub async fn cancel_reservation(
    Extension(reservations_repo): Extension<Arc<ReservationsRepo>>,
    Extension(stalls_repo): Extension<Arc<StallsRepo>>,
    Extension(notifications_repo): Extension<Arc<NotificationsRepo>>,
    user: AuthUser,
    Path(id): Path<i64>,
    body: Option<Json<CancelReservationRequest>>,
) -> Result<Json<Reservation>, ApiError> {
    let reason = body.and_then(|Json(request)| request.reason);
    let cancelled = do_cancel(
        &reservations_repo,
        &stalls_repo,
        &notifications_repo,
        &user,
        id,
        reason,
    )
    .await?;
    Ok(Json(cancelled))
}

/// The admin console cancels through the DELETE verb.
pub async fn delete_reservation(
    Extension(reservations_repo): Extension<Arc<ReservationsRepo>>,
    Extension(stalls_repo): Extension<Arc<StallsRepo>>,
    Extension(notifications_repo): Extension<Arc<NotificationsRepo>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Reservation>, ApiError> {
    let cancelled = do_cancel(
        &reservations_repo,
        &stalls_repo,
        &notifications_repo,
        &user,
        id,
        None,
    )
    .await?;
    Ok(Json(cancelled))
}

#[derive(Clone, Deserialize, Debug)]
pub struct ReservationStatusRequest {
    pub status: String,
}

pub async fn update_reservation_status(
    Extension(reservations_repo): Extension<Arc<ReservationsRepo>>,
    Extension(stalls_repo): Extension<Arc<StallsRepo>>,
    Extension(notifications_repo): Extension<Arc<NotificationsRepo>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(body): Json<ReservationStatusRequest>,
) -> Result<Json<Reservation>, ApiError> {
    let target = body
        .status
        .parse::<ReservationStatus>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let reservation = reservations_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Reservation not found with id: {}", id)))?;

    if !reservation.status.can_transition_to(target) {
        return Err(ApiError::BadRequest(format!(
            "Cannot change reservation status from {} to {}",
            reservation.status, target
        )));
    }

    let updated = match target {
        ReservationStatus::Confirmed => {
            let updated = reservations_repo.confirm(id).await?;
            notifications_repo
                .insert_notification(
                    reservation.user_id,
                    "Stall Reservation Confirmation",
                    &format!("Reservation #{} has been confirmed.", id),
                    NotificationKind::Reservation,
                    Some(&id.to_string()),
                )
                .await?;
            updated
        }
        ReservationStatus::Cancelled => {
            let updated = reservations_repo.cancel(id, None).await?;
            stalls_repo
                .set_status_many(&reservation.stall_ids, StallStatus::Available)
                .await?;
            notifications_repo
                .insert_notification(
                    reservation.user_id,
                    "Reservation Cancelled",
                    &format!("Reservation #{} has been cancelled.", id),
                    NotificationKind::Reservation,
                    Some(&id.to_string()),
                )
                .await?;
            updated
        }
        ReservationStatus::Completed => {
            let updated = reservations_repo.complete(id).await?;
            stalls_repo
                .set_status_many(&reservation.stall_ids, StallStatus::Available)
                .await?;
            updated
        }
        ReservationStatus::Pending => None,
    };

    let updated = updated
        .ok_or_else(|| ApiError::NotFound(format!("Reservation not found with id: {}", id)))?;

    info!("Reservation {} status set to {}", id, target);
    Ok(Json(updated))
}

pub async fn get_all_reservations(
    _admin: AdminUser,
    Extension(reservations_repo): Extension<Arc<ReservationsRepo>>,
) -> Result<Json<Vec<Reservation>>, ApiError> {
    Ok(Json(reservations_repo.list_all().await?))
}

pub async fn get_reservations_by_status(
    _admin: AdminUser,
    Extension(reservations_repo): Extension<Arc<ReservationsRepo>>,
    Path(status): Path<String>,
) -> Result<Json<Vec<Reservation>>, ApiError> {
    let status = status
        .parse::<ReservationStatus>()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    Ok(Json(reservations_repo.list_by_status(status).await?))
}

pub async fn get_reservation_stats(
    _admin: AdminUser,
    Extension(reservations_repo): Extension<Arc<ReservationsRepo>>,
) -> Result<Json<ReservationStats>, ApiError> {
    Ok(Json(reservations_repo.stats().await?))
}

pub async fn get_user_reservations(
    _admin: AdminUser,
    Extension(reservations_repo): Extension<Arc<ReservationsRepo>>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Reservation>>, ApiError> {
    Ok(Json(reservations_repo.list_for_user(user_id).await?))
}

#[derive(Clone, Deserialize, Debug)]
pub struct SearchQuery {
    pub q: String,
}

pub async fn search_reservations(
    _admin: AdminUser,
    Extension(reservations_repo): Extension<Arc<ReservationsRepo>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Reservation>>, ApiError> {
    Ok(Json(reservations_repo.search(&query.q).await?))
}

pub async fn get_reservation_qr_code(
    Extension(reservations_repo): Extension<Arc<ReservationsRepo>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<QrCodeResponse>, ApiError> {
    let reservation = find_owned_reservation(&reservations_repo, id, &user).await?;

    let qr_code = reservation.qr_code.ok_or_else(|| {
        ApiError::NotFound("QR code not found for this reservation".to_string())
    })?;

    Ok(Json(QrCodeResponse { qr_code }))
}

#[derive(Clone, Deserialize, Debug)]
pub struct VerifyQrQuery {
    pub code: String,
}

/// Gate-entry validation; deliberately unauthenticated.
pub async fn verify_qr_code(
    Extension(reservations_repo): Extension<Arc<ReservationsRepo>>,
    Query(query): Query<VerifyQrQuery>,
) -> Result<Json<Reservation>, ApiError> {
    let reservation = reservations_repo
        .find_by_qr_code(&query.code)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invalid QR code".to_string()))?;

    Ok(Json(reservation))
}

async fn do_cancel(
    reservations_repo: &ReservationsRepo,
    stalls_repo: &StallsRepo,
    notifications_repo: &NotificationsRepo,
    user: &AuthUser,
    id: i64,
    reason: Option<String>,
) -> Result<Reservation, ApiError> {
    let reservation = find_owned_reservation(reservations_repo, id, user).await?;

    match reservation.status {
        ReservationStatus::Cancelled => {
            return Err(ApiError::BadRequest(
                "Reservation is already cancelled".to_string(),
            ));
        }
        ReservationStatus::Completed => {
            return Err(ApiError::BadRequest(
                "Cannot cancel a completed reservation".to_string(),
            ));
        }
        _ => {}
    }

    let cancelled = reservations_repo
        .cancel(id, reason.as_deref())
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Reservation not found with id: {}", id)))?;

    stalls_repo
        .set_status_many(&cancelled.stall_ids, StallStatus::Available)
        .await?;

    notifications_repo
        .insert_notification(
            cancelled.user_id,
            "Reservation Cancelled",
            &format!("Reservation #{} has been cancelled.", id),
            NotificationKind::Reservation,
            Some(&id.to_string()),
        )
        .await?;

    info!("Reservation cancelled: {}", id);
    Ok(cancelled)
}

/// Admins see every reservation; everyone else only their own. A foreign
/// reservation reads as missing rather than forbidden.
async fn find_owned_reservation(
    reservations_repo: &ReservationsRepo,
    id: i64,
    user: &AuthUser,
) -> Result<Reservation, ApiError> {
    let reservation = reservations_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Reservation not found with id: {}", id)))?;

    if !user.is_admin() && reservation.user_id != user.user_id {
        return Err(ApiError::NotFound(format!(
            "Reservation not found with id: {}",
            id
        )));
    }

    Ok(reservation)
}

fn validate_date_range(start_date: Date, end_date: Date) -> Result<(), ApiError> {
    if end_date < start_date {
        return Err(ApiError::BadRequest(
            "End date must be after start date".to_string(),
        ));
    }
    Ok(())
}

fn generate_qr_code(reservation_id: i64, user_id: i64) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "BOOKFAIR-2026-RES-{}-USER-{}-{}",
        reservation_id,
        user_id,
        &suffix[..8]
    )
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use super::*;

    #[test]
    fn date_range_must_not_be_inverted() {
        assert!(validate_date_range(date!(2026 - 09 - 01), date!(2026 - 09 - 07)).is_ok());
        // single-day bookings are fine
        assert!(validate_date_range(date!(2026 - 09 - 01), date!(2026 - 09 - 01)).is_ok());
        assert!(validate_date_range(date!(2026 - 09 - 07), date!(2026 - 09 - 01)).is_err());
    }

    #[test]
    fn qr_code_embeds_reservation_and_user() {
        let code = generate_qr_code(42, 7);
        assert!(code.starts_with("BOOKFAIR-2026-RES-42-USER-7-"));

        let suffix = code.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn qr_codes_are_unique_per_call() {
        assert_ne!(generate_qr_code(1, 1), generate_qr_code(1, 1));
    }
}
