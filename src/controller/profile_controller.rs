use std::sync::Arc;

use axum::extract::Path;
use axum::routing::get;
use axum::routing::put;
use axum::{Extension, Json, Router};
use serde::Deserialize;
use tracing::info;

use crate::auth::{AdminUser, AuthUser};
use crate::controller::AppState;
use crate::errors::ApiError;
use crate::models::profile::Profile;
use crate::repositories::profiles_repo::{ProfileChanges, ProfilesRepo};

pub fn router(app_state: AppState) -> Router {
    let profiles_repo = Arc::new(ProfilesRepo::new(app_state.postgres_connection));

    Router::new()
        .route("/", get(get_my_profile).put(update_my_profile))
        .route("/admin/all", get(get_all_profiles))
        .route("/user/:user_id", get(get_profile_by_user))
        .route("/:user_id", put(update_profile_by_user))
        .route_layer(Extension(profiles_repo))
}

pub async fn get_my_profile(
    Extension(profiles_repo): Extension<Arc<ProfilesRepo>>,
    user: AuthUser,
) -> Result<Json<Profile>, ApiError> {
    let profile = profiles_repo
        .find_by_user_id(user.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;

    Ok(Json(profile))
}

#[derive(Clone, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub company_name: Option<String>,
    pub business_reg_no: Option<String>,
    pub address: Option<String>,
    pub literary_genres: Option<Vec<String>>,
}

impl UpdateProfileRequest {
    fn into_changes(self) -> ProfileChanges {
        ProfileChanges {
            full_name: self.full_name,
            email: self.email,
            phone_number: self.phone_number,
            company_name: self.company_name,
            business_reg_no: self.business_reg_no,
            address: self.address,
            literary_genres: self.literary_genres,
        }
    }
}

pub async fn update_my_profile(
    Extension(profiles_repo): Extension<Arc<ProfilesRepo>>,
    user: AuthUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, ApiError> {
    let profile = profiles_repo
        .upsert_profile(user.user_id, body.into_changes())
        .await?;

    info!("Profile updated for user {}", user.user_id);
    Ok(Json(profile))
}

pub async fn get_all_profiles(
    _admin: AdminUser,
    Extension(profiles_repo): Extension<Arc<ProfilesRepo>>,
) -> Result<Json<Vec<Profile>>, ApiError> {
    Ok(Json(profiles_repo.list_profiles().await?))
}

pub async fn get_profile_by_user(
    _admin: AdminUser,
    Extension(profiles_repo): Extension<Arc<ProfilesRepo>>,
    Path(user_id): Path<i64>,
) -> Result<Json<Profile>, ApiError> {
    let profile = profiles_repo
        .find_by_user_id(user_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("Profile not found for user: {}", user_id))
        })?;

    Ok(Json(profile))
}

pub async fn update_profile_by_user(
    _admin: AdminUser,
    Extension(profiles_repo): Extension<Arc<ProfilesRepo>>,
    Path(user_id): Path<i64>,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<Profile>, ApiError> {
    let profile = profiles_repo
        .upsert_profile(user_id, body.into_changes())
        .await?;

    info!("Profile updated for user {} by admin", user_id);
    Ok(Json(profile))
}
