use std::sync::Arc;

use axum::extract::Path;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::password::{hash_password, verify_password};
use crate::auth::{AdminUser, AuthUser, TokenKeys};
use crate::controller::AppState;
use crate::errors::ApiError;
use crate::models::notification::NotificationKind;
use crate::models::user::{Role, UserResponse};
use crate::repositories::notifications_repo::NotificationsRepo;
use crate::repositories::profiles_repo::{ProfileChanges, ProfilesRepo};
use crate::repositories::users_repo::{NewUser, UserChanges, UsersRepo};

pub fn router(app_state: AppState) -> Router {
    let users_repo = Arc::new(UsersRepo::new(app_state.postgres_connection.clone()));
    let profiles_repo = Arc::new(ProfilesRepo::new(app_state.postgres_connection.clone()));
    let notifications_repo = Arc::new(NotificationsRepo::new(app_state.postgres_connection));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/verify", get(verify_token))
        .route("/users", get(get_all_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route_layer(Extension(users_repo))
        .route_layer(Extension(profiles_repo))
        .route_layer(Extension(notifications_repo))
}

#[derive(Clone, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
    pub name: Option<String>,
    pub business_name: Option<String>,
    pub phone: Option<String>,
    pub business_reg_no: Option<String>,
    pub address: Option<String>,
}

#[derive(Clone, Serialize, Debug)]
pub struct RegisterResponse {
    pub message: Option<String>,
    pub error: Option<String>,
}

pub async fn register(
    Extension(users_repo): Extension<Arc<UsersRepo>>,
    Extension(profiles_repo): Extension<Arc<ProfilesRepo>>,
    Extension(notifications_repo): Extension<Arc<NotificationsRepo>>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Err(message) = validate_credentials(&body.email, &body.password) {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(RegisterResponse {
                message: None,
                error: Some(message),
            }),
        ));
    }

    if users_repo.find_by_email(&body.email).await?.is_some() {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(RegisterResponse {
                message: None,
                error: Some(format!("User already exists with email: {}", body.email)),
            }),
        ));
    }

    let user = insert_user_with_profile(&users_repo, &profiles_repo, &body).await?;

    notifications_repo
        .insert_notification(
            user.id,
            "Registration Confirmation",
            &format!("Welcome to the book fair, your account {} is ready.", user.email),
            NotificationKind::Registration,
            None,
        )
        .await?;

    info!("Registered user {} with id {}", user.email, user.id);

    Ok((
        StatusCode::OK,
        Json(RegisterResponse {
            message: Some(format!("User registered with id {}", user.id)),
            error: None,
        }),
    ))
}

#[derive(Clone, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Serialize, Debug)]
pub struct LoginResponse {
    pub message: Option<String>,
    pub error: Option<String>,
    pub token: Option<String>,
    pub user: Option<UserResponse>,
}

impl LoginResponse {
    fn denied() -> Self {
        Self {
            message: None,
            error: Some("Invalid email or password".to_string()),
            token: None,
            user: None,
        }
    }
}

pub async fn login(
    Extension(users_repo): Extension<Arc<UsersRepo>>,
    Extension(token_keys): Extension<Arc<TokenKeys>>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = match users_repo.find_by_email(&body.email).await? {
        Some(user) => user,
        None => {
            return Ok((StatusCode::UNAUTHORIZED, Json(LoginResponse::denied())));
        }
    };

    if !verify_password(&body.password, &user.password_hash) {
        warn!("Failed login attempt for {}", user.email);
        return Ok((StatusCode::UNAUTHORIZED, Json(LoginResponse::denied())));
    }

    let token = token_keys.mint(user.id, &user.email, user.role)?;
    info!("User {} logged in", user.email);

    Ok((
        StatusCode::OK,
        Json(LoginResponse {
            message: Some("Login successful".to_string()),
            error: None,
            token: Some(token),
            user: Some(UserResponse::from_user(&user)),
        }),
    ))
}

/// Tokens are stateless, so logout only acknowledges; clients drop the token.
pub async fn logout(headers: HeaderMap) -> impl IntoResponse {
    let has_bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(|value| value.starts_with("Bearer "))
        .unwrap_or(false);

    if !has_bearer {
        return (StatusCode::BAD_REQUEST, "No token provided.").into_response();
    }

    (StatusCode::OK, "User logged out successfully.").into_response()
}

pub async fn verify_token(
    Extension(users_repo): Extension<Arc<UsersRepo>>,
    user: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let record = users_repo
        .find_by_id(user.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

    Ok(Json(UserResponse::from_user(&record)))
}

pub async fn get_all_users(
    _admin: AdminUser,
    Extension(users_repo): Extension<Arc<UsersRepo>>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = users_repo.list_users().await?;
    Ok(Json(users.iter().map(UserResponse::from_user).collect()))
}

pub async fn get_user(
    _admin: AdminUser,
    Extension(users_repo): Extension<Arc<UsersRepo>>,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = users_repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User not found with id: {}", id)))?;

    Ok(Json(UserResponse::from_user(&user)))
}

pub async fn create_user(
    _admin: AdminUser,
    Extension(users_repo): Extension<Arc<UsersRepo>>,
    Extension(profiles_repo): Extension<Arc<ProfilesRepo>>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Err(message) = validate_credentials(&body.email, &body.password) {
        return Err(ApiError::BadRequest(message));
    }

    if users_repo.find_by_email(&body.email).await?.is_some() {
        return Err(ApiError::BadRequest(format!(
            "User already exists with email: {}",
            body.email
        )));
    }

    let user = insert_user_with_profile(&users_repo, &profiles_repo, &body).await?;
    info!("Admin created user {} with id {}", user.email, user.id);

    Ok((StatusCode::CREATED, Json(UserResponse::from_user(&user))))
}

#[derive(Clone, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub role: Option<Role>,
    pub name: Option<String>,
    pub business_name: Option<String>,
    pub phone: Option<String>,
    pub business_reg_no: Option<String>,
    pub address: Option<String>,
}

pub async fn update_user(
    _admin: AdminUser,
    Extension(users_repo): Extension<Arc<UsersRepo>>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let changes = UserChanges {
        role: body.role,
        full_name: body.name,
        phone_number: body.phone,
        company_name: body.business_name,
        business_reg_no: body.business_reg_no,
        address: body.address,
    };

    let user = users_repo
        .update_user(id, changes)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("User not found with id: {}", id)))?;

    Ok(Json(UserResponse::from_user(&user)))
}

#[derive(Clone, Serialize, Debug)]
pub struct UserDeleteResponse {
    pub success: bool,
    pub message: String,
}

pub async fn delete_user(
    _admin: AdminUser,
    Extension(users_repo): Extension<Arc<UsersRepo>>,
    Path(id): Path<i64>,
) -> Result<Json<UserDeleteResponse>, ApiError> {
    if !users_repo.delete_user(id).await? {
        return Err(ApiError::NotFound(format!(
            "User with id {} does not exist",
            id
        )));
    }

    info!("Deleted user {}", id);
    Ok(Json(UserDeleteResponse {
        success: true,
        message: "User deleted successfully".to_string(),
    }))
}

fn validate_credentials(email: &str, password: &str) -> Result<(), String> {
    if email.is_empty() || password.is_empty() {
        return Err("Email and password are required".to_string());
    }
    if !email.contains('@') {
        return Err("Invalid email address".to_string());
    }
    if password.len() < 8 {
        return Err("Password must be at least 8 characters long".to_string());
    }
    if password.len() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }
    Ok(())
}

async fn insert_user_with_profile(
    users_repo: &UsersRepo,
    profiles_repo: &ProfilesRepo,
    body: &RegisterRequest,
) -> Result<crate::models::user::User, ApiError> {
    let password_hash = hash_password(&body.password)?;

    let user = users_repo
        .insert_user(NewUser {
            email: body.email.clone(),
            password_hash,
            role: body.role.unwrap_or(Role::Customer),
            full_name: body.name.clone(),
            phone_number: body.phone.clone(),
            company_name: body.business_name.clone(),
            business_reg_no: body.business_reg_no.clone(),
            address: body.address.clone(),
        })
        .await?;

    // Seed the profile so the profile endpoints have something to show
    profiles_repo
        .upsert_profile(
            user.id,
            ProfileChanges {
                full_name: body.name.clone(),
                email: Some(user.email.clone()),
                phone_number: body.phone.clone(),
                company_name: body.business_name.clone(),
                business_reg_no: body.business_reg_no.clone(),
                address: body.address.clone(),
                literary_genres: None,
            },
        )
        .await?;

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_validation_catches_the_obvious() {
        assert!(validate_credentials("vendor@books.lk", "long enough pw").is_ok());
        assert!(validate_credentials("", "long enough pw").is_err());
        assert!(validate_credentials("not-an-email", "long enough pw").is_err());
        assert!(validate_credentials("vendor@books.lk", "short").is_err());
        assert!(validate_credentials("vendor@books.lk", &"x".repeat(129)).is_err());
    }

    #[test]
    fn login_denial_never_carries_a_token() {
        let denied = LoginResponse::denied();
        assert!(denied.token.is_none());
        assert!(denied.user.is_none());
        assert_eq!(denied.error.as_deref(), Some("Invalid email or password"));
    }
}
