//! Registration, login, profile and favorites

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use playzone_core::auth::{
    hash_password, validate_email, validate_password, validate_phone, validate_username,
    verify_password,
};
use playzone_core::{
    AccountType, Center, CenterRepository, Session, User, UserRepository, ViewPermissions,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::extract::{bearer_token, AuthUser};
use crate::state::ApiState;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/profile", get(profile).put(update_profile))
        .route("/favorites", get(favorites))
        .route(
            "/favorites/:id",
            post(toggle_favorite).delete(remove_favorite),
        )
}

/// User as returned to its owner, with derived plan permissions
#[derive(Debug, Serialize)]
pub struct UserView {
    #[serde(flatten)]
    pub user: User,
    pub permissions: ViewPermissions,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        let permissions = ViewPermissions::for_user(&user, Utc::now());
        Self { user, permissions }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub message: &'static str,
    pub token: String,
    pub user: UserView,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub account_type: AccountType,
    pub center_name: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl RegisterRequest {
    /// Check the form and build the unsaved user
    fn into_user(self) -> ApiResult<User> {
        let email = self.email.trim().to_lowercase();
        validate_email(&email)?;
        validate_password(&self.password)?;

        let phone = non_empty(self.phone);
        if let Some(phone) = &phone {
            validate_phone(phone)?;
        }

        let hash = hash_password(&self.password)?;
        let mut user = User::new(email, hash, self.account_type);
        user.phone = phone;

        match self.account_type {
            AccountType::User => {
                let (Some(username), Some(full_name)) =
                    (non_empty(self.username), non_empty(self.full_name))
                else {
                    return Err(ApiError::BadRequest(
                        "Username and full name are required".into(),
                    ));
                };
                validate_username(&username)?;
                user = user.with_username(username).with_full_name(full_name);
            }
            AccountType::CenterOwner => {
                let Some(center_name) = non_empty(self.center_name) else {
                    return Err(ApiError::BadRequest("Center name is required".into()));
                };
                user.full_name = Some(center_name.clone());
                user.center_name = Some(center_name);
            }
        }
        Ok(user)
    }
}

/// Open a session for `user` and return its token
fn start_session(state: &ApiState, user: &User) -> ApiResult<String> {
    let session = Session::new(user.id, state.settings.session_hours);
    state.with_db(|db| {
        db.create_session(&session)?;
        db.users().update_last_login(user.id)
    })?;
    Ok(session.id.to_string())
}

#[instrument(skip(state, req), fields(email = %req.email))]
async fn register(
    State(state): State<ApiState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let user = req.into_user()?;

    state.with_db(|db| {
        let users = db.users();
        if users.find_by_email(&user.email)?.is_some() {
            return Err(playzone_core::Error::Conflict(
                "An account with this email already exists".into(),
            ));
        }
        if let Some(username) = &user.username {
            if users.find_by_username(username)?.is_some() {
                return Err(playzone_core::Error::Conflict(
                    "This username is already taken".into(),
                ));
            }
        }
        users.create(&user)
    })?;

    let token = start_session(&state, &user)?;
    info!(user_id = %user.id, account_type = user.account_type.as_str(), "User registered");
    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            message: "Registered successfully",
            token,
            user: user.into(),
        }),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(alias = "email", alias = "username")]
    pub email_or_username: String,
    pub password: String,
}

#[instrument(skip(state, req))]
async fn login(
    State(state): State<ApiState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let invalid = || ApiError::Unauthorized("Invalid email/username or password".into());

    let identifier = req.email_or_username.trim();
    let user = state
        .with_db(|db| db.find_user_by_login(identifier))?
        .ok_or_else(invalid)?;

    if !verify_password(&req.password, &user.password_hash)? {
        warn!(user_id = %user.id, "Failed login attempt");
        return Err(invalid());
    }
    if !user.is_active {
        return Err(ApiError::Unauthorized("Account is disabled".into()));
    }

    let token = start_session(&state, &user)?;
    info!(user_id = %user.id, "User logged in");
    Ok(Json(SessionResponse {
        message: "Logged in successfully",
        token,
        user: user.into(),
    }))
}

async fn logout(
    State(state): State<ApiState>,
    AuthUser(user): AuthUser,
    headers: HeaderMap,
) -> ApiResult<Json<Value>> {
    if let Some(session_id) = bearer_token(&headers).and_then(|t| Uuid::parse_str(t).ok()) {
        state.with_db(|db| db.delete_session(session_id))?;
    }
    info!(user_id = %user.id, "User logged out");
    Ok(Json(json!({ "message": "Logged out" })))
}

async fn profile(AuthUser(user): AuthUser) -> Json<UserView> {
    Json(user.into())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

async fn update_profile(
    State(state): State<ApiState>,
    AuthUser(mut user): AuthUser,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<Json<Value>> {
    if let Some(full_name) = non_empty(update.full_name) {
        user.full_name = Some(full_name);
    }
    if let Some(phone) = non_empty(update.phone) {
        validate_phone(&phone)?;
        user.phone = Some(phone);
    }
    if let Some(avatar) = non_empty(update.avatar) {
        user.avatar = avatar;
    }

    state.with_db(|db| db.users().update_profile(&user))?;
    Ok(Json(json!({
        "message": "Profile updated",
        "user": UserView::from(user),
    })))
}

async fn favorites(
    State(state): State<ApiState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Value>> {
    let perms = ViewPermissions::for_user(&user, Utc::now());
    let centers = state.with_db(|db| {
        let mut centers = Vec::new();
        for id in db.users().list_favorites(user.id)? {
            if let Some(center) = db.find_center_by_id(id)? {
                centers.push(center);
            }
        }
        Ok(centers)
    })?;

    let centers: Vec<Center> = if perms.can_view_details {
        centers
    } else {
        centers.iter().map(Center::redacted).collect()
    };
    Ok(Json(json!({ "favorites": centers })))
}

async fn toggle_favorite(
    State(state): State<ApiState>,
    AuthUser(user): AuthUser,
    Path(center_id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let is_favorite = state.with_db(|db| {
        if db.find_center_by_id(center_id)?.is_none() {
            return Err(playzone_core::Error::NotFound("Center".into()));
        }
        db.users().toggle_favorite(user.id, center_id)
    })?;

    let message = if is_favorite {
        "Added to favorites"
    } else {
        "Removed from favorites"
    };
    Ok(Json(json!({ "message": message, "isFavorite": is_favorite })))
}

async fn remove_favorite(
    State(state): State<ApiState>,
    AuthUser(user): AuthUser,
    Path(center_id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    let removed = state.with_db(|db| db.users().remove_favorite(user.id, center_id))?;
    if !removed {
        return Err(ApiError::NotFound("Center is not a favorite".into()));
    }
    Ok(Json(json!({ "message": "Removed from favorites", "isFavorite": false })))
}
