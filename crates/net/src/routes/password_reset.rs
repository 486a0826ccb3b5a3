//! Phone-based password reset
//!
//! forgot-password issues a 6-digit code, verify-reset-code trades it for a
//! short-lived token, reset-password spends the token. Codes are only
//! logged; `expose_reset_codes` echoes them back for development.

use axum::{extract::State, routing::post, Json, Router};
use chrono::Utc;
use playzone_core::auth::{
    generate_reset_code, generate_reset_token, hash_password, validate_phone,
    validate_reset_password,
};
use playzone_core::{PasswordReset, PasswordResetRepository};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::error::{ApiError, ApiResult};
use crate::state::ApiState;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/forgot-password", post(forgot_password))
        .route("/verify-reset-code", post(verify_reset_code))
        .route("/reset-password", post(reset_password))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ForgotRequest {
    pub phone: String,
}

#[instrument(skip(state, req))]
async fn forgot_password(
    State(state): State<ApiState>,
    Json(req): Json<ForgotRequest>,
) -> ApiResult<Json<Value>> {
    let phone = req.phone.trim();
    if phone.is_empty() {
        return Err(ApiError::BadRequest("Phone number is required".into()));
    }
    validate_phone(phone)?;

    let user = state
        .with_db(|db| db.users().find_by_phone(phone))?
        .ok_or_else(|| ApiError::NotFound("No user with this phone number".into()))?;

    let reset = PasswordReset::new(phone.to_string(), generate_reset_code(), user.id);
    state.with_db(|db| db.create_password_reset(&reset))?;
    info!(user_id = %user.id, code = %reset.code, "Password reset code issued");

    let mut body = json!({
        "success": true,
        "message": "Reset code sent. It is valid for 10 minutes.",
        "expiresAt": reset.expires_at,
    });
    if state.settings.expose_reset_codes {
        body["devCode"] = json!(reset.code);
    }
    Ok(Json(body))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VerifyRequest {
    pub phone: String,
    pub code: String,
}

async fn verify_reset_code(
    State(state): State<ApiState>,
    Json(req): Json<VerifyRequest>,
) -> ApiResult<Json<Value>> {
    let (phone, code) = (req.phone.trim(), req.code.trim());
    if phone.is_empty() || code.is_empty() {
        return Err(ApiError::BadRequest("Phone and code are required".into()));
    }

    let token = generate_reset_token();
    let issued = state.with_db(|db| {
        let Some(reset) = db.find_reset_by_code(phone, code)? else {
            return Ok(None);
        };
        db.password_resets().issue_token(reset.id, &token, Utc::now())?;
        Ok(Some(reset.user_id))
    })?;
    let user_id = issued.ok_or_else(|| {
        ApiError::BadRequest("Invalid or expired code. Please try again.".into())
    })?;

    Ok(Json(json!({
        "success": true,
        "message": "Code verified",
        "resetToken": token,
        "userId": user_id,
    })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResetRequest {
    pub reset_token: String,
    pub new_password: String,
}

#[instrument(skip(state, req))]
async fn reset_password(
    State(state): State<ApiState>,
    Json(req): Json<ResetRequest>,
) -> ApiResult<Json<Value>> {
    if req.reset_token.is_empty() || req.new_password.is_empty() {
        return Err(ApiError::BadRequest("All fields are required".into()));
    }
    validate_reset_password(&req.new_password)?;
    let hash = hash_password(&req.new_password)?;

    let user_id = state.with_db(|db| {
        let reset = db
            .find_reset_by_token(&req.reset_token)?
            .ok_or_else(|| playzone_core::Error::Validation("Invalid or expired token".into()))?;
        let users = db.users();
        if users.find_by_id(reset.user_id)?.is_none() {
            return Err(playzone_core::Error::NotFound("user".into()));
        }
        users.update_password(reset.user_id, &hash)?;
        users.delete_user_sessions(reset.user_id)?;
        db.password_resets().mark_used(reset.id)?;
        Ok(reset.user_id)
    })?;

    info!(%user_id, "Password reset completed");
    Ok(Json(json!({
        "success": true,
        "message": "Password changed. Please log in with the new password.",
    })))
}
