//! Plan catalog, current subscription, upgrade and cancel

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use playzone_core::subscription::{self, display_plan, entitled_plan, plan_catalog, plan_info};
use playzone_core::{AccountType, PaymentMethod, Plan, User, UserRepository, ViewPermissions};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument};

use crate::error::{ApiError, ApiResult};
use crate::extract::AuthUser;
use crate::state::ApiState;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/me", get(me))
        .route("/plans", get(plans))
        .route("/upgrade", post(upgrade))
        .route("/cancel", post(cancel))
}

/// Subscription summary with the limits of the entitled plan
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSummary {
    pub plan: Plan,
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub auto_renew: bool,
    pub account_type: AccountType,
    pub max_centers: u32,
    pub max_images: Option<u32>,
    pub can_upload_video: bool,
    pub has_marketing_boost: bool,
    pub has_advanced_analytics: bool,
    pub trial_days_remaining: i64,
}

impl SubscriptionSummary {
    pub fn for_user(user: &User, now: DateTime<Utc>) -> Self {
        let sub = &user.subscription;
        let info = plan_info(entitled_plan(user, now));
        let on_trial = user.trial.is_running_at(now);
        Self {
            plan: display_plan(user, now),
            is_active: on_trial || (sub.is_active && !sub.is_expired_at(now)),
            start_date: if on_trial { user.trial.start_date } else { sub.start_date },
            end_date: if on_trial { user.trial.end_date } else { sub.expires_at },
            auto_renew: sub.auto_renew,
            account_type: user.account_type,
            max_centers: info.map(|i| i.max_centers).unwrap_or(0),
            max_images: info.map_or(Some(0), |i| i.max_images),
            can_upload_video: info.is_some_and(|i| i.can_upload_video),
            has_marketing_boost: info.is_some_and(|i| i.has_marketing_boost),
            has_advanced_analytics: info.is_some_and(|i| i.has_advanced_analytics),
            trial_days_remaining: user.trial.days_remaining(now),
        }
    }
}

async fn me(AuthUser(user): AuthUser) -> Json<Value> {
    let now = Utc::now();
    Json(json!({
        "success": true,
        "subscription": SubscriptionSummary::for_user(&user, now),
        "permissions": ViewPermissions::for_user(&user, now),
    }))
}

async fn plans() -> Json<Value> {
    Json(json!({ "success": true, "plans": plan_catalog() }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeRequest {
    pub plan_id: String,
    #[serde(default)]
    pub payment_method: Option<String>,
}

#[instrument(skip(state, user, req), fields(user_id = %user.id, plan = %req.plan_id))]
async fn upgrade(
    State(state): State<ApiState>,
    AuthUser(mut user): AuthUser,
    Json(req): Json<UpgradeRequest>,
) -> ApiResult<Json<Value>> {
    let plan = Plan::parse(&req.plan_id)
        .filter(|p| plan_info(*p).is_some())
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown plan '{}'", req.plan_id)))?;
    let method = req
        .payment_method
        .as_deref()
        .map(PaymentMethod::parse)
        .unwrap_or(PaymentMethod::Mock);

    let now = Utc::now();
    subscription::upgrade(&mut user, plan, method, now)?;
    state.with_db(|db| db.save_user_plan(&user))?;

    info!("Subscription upgraded");
    Ok(Json(json!({
        "success": true,
        "message": format!("Upgraded to {}", plan),
        "subscription": SubscriptionSummary::for_user(&user, now),
    })))
}

async fn cancel(
    State(state): State<ApiState>,
    AuthUser(mut user): AuthUser,
) -> ApiResult<Json<Value>> {
    subscription::cancel(&mut user);
    state.with_db(|db| db.save_user_plan(&user))?;

    info!(user_id = %user.id, "Subscription cancelled");
    Ok(Json(json!({
        "success": true,
        "message": "Subscription cancelled",
    })))
}
