use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use chrono::Utc;
use playzone_core::subscription::{admin_set_plan, PLAN_DURATION_DAYS};
use playzone_core::{AccountType, DomainEvent, Plan, UserRepository};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument};
use uuid::Uuid;

use super::auth::UserView;
use crate::error::{ApiError, ApiResult};
use crate::extract::AdminUser;
use crate::state::ApiState;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:id/subscription", put(set_subscription))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserListQuery {
    pub account_type: Option<AccountType>,
}

async fn list_users(
    State(state): State<ApiState>,
    AdminUser(_): AdminUser,
    Query(query): Query<UserListQuery>,
) -> ApiResult<Json<Vec<UserView>>> {
    let users = state.with_db(|db| db.users().list())?;
    let users = users
        .into_iter()
        .filter(|u| query.account_type.map_or(true, |t| u.account_type == t))
        .map(UserView::from)
        .collect();
    Ok(Json(users))
}

fn default_duration() -> i64 {
    PLAN_DURATION_DAYS
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPlanRequest {
    pub plan_id: String,
    #[serde(default = "default_duration")]
    pub duration: i64,
}

#[instrument(skip(state, admin, req), fields(admin_id = %admin.id))]
async fn set_subscription(
    State(state): State<ApiState>,
    AdminUser(admin): AdminUser,
    Path(user_id): Path<Uuid>,
    Json(req): Json<SetPlanRequest>,
) -> ApiResult<Json<Value>> {
    let plan = Plan::parse(&req.plan_id)
        .ok_or_else(|| ApiError::BadRequest(format!("Unknown plan '{}'", req.plan_id)))?;

    let user = state.with_db(|db| {
        let mut user = db
            .find_user_by_id(user_id)?
            .ok_or_else(|| playzone_core::Error::NotFound("user".into()))?;
        admin_set_plan(&mut user, plan, req.duration, Utc::now())?;
        db.save_user_plan(&user)?;
        Ok(user)
    })?;

    info!(%user_id, %plan, days = req.duration, "Plan set by admin");
    state.publish(DomainEvent::AdminChanged { user_id });
    Ok(Json(json!({
        "success": true,
        "message": format!("{} set for {} days", plan, req.duration),
        "user": UserView::from(user),
    })))
}
