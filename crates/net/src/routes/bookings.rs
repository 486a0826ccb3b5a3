//! Booking endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use chrono::Utc;
use playzone_core::workflow::{cleanup_old_bookings, create_booking, set_booking_status};
use playzone_core::{
    Action, Booking, BookingRepository, BookingStatus, CenterBooking, CenterRepository,
    DomainEvent, PermissionMatrix, SeatType, UserBooking,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::extract::{AdminUser, AuthUser};
use crate::state::ApiState;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/", post(create))
        .route("/my", get(my_bookings))
        .route("/center/:id", get(center_bookings))
        .route("/:id/status", put(update_status))
        .route("/cleanup/old", delete(cleanup))
}

fn one() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub center_id: Uuid,
    pub date: String,
    pub time: String,
    #[serde(default = "one")]
    pub duration: u32,
    #[serde(rename = "type", default)]
    pub seat_type: SeatType,
    #[serde(default)]
    pub price: i64,
    #[serde(default = "one")]
    pub seats: u32,
}

#[instrument(skip(state, user, req), fields(user_id = %user.id, center_id = %req.center_id))]
async fn create(
    State(state): State<ApiState>,
    AuthUser(user): AuthUser,
    Json(req): Json<CreateBookingRequest>,
) -> ApiResult<(StatusCode, Json<Booking>)> {
    let booking = Booking::new(user.id, req.center_id, req.date, req.time, req.seat_type, req.price)
        .with_duration(req.duration)
        .with_seats(req.seats);

    let booking = state.with_db(|db| create_booking(db, booking))?;
    info!(booking_id = %booking.id, "Booking created");
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn my_bookings(
    State(state): State<ApiState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<Vec<UserBooking>>> {
    let bookings = state.with_db(|db| db.list_user_bookings(user.id))?;
    Ok(Json(bookings))
}

async fn center_bookings(
    State(state): State<ApiState>,
    AuthUser(user): AuthUser,
    Path(center_id): Path<Uuid>,
) -> ApiResult<Json<Vec<CenterBooking>>> {
    let center = state
        .with_db(|db| db.find_center_by_id(center_id))?
        .ok_or_else(|| ApiError::NotFound("Center not found".into()))?;

    if !PermissionMatrix::can_perform(user.role, Action::ViewCenterBookings)
        || !PermissionMatrix::can_manage_center(&user, &center)
    {
        return Err(ApiError::Forbidden(
            "Access denied. You do not own this center.".into(),
        ));
    }

    let bookings = state.with_db(|db| db.list_center_bookings(center_id))?;
    Ok(Json(bookings))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: BookingStatus,
}

#[instrument(skip(state, user, req), fields(user_id = %user.id))]
async fn update_status(
    State(state): State<ApiState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> ApiResult<Json<Booking>> {
    let booking = state.with_db(|db| set_booking_status(db, &user, id, req.status))?;

    state.publish(DomainEvent::BookingStatusChanged {
        booking_id: booking.id,
        status: booking.status,
    });
    Ok(Json(booking))
}

async fn cleanup(
    State(state): State<ApiState>,
    AdminUser(admin): AdminUser,
) -> ApiResult<Json<Value>> {
    let days = state.settings.booking_retention_days;
    let deleted = state.with_db(|db| cleanup_old_bookings(db, days, Utc::now()))?;

    info!(admin_id = %admin.id, deleted, "Manual booking cleanup");
    Ok(Json(json!({
        "message": format!("Successfully deleted {} bookings older than {} days", deleted, days),
        "deletedCount": deleted,
    })))
}
