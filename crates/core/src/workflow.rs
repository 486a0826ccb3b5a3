//! Booking workflow and housekeeping
//!
//! Operations that combine validation, permission checks and storage so the
//! HTTP layer stays thin.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::invariants::assert_booking_invariants;
use crate::models::{check_capacity, Booking, BookingStatus, User};
use crate::permissions::PermissionMatrix;
use crate::storage::{BookingRepository, CenterRepository, Database, Storage};

/// Bookings created longer ago than this are removed by cleanup
pub const DEFAULT_RETENTION_DAYS: i64 = 5;

/// Validate and store a new booking, enforcing seat capacity
#[instrument(skip(store, booking), fields(center_id = %booking.center_id, user_id = %booking.user_id))]
pub fn create_booking<S: Storage>(store: &S, booking: Booking) -> Result<Booking> {
    booking.validate()?;

    let center = store
        .find_center_by_id(booking.center_id)?
        .ok_or_else(|| Error::NotFound(format!("center {}", booking.center_id)))?;

    let existing = store.list_active_bookings(center.id, &booking.date, booking.seat_type)?;
    check_capacity(&booking, &existing, center.seats.for_type(booking.seat_type))?;

    assert_booking_invariants(&booking);
    store.create_booking(&booking)?;
    debug!(booking_id = %booking.id, "Booking created");
    Ok(booking)
}

/// Move a booking to `next` on behalf of `actor`
#[instrument(skip(store, actor), fields(actor_id = %actor.id))]
pub fn set_booking_status<S: BookingRepository + CenterRepository>(
    store: &S,
    actor: &User,
    booking_id: Uuid,
    next: BookingStatus,
) -> Result<Booking> {
    let mut booking = store
        .find_booking_by_id(booking_id)?
        .ok_or_else(|| Error::NotFound(format!("booking {}", booking_id)))?;

    // Legality first so an illegal move reads as such even for outsiders
    booking.status.transition(next)?;

    let center_owner = store
        .find_center_by_id(booking.center_id)?
        .and_then(|c| c.owner_id());
    if !PermissionMatrix::can_set_booking_status(actor, &booking, center_owner, next) {
        return Err(Error::PermissionDenied(
            "not allowed to change this booking".into(),
        ));
    }

    store.update_booking_status(booking.id, next)?;
    booking.status = next;
    Ok(booking)
}

/// Delete bookings created more than `retention_days` before `now`
pub fn cleanup_old_bookings<S: BookingRepository>(
    store: &S,
    retention_days: i64,
    now: DateTime<Utc>,
) -> Result<u64> {
    let cutoff = now - Duration::days(retention_days);
    let removed = store.delete_bookings_before(cutoff)?;
    info!(removed, %cutoff, "Old bookings cleaned up");
    Ok(removed)
}

/// Counts from one maintenance pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceReport {
    pub bookings_removed: u64,
    pub sessions_removed: u64,
    pub resets_removed: u64,
    pub trials_expired: u64,
}

/// Periodic housekeeping: old bookings, expired sessions and reset requests,
/// lapsed trials
#[instrument(skip(db))]
pub fn run_maintenance(
    db: &Database,
    retention_days: i64,
    now: DateTime<Utc>,
) -> Result<MaintenanceReport> {
    let report = MaintenanceReport {
        bookings_removed: cleanup_old_bookings(db, retention_days, now)?,
        sessions_removed: db.users().cleanup_expired_sessions()?,
        resets_removed: db.password_resets().cleanup_expired(now)?,
        trials_expired: db.users().expire_trials(now)?,
    };
    info!(?report, "Maintenance pass complete");
    Ok(report)
}
