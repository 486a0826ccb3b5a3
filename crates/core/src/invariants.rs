//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use uuid::Uuid;

use crate::models::{Booking, Center, Plan, User};

/// Validate that a center's stored state is internally consistent
pub fn assert_center_invariants(center: &Center) {
    debug_assert!(
        !center.name.trim().is_empty(),
        "Center {} has empty name",
        center.id
    );

    for (label, pct) in [
        ("standard", center.occupancy.standard),
        ("vip", center.occupancy.vip),
        ("stage", center.occupancy.stage),
    ] {
        if let Some(pct) = pct {
            debug_assert!(
                (0.0..=100.0).contains(&pct),
                "Center {} has {} occupancy {} outside 0..=100",
                center.id,
                label,
                pct
            );
        }
    }
}

/// Validate that a booking references real rows and sane amounts
pub fn assert_booking_invariants(booking: &Booking) {
    debug_assert!(
        booking.user_id != Uuid::nil(),
        "Booking {} has nil user_id",
        booking.id
    );
    debug_assert!(
        booking.center_id != Uuid::nil(),
        "Booking {} has nil center_id",
        booking.id
    );
    debug_assert!(
        booking.seats >= 1 && booking.duration >= 1,
        "Booking {} has {} seats for {}h",
        booking.id,
        booking.seats,
        booking.duration
    );
}

/// Validate subscription fields on a user
pub fn assert_user_invariants(user: &User) {
    debug_assert!(
        user.subscription.plan != Plan::Trial,
        "User {} stores trial as a subscription plan",
        user.id
    );
    debug_assert!(
        !(user.trial.is_active && user.trial.end_date.is_none()),
        "User {} has an active trial without an end date",
        user.id
    );
}
