//! Permission system for center and booking operations

use uuid::Uuid;

use crate::models::{Booking, BookingStatus, Center, Role, User};

/// Actions gated by role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    // Centers
    CreateCenter,
    EditCenter,
    DeleteCenter,
    UpdateOccupancy,

    // Bookings
    CreateBooking,
    ViewCenterBookings,
    ChangeBookingStatus,
    CleanupBookings,

    // Administration
    ListUsers,
    SetUserPlan,
}

/// Permission matrix for account roles
pub struct PermissionMatrix;

impl PermissionMatrix {
    /// Check if a role may attempt an action at all. Ownership checks for
    /// owners happen separately.
    pub fn can_perform(role: Role, action: Action) -> bool {
        match action {
            Action::CreateCenter
            | Action::EditCenter
            | Action::DeleteCenter
            | Action::UpdateOccupancy
            | Action::ViewCenterBookings
            | Action::ChangeBookingStatus => matches!(role, Role::CenterOwner | Role::Admin),

            Action::CreateBooking => true,

            Action::CleanupBookings | Action::ListUsers | Action::SetUserPlan => role == Role::Admin,
        }
    }

    /// Admins manage every center; owners only their own
    pub fn can_manage_center(user: &User, center: &Center) -> bool {
        match user.role {
            Role::Admin => true,
            Role::CenterOwner => center.is_owned_by(user.id),
            Role::User => false,
        }
    }

    /// Whether `user` may move `booking` to `next`.
    ///
    /// Center managers may apply any legal transition. The user who made the
    /// booking may only cancel it.
    pub fn can_set_booking_status(
        user: &User,
        booking: &Booking,
        center_owner: Option<Uuid>,
        next: BookingStatus,
    ) -> bool {
        if !booking.status.can_transition_to(next) {
            return false;
        }
        let manages = user.is_admin()
            || (user.role == Role::CenterOwner && center_owner == Some(user.id));
        if manages {
            return true;
        }
        booking.user_id == user.id && next == BookingStatus::Cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountType, Plan, SeatType};

    fn booking_for(user: Uuid, center: Uuid) -> Booking {
        Booking::new(user, center, "2025-03-01".into(), "10:00".into(), SeatType::Standard, 0)
    }

    #[test]
    fn test_role_matrix() {
        assert!(PermissionMatrix::can_perform(Role::User, Action::CreateBooking));
        assert!(!PermissionMatrix::can_perform(Role::User, Action::CreateCenter));
        assert!(PermissionMatrix::can_perform(Role::CenterOwner, Action::UpdateOccupancy));
        assert!(!PermissionMatrix::can_perform(Role::CenterOwner, Action::ListUsers));
        assert!(PermissionMatrix::can_perform(Role::Admin, Action::CleanupBookings));
    }

    #[test]
    fn test_owner_manages_only_own_center() {
        let owner = User::new("o@pz.mn".into(), "h".into(), AccountType::CenterOwner);
        let mine = Center::new("Mine".into()).with_owner(owner.id, Plan::BusinessPro);
        let theirs = Center::new("Theirs".into()).with_owner(Uuid::new_v4(), Plan::BusinessPro);

        assert!(PermissionMatrix::can_manage_center(&owner, &mine));
        assert!(!PermissionMatrix::can_manage_center(&owner, &theirs));

        let mut admin = User::new("a@pz.mn".into(), "h".into(), AccountType::User);
        admin.role = Role::Admin;
        assert!(PermissionMatrix::can_manage_center(&admin, &theirs));
    }

    #[test]
    fn test_booker_can_only_cancel() {
        let user = User::new("u@pz.mn".into(), "h".into(), AccountType::User);
        let booking = booking_for(user.id, Uuid::new_v4());

        assert!(PermissionMatrix::can_set_booking_status(
            &user,
            &booking,
            None,
            BookingStatus::Cancelled
        ));
        assert!(!PermissionMatrix::can_set_booking_status(
            &user,
            &booking,
            None,
            BookingStatus::Confirmed
        ));
    }

    #[test]
    fn test_owner_follows_workflow() {
        let owner = User::new("o@pz.mn".into(), "h".into(), AccountType::CenterOwner);
        let mut booking = booking_for(Uuid::new_v4(), Uuid::new_v4());

        assert!(PermissionMatrix::can_set_booking_status(
            &owner,
            &booking,
            Some(owner.id),
            BookingStatus::Confirmed
        ));
        assert!(!PermissionMatrix::can_set_booking_status(
            &owner,
            &booking,
            Some(Uuid::new_v4()),
            BookingStatus::Confirmed
        ));

        booking.status = BookingStatus::Completed;
        assert!(!PermissionMatrix::can_set_booking_status(
            &owner,
            &booking,
            Some(owner.id),
            BookingStatus::Cancelled
        ));
    }
}
