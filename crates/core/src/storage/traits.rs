//! Storage repository traits
//!
//! These traits define the storage interface, allowing for different
//! implementations (SQLite, mock).

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Booking, BookingStatus, Center, CenterBooking, Occupancy, PasswordReset, SeatType, Session,
    User, UserBooking,
};

/// User repository operations
pub trait UserRepository {
    /// Create a new user
    fn create_user(&self, user: &User) -> Result<()>;

    /// Find user by ID
    fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Find user by email or username
    fn find_user_by_login(&self, identifier: &str) -> Result<Option<User>>;

    /// Persist subscription and trial state
    fn save_user_plan(&self, user: &User) -> Result<()>;

    /// Create a session
    fn create_session(&self, session: &Session) -> Result<()>;

    /// Find a valid (non-expired) session
    fn find_valid_session(&self, session_id: Uuid) -> Result<Option<Session>>;

    /// Delete a session
    fn delete_session(&self, session_id: Uuid) -> Result<()>;

    /// Clean up expired sessions
    fn cleanup_expired_sessions(&self) -> Result<u64>;
}

/// Center repository operations
pub trait CenterRepository {
    fn create_center(&self, center: &Center) -> Result<()>;

    fn find_center_by_id(&self, id: Uuid) -> Result<Option<Center>>;

    /// All centers with their owner plan
    fn list_centers(&self) -> Result<Vec<Center>>;

    fn update_center(&self, center: &Center) -> Result<()>;

    fn update_occupancy(&self, center_id: Uuid, occupancy: &Occupancy) -> Result<()>;

    fn delete_center(&self, center_id: Uuid) -> Result<bool>;

    fn count_centers_for_owner(&self, owner_id: Uuid) -> Result<u32>;
}

/// Booking repository operations
pub trait BookingRepository {
    fn create_booking(&self, booking: &Booking) -> Result<()>;

    fn find_booking_by_id(&self, id: Uuid) -> Result<Option<Booking>>;

    /// Non-cancelled bookings competing for the same seats
    fn list_active_bookings(
        &self,
        center_id: Uuid,
        date: &str,
        seat_type: SeatType,
    ) -> Result<Vec<Booking>>;

    fn list_user_bookings(&self, user_id: Uuid) -> Result<Vec<UserBooking>>;

    fn list_center_bookings(&self, center_id: Uuid) -> Result<Vec<CenterBooking>>;

    fn update_booking_status(&self, booking_id: Uuid, status: BookingStatus) -> Result<()>;

    /// Delete bookings created before the cutoff
    fn delete_bookings_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

/// Password reset repository operations
pub trait PasswordResetRepository {
    fn create_password_reset(&self, reset: &PasswordReset) -> Result<()>;

    fn find_reset_by_code(&self, phone: &str, code: &str) -> Result<Option<PasswordReset>>;

    fn find_reset_by_token(&self, token: &str) -> Result<Option<PasswordReset>>;

    fn cleanup_password_resets(&self, now: DateTime<Utc>) -> Result<u64>;
}

/// Combined storage interface
///
/// Provides access to all repository operations.
pub trait Storage:
    UserRepository + CenterRepository + BookingRepository + PasswordResetRepository
{
}

// Blanket implementation: any type implementing all traits implements Storage
impl<T> Storage for T where
    T: UserRepository + CenterRepository + BookingRepository + PasswordResetRepository
{
}
