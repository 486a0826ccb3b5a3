//! SQLite storage layer for PlayZone

mod bookings;
mod centers;
mod migrations;
mod parse;
mod password_resets;
mod traits;
mod users;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    Booking, BookingStatus, Center, CenterBooking, Occupancy, PasswordReset, SeatType, Session,
    User, UserBooking,
};
use rusqlite::Connection;
use std::path::Path;
use tracing::instrument;

pub use bookings::{BookingStore, MY_BOOKINGS_LIMIT};
pub use centers::CenterStore;
pub use password_resets::PasswordResetStore;
pub use traits::{
    BookingRepository, CenterRepository, PasswordResetRepository, Storage, UserRepository,
};
pub use users::UserStore;

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    pub fn users(&self) -> UserStore<'_> {
        UserStore::new(&self.conn)
    }

    pub fn centers(&self) -> CenterStore<'_> {
        CenterStore::new(&self.conn)
    }

    pub fn bookings(&self) -> BookingStore<'_> {
        BookingStore::new(&self.conn)
    }

    pub fn password_resets(&self) -> PasswordResetStore<'_> {
        PasswordResetStore::new(&self.conn)
    }
}

// Implement repository traits for Database
// This enables using Database through the trait interface

impl UserRepository for Database {
    fn create_user(&self, user: &User) -> Result<()> {
        self.users().create(user)
    }

    fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.users().find_by_id(id)
    }

    fn find_user_by_login(&self, identifier: &str) -> Result<Option<User>> {
        self.users().find_by_login(identifier)
    }

    fn save_user_plan(&self, user: &User) -> Result<()> {
        self.users().save_plan(user)
    }

    fn create_session(&self, session: &Session) -> Result<()> {
        self.users().create_session(session)
    }

    fn find_valid_session(&self, session_id: Uuid) -> Result<Option<Session>> {
        self.users().find_valid_session(session_id)
    }

    fn delete_session(&self, session_id: Uuid) -> Result<()> {
        self.users().delete_session(session_id)
    }

    fn cleanup_expired_sessions(&self) -> Result<u64> {
        self.users().cleanup_expired_sessions()
    }
}

impl CenterRepository for Database {
    fn create_center(&self, center: &Center) -> Result<()> {
        self.centers().create(center)
    }

    fn find_center_by_id(&self, id: Uuid) -> Result<Option<Center>> {
        self.centers().find_by_id(id)
    }

    fn list_centers(&self) -> Result<Vec<Center>> {
        self.centers().list()
    }

    fn update_center(&self, center: &Center) -> Result<()> {
        self.centers().update(center)
    }

    fn update_occupancy(&self, center_id: Uuid, occupancy: &Occupancy) -> Result<()> {
        self.centers().update_occupancy(center_id, occupancy)
    }

    fn delete_center(&self, center_id: Uuid) -> Result<bool> {
        self.centers().delete(center_id)
    }

    fn count_centers_for_owner(&self, owner_id: Uuid) -> Result<u32> {
        self.centers().count_by_owner(owner_id)
    }
}

impl BookingRepository for Database {
    fn create_booking(&self, booking: &Booking) -> Result<()> {
        self.bookings().create(booking)
    }

    fn find_booking_by_id(&self, id: Uuid) -> Result<Option<Booking>> {
        self.bookings().find_by_id(id)
    }

    fn list_active_bookings(
        &self,
        center_id: Uuid,
        date: &str,
        seat_type: SeatType,
    ) -> Result<Vec<Booking>> {
        self.bookings().list_active_for_slot(center_id, date, seat_type)
    }

    fn list_user_bookings(&self, user_id: Uuid) -> Result<Vec<UserBooking>> {
        self.bookings().list_for_user(user_id)
    }

    fn list_center_bookings(&self, center_id: Uuid) -> Result<Vec<CenterBooking>> {
        self.bookings().list_for_center(center_id)
    }

    fn update_booking_status(&self, booking_id: Uuid, status: BookingStatus) -> Result<()> {
        self.bookings().update_status(booking_id, status)
    }

    fn delete_bookings_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        self.bookings().delete_created_before(cutoff)
    }
}

impl PasswordResetRepository for Database {
    fn create_password_reset(&self, reset: &PasswordReset) -> Result<()> {
        self.password_resets().create(reset)
    }

    fn find_reset_by_code(&self, phone: &str, code: &str) -> Result<Option<PasswordReset>> {
        self.password_resets().find_valid_code(phone, code)
    }

    fn find_reset_by_token(&self, token: &str) -> Result<Option<PasswordReset>> {
        self.password_resets().find_valid_token(token)
    }

    fn cleanup_password_resets(&self, now: DateTime<Utc>) -> Result<u64> {
        self.password_resets().cleanup_expired(now)
    }
}
