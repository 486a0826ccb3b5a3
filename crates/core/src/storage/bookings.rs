//! Booking storage operations

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_datetime, parse_uuid, OptionalExt};
use crate::error::{Error, Result};
use crate::models::{
    Booking, BookingStatus, BookingUser, CenterBooking, CenterSummary, SeatType, UserBooking,
};

/// Most bookings returned for one user
pub const MY_BOOKINGS_LIMIT: u32 = 100;

const BOOKING_COLUMNS: &str =
    "b.id, b.user_id, b.center_id, b.date, b.time, b.duration, b.seat_type, b.seats, b.price, \
     b.status, b.created_at";

fn booking_from_row(row: &Row<'_>) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        user_id: parse_uuid(&row.get::<_, String>(1)?)?,
        center_id: parse_uuid(&row.get::<_, String>(2)?)?,
        date: row.get(3)?,
        time: row.get(4)?,
        duration: row.get(5)?,
        seat_type: SeatType::from_db(&row.get::<_, String>(6)?),
        seats: row.get(7)?,
        price: row.get(8)?,
        status: BookingStatus::from_db(&row.get::<_, String>(9)?),
        created_at: parse_datetime(&row.get::<_, String>(10)?)?,
    })
}

pub struct BookingStore<'a> {
    conn: &'a Connection,
}

impl<'a> BookingStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new booking
    #[instrument(skip(self, booking), fields(booking_id = %booking.id, center_id = %booking.center_id))]
    pub fn create(&self, booking: &Booking) -> Result<()> {
        self.conn.execute(
            "INSERT INTO bookings (id, user_id, center_id, date, time, duration, seat_type, seats,
                price, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                booking.id.to_string(),
                booking.user_id.to_string(),
                booking.center_id.to_string(),
                booking.date,
                booking.time,
                booking.duration,
                booking.seat_type.as_str(),
                booking.seats,
                booking.price,
                booking.status.as_str(),
                booking.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find booking by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings b WHERE b.id = ?1"
        ))?;
        let booking = stmt
            .query_row(params![id.to_string()], booking_from_row)
            .optional()?;
        Ok(booking)
    }

    /// Non-cancelled bookings for one center, day and seat type
    pub fn list_active_for_slot(
        &self,
        center_id: Uuid,
        date: &str,
        seat_type: SeatType,
    ) -> Result<Vec<Booking>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings b
             WHERE b.center_id = ?1 AND b.date = ?2 AND b.seat_type = ?3 AND b.status != 'cancelled'"
        ))?;
        let bookings = stmt
            .query_map(
                params![center_id.to_string(), date, seat_type.as_str()],
                booking_from_row,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(bookings)
    }

    /// A user's bookings, newest first, with center summaries
    #[instrument(skip(self))]
    pub fn list_for_user(&self, user_id: Uuid) -> Result<Vec<UserBooking>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BOOKING_COLUMNS}, c.name, c.address, c.phone
             FROM bookings b JOIN centers c ON c.id = b.center_id
             WHERE b.user_id = ?1
             ORDER BY b.created_at DESC
             LIMIT ?2"
        ))?;
        let bookings = stmt
            .query_map(params![user_id.to_string(), MY_BOOKINGS_LIMIT], |row| {
                let booking = booking_from_row(row)?;
                let center = CenterSummary {
                    id: booking.center_id,
                    name: row.get(11)?,
                    address: row.get(12)?,
                    phone: row.get(13)?,
                };
                Ok(UserBooking::new(booking, center))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(bookings)
    }

    /// A center's bookings by date then time, with booking users
    #[instrument(skip(self))]
    pub fn list_for_center(&self, center_id: Uuid) -> Result<Vec<CenterBooking>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BOOKING_COLUMNS}, u.full_name, u.username, u.email, u.phone
             FROM bookings b JOIN users u ON u.id = b.user_id
             WHERE b.center_id = ?1
             ORDER BY b.date, b.time"
        ))?;
        let bookings = stmt
            .query_map(params![center_id.to_string()], |row| {
                let booking = booking_from_row(row)?;
                let full_name: Option<String> = row.get(11)?;
                let username: Option<String> = row.get(12)?;
                let display = full_name
                    .filter(|s| !s.trim().is_empty())
                    .or_else(|| username.clone().filter(|s| !s.trim().is_empty()))
                    .unwrap_or_else(|| "Guest".to_string());
                let user = BookingUser {
                    id: booking.user_id,
                    full_name: display,
                    username,
                    email: row.get(13)?,
                    phone: row.get(14)?,
                };
                Ok(CenterBooking::new(booking, user))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(bookings)
    }

    #[instrument(skip(self))]
    pub fn update_status(&self, booking_id: Uuid, status: BookingStatus) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE bookings SET status = ?1 WHERE id = ?2",
            params![status.as_str(), booking_id.to_string()],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("booking {}", booking_id)));
        }
        Ok(())
    }

    /// Delete bookings created before `cutoff`
    #[instrument(skip(self))]
    pub fn delete_created_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let count = self.conn.execute(
            "DELETE FROM bookings WHERE created_at < ?1",
            params![cutoff.to_rfc3339()],
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountType, Center, User};
    use crate::storage::Database;
    use chrono::Duration;

    fn setup() -> (Database, User, Center) {
        let db = Database::open_in_memory().unwrap();
        let user = User::new("b@pz.mn".into(), "hash".into(), AccountType::User);
        db.users().create(&user).unwrap();
        let mut center = Center::new("Arena".into());
        center.address = Some("Sukhbaatar".into());
        db.centers().create(&center).unwrap();
        (db, user, center)
    }

    fn booking(user: &User, center: &Center, date: &str, time: &str) -> Booking {
        Booking::new(user.id, center.id, date.into(), time.into(), SeatType::Standard, 5000)
    }

    #[test]
    fn test_create_and_list_for_user() {
        let (db, user, center) = setup();
        let mut older = booking(&user, &center, "2025-03-01", "10:00");
        older.created_at = Utc::now() - Duration::hours(1);
        let newer = booking(&user, &center, "2025-03-02", "12:00");
        db.bookings().create(&older).unwrap();
        db.bookings().create(&newer).unwrap();

        let mine = db.bookings().list_for_user(user.id).unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].id, newer.id);
        assert_eq!(mine[0].center.name, "Arena");
        assert_eq!(mine[0].center.address.as_deref(), Some("Sukhbaatar"));
    }

    #[test]
    fn test_list_for_center_sorted_with_guest_name() {
        let (db, user, center) = setup();
        db.bookings().create(&booking(&user, &center, "2025-03-02", "09:00")).unwrap();
        db.bookings().create(&booking(&user, &center, "2025-03-01", "18:00")).unwrap();
        db.bookings().create(&booking(&user, &center, "2025-03-01", "08:00")).unwrap();

        let listed = db.bookings().list_for_center(center.id).unwrap();
        let order: Vec<_> = listed.iter().map(|b| (b.date.as_str(), b.time.as_str())).collect();
        assert_eq!(
            order,
            vec![("2025-03-01", "08:00"), ("2025-03-01", "18:00"), ("2025-03-02", "09:00")]
        );
        assert_eq!(listed[0].user.full_name, "Guest");
    }

    #[test]
    fn test_active_slot_excludes_cancelled() {
        let (db, user, center) = setup();
        let kept = booking(&user, &center, "2025-03-01", "10:00");
        let cancelled = booking(&user, &center, "2025-03-01", "10:00");
        db.bookings().create(&kept).unwrap();
        db.bookings().create(&cancelled).unwrap();
        db.bookings()
            .update_status(cancelled.id, BookingStatus::Cancelled)
            .unwrap();

        let active = db
            .bookings()
            .list_active_for_slot(center.id, "2025-03-01", SeatType::Standard)
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, kept.id);
    }

    #[test]
    fn test_delete_created_before() {
        let (db, user, center) = setup();
        let mut old = booking(&user, &center, "2025-01-01", "10:00");
        old.created_at = Utc::now() - Duration::days(6);
        let fresh = booking(&user, &center, "2025-03-01", "10:00");
        db.bookings().create(&old).unwrap();
        db.bookings().create(&fresh).unwrap();

        let removed = db
            .bookings()
            .delete_created_before(Utc::now() - Duration::days(5))
            .unwrap();
        assert_eq!(removed, 1);
        assert!(db.bookings().find_by_id(old.id).unwrap().is_none());
        assert!(db.bookings().find_by_id(fresh.id).unwrap().is_some());
    }

    #[test]
    fn test_update_missing_booking() {
        let (db, _, _) = setup();
        let err = db
            .bookings()
            .update_status(Uuid::new_v4(), BookingStatus::Confirmed)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
