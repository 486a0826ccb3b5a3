//! Booking model and status workflow

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::CenterSummary;
use crate::error::{Error, Result};

/// Longest single booking, in hours
pub const MAX_DURATION_HOURS: u32 = 24;
/// Most seats one booking may reserve
pub const MAX_SEATS: u32 = 1000;

/// Seat class a booking reserves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatType {
    #[default]
    Standard,
    Vip,
    Stage,
}

impl SeatType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeatType::Standard => "standard",
            SeatType::Vip => "vip",
            SeatType::Stage => "stage",
        }
    }

    pub fn from_db(s: &str) -> SeatType {
        match s {
            "vip" => SeatType::Vip,
            "stage" => SeatType::Stage,
            _ => SeatType::Standard,
        }
    }
}

impl std::fmt::Display for SeatType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Booking lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    pub fn from_db(s: &str) -> BookingStatus {
        match s {
            "confirmed" => BookingStatus::Confirmed,
            "cancelled" => BookingStatus::Cancelled,
            "completed" => BookingStatus::Completed,
            _ => BookingStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Completed)
    }

    /// States reachable in one step
    pub fn next_states(&self) -> &'static [BookingStatus] {
        match self {
            BookingStatus::Pending => &[BookingStatus::Confirmed, BookingStatus::Cancelled],
            BookingStatus::Confirmed => &[BookingStatus::Cancelled, BookingStatus::Completed],
            BookingStatus::Cancelled | BookingStatus::Completed => &[],
        }
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        self.next_states().contains(&next)
    }

    /// Validate a transition, returning the new state
    pub fn transition(self, next: BookingStatus) -> Result<BookingStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(Error::InvalidOperation(format!(
                "booking cannot move from {} to {}",
                self.as_str(),
                next.as_str()
            )))
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A seat reservation at a center
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    #[serde(rename = "center")]
    pub center_id: Uuid,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:mm`
    pub time: String,
    /// Hours
    pub duration: u32,
    #[serde(rename = "type")]
    pub seat_type: SeatType,
    pub seats: u32,
    pub price: i64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        user_id: Uuid,
        center_id: Uuid,
        date: String,
        time: String,
        seat_type: SeatType,
        price: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            center_id,
            date,
            time,
            duration: 1,
            seat_type,
            seats: 1,
            price,
            status: BookingStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn with_duration(mut self, hours: u32) -> Self {
        self.duration = hours;
        self
    }

    pub fn with_seats(mut self, seats: u32) -> Self {
        self.seats = seats;
        self
    }

    /// Check date/time formats and positive amounts
    pub fn validate(&self) -> Result<()> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .map_err(|_| Error::Validation(format!("invalid date '{}'", self.date)))?;
        parse_start_minutes(&self.time)?;
        if !(1..=MAX_DURATION_HOURS).contains(&self.duration) {
            return Err(Error::Validation(format!(
                "duration must be 1 to {} hours",
                MAX_DURATION_HOURS
            )));
        }
        if !(1..=MAX_SEATS).contains(&self.seats) {
            return Err(Error::Validation(format!("seats must be 1 to {}", MAX_SEATS)));
        }
        if self.price < 0 {
            return Err(Error::Validation("price cannot be negative".into()));
        }
        Ok(())
    }

    /// Minutes-of-day window `[start, end)`
    pub fn window(&self) -> Result<(u32, u32)> {
        let start = parse_start_minutes(&self.time)?;
        let end = self
            .duration
            .checked_mul(60)
            .and_then(|mins| start.checked_add(mins))
            .ok_or_else(|| Error::Validation(format!("duration {}h is too long", self.duration)))?;
        Ok((start, end))
    }

    pub fn overlaps(&self, other: &Booking) -> Result<bool> {
        let (a_start, a_end) = self.window()?;
        let (b_start, b_end) = other.window()?;
        Ok(a_start < b_end && a_end > b_start)
    }
}

fn parse_start_minutes(time: &str) -> Result<u32> {
    let t = NaiveTime::parse_from_str(time, "%H:%M")
        .map_err(|_| Error::Validation(format!("invalid time '{}'", time)))?;
    Ok(chrono::Timelike::hour(&t) * 60 + chrono::Timelike::minute(&t))
}

/// Seats already taken by `existing` bookings that overlap `candidate`.
///
/// Only bookings for the same center, date and seat type that are not
/// cancelled count.
pub fn occupied_seats(candidate: &Booking, existing: &[Booking]) -> Result<u32> {
    let mut taken: u32 = 0;
    for other in existing {
        if other.id == candidate.id
            || other.center_id != candidate.center_id
            || other.date != candidate.date
            || other.seat_type != candidate.seat_type
            || other.status == BookingStatus::Cancelled
        {
            continue;
        }
        if candidate.overlaps(other)? {
            taken = taken
                .checked_add(other.seats)
                .ok_or_else(|| Error::Validation("seat count overflow".into()))?;
        }
    }
    Ok(taken)
}

/// Reject `candidate` if it would exceed `capacity` seats; 0 means unlimited
pub fn check_capacity(candidate: &Booking, existing: &[Booking], capacity: u32) -> Result<()> {
    if capacity == 0 {
        return Ok(());
    }
    let taken = occupied_seats(candidate, existing)?;
    let requested = taken.checked_add(candidate.seats);
    if requested.map_or(true, |total| total > capacity) {
        return Err(Error::CapacityExceeded {
            seat_type: candidate.seat_type.to_string(),
            available: capacity.saturating_sub(taken),
        });
    }
    Ok(())
}

/// User reference embedded in center booking listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingUser {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub full_name: String,
    pub username: Option<String>,
    pub email: String,
    pub phone: Option<String>,
}

/// Booking listed for its user, with the center populated
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserBooking {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub center: CenterSummary,
    pub date: String,
    pub time: String,
    pub duration: u32,
    #[serde(rename = "type")]
    pub seat_type: SeatType,
    pub seats: u32,
    pub price: i64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl UserBooking {
    pub fn new(booking: Booking, center: CenterSummary) -> Self {
        Self {
            id: booking.id,
            center,
            date: booking.date,
            time: booking.time,
            duration: booking.duration,
            seat_type: booking.seat_type,
            seats: booking.seats,
            price: booking.price,
            status: booking.status,
            created_at: booking.created_at,
        }
    }
}

/// Booking listed for a center, with the booking user populated
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CenterBooking {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user: BookingUser,
    pub center: Uuid,
    pub date: String,
    pub time: String,
    pub duration: u32,
    #[serde(rename = "type")]
    pub seat_type: SeatType,
    pub seats: u32,
    pub price: i64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl CenterBooking {
    pub fn new(booking: Booking, user: BookingUser) -> Self {
        Self {
            id: booking.id,
            user,
            center: booking.center_id,
            date: booking.date,
            time: booking.time,
            duration: booking.duration,
            seat_type: booking.seat_type,
            seats: booking.seats,
            price: booking.price,
            status: booking.status,
            created_at: booking.created_at,
        }
    }
}
