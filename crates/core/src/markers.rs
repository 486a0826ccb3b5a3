//! Map marker derivation

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::{Bonus, Center};

/// A bonus newer than this many days marks the center as recently active
pub const RECENT_BONUS_DAYS: i64 = 3;

/// Color band for an occupancy percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OccupancyBand {
    Green,
    Yellow,
    Orange,
    Red,
}

impl OccupancyBand {
    pub fn for_percentage(pct: f64) -> OccupancyBand {
        if pct <= 25.0 {
            OccupancyBand::Green
        } else if pct <= 50.0 {
            OccupancyBand::Yellow
        } else if pct <= 75.0 {
            OccupancyBand::Orange
        } else {
            OccupancyBand::Red
        }
    }
}

/// Marker data for one center
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker<'a> {
    pub center: &'a Center,
    /// `None` when the viewer cannot see occupancy
    pub band: Option<OccupancyBand>,
    pub recent_bonus: bool,
    pub latest_bonus: Option<&'a Bonus>,
}

impl<'a> Marker<'a> {
    pub fn derive(center: &'a Center, can_view_details: bool, now: DateTime<Utc>) -> Self {
        let band = (can_view_details && !center.occupancy.is_empty())
            .then(|| OccupancyBand::for_percentage(center.occupancy.max()));
        Self {
            center,
            band,
            recent_bonus: has_recent_bonus(center, now),
            latest_bonus: latest_bonus(center),
        }
    }
}

pub fn has_recent_bonus(center: &Center, now: DateTime<Utc>) -> bool {
    let cutoff = now - Duration::days(RECENT_BONUS_DAYS);
    center
        .bonus
        .iter()
        .any(|b| b.created_at.is_some_and(|t| t >= cutoff))
}

/// Newest bonus that has a title or text
pub fn latest_bonus(center: &Center) -> Option<&Bonus> {
    center
        .bonus
        .iter()
        .filter(|b| b.has_content())
        .max_by_key(|b| b.created_at.unwrap_or(DateTime::<Utc>::MIN_UTC))
}
