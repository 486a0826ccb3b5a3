//! Domain events published after state changes

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{BookingStatus, Occupancy};

/// Notification that listeners (map views, dashboards) should refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DomainEvent {
    /// A center was created, edited or removed
    #[serde(rename_all = "camelCase")]
    CentersUpdated { center_id: Uuid },
    #[serde(rename_all = "camelCase")]
    OccupancyUpdated { center_id: Uuid, occupancy: Occupancy },
    #[serde(rename_all = "camelCase")]
    BookingStatusChanged { booking_id: Uuid, status: BookingStatus },
    /// Admin changed a user's plan
    #[serde(rename_all = "camelCase")]
    AdminChanged { user_id: Uuid },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::CentersUpdated { .. } => "centersUpdated",
            DomainEvent::OccupancyUpdated { .. } => "occupancyUpdated",
            DomainEvent::BookingStatusChanged { .. } => "bookingStatusChanged",
            DomainEvent::AdminChanged { .. } => "adminChanged",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tagging() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(DomainEvent::BookingStatusChanged {
            booking_id: id,
            status: BookingStatus::Confirmed,
        })
        .unwrap();
        assert_eq!(json["type"], "bookingStatusChanged");
        assert_eq!(json["bookingId"], id.to_string());
        assert_eq!(json["status"], "confirmed");
    }
}
