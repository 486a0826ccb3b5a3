//! Center model - a bookable gaming venue

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Plan, SeatType};
use crate::error::{Error, Result};

/// Display prices per seat type, kept as entered (e.g. "3,500₮")
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Pricing {
    pub standard: Option<String>,
    pub vip: Option<String>,
    pub stage: Option<String>,
    pub overnight: Option<String>,
}

/// Utilization percentage per seat type
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Occupancy {
    pub standard: Option<f64>,
    pub vip: Option<f64>,
    pub stage: Option<f64>,
}

impl Occupancy {
    /// Highest reported utilization; missing fields count as 0
    pub fn max(&self) -> f64 {
        [self.standard, self.vip, self.stage]
            .into_iter()
            .map(|v| v.unwrap_or(0.0))
            .fold(0.0, f64::max)
    }

    pub fn is_empty(&self) -> bool {
        self.standard.is_none() && self.vip.is_none() && self.stage.is_none()
    }

    /// Each reported value must be a percentage
    pub fn validate(&self) -> Result<()> {
        for pct in [self.standard, self.vip, self.stage].into_iter().flatten() {
            if !(0.0..=100.0).contains(&pct) {
                return Err(Error::Validation(format!(
                    "occupancy {} is outside 0-100",
                    pct
                )));
            }
        }
        Ok(())
    }
}

/// Seat capacity per seat type; 0 means unlimited
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SeatCapacity {
    pub standard: u32,
    pub vip: u32,
    pub stage: u32,
}

impl SeatCapacity {
    pub fn for_type(&self, seat_type: SeatType) -> u32 {
        match seat_type {
            SeatType::Standard => self.standard,
            SeatType::Vip => self.vip,
            SeatType::Stage => self.stage,
        }
    }
}

/// Promotional offer attached to a center
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Bonus {
    pub title: Option<String>,
    pub text: Option<String>,
    pub standard_free: Option<u32>,
    pub vip_free: Option<u32>,
    pub stage_free: Option<u32>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Bonus {
    pub fn has_content(&self) -> bool {
        let filled = |s: &Option<String>| s.as_deref().is_some_and(|s| !s.trim().is_empty());
        filled(&self.title) || filled(&self.text)
    }
}

/// GeoJSON point, `[lng, lat]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub coordinates: [f64; 2],
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            coordinates: [lng, lat],
        }
    }

    pub fn lat(&self) -> f64 {
        self.coordinates[1]
    }

    pub fn lng(&self) -> f64 {
        self.coordinates[0]
    }
}

/// Owner subscription snapshot embedded in center listings
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerPlan {
    pub plan: Plan,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Owner reference embedded in center listings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OwnerSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub subscription: OwnerPlan,
}

/// A bookable venue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Center {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    /// Free-form category as entered; see `CenterCategory::normalize`
    pub category: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub opening: Option<String>,
    /// Legacy single price field
    pub price: Option<String>,
    pub logo: Option<String>,
    pub rating: Option<f64>,
    pub images: Vec<String>,
    /// Video URLs; uploading needs the video feature
    #[serde(default)]
    pub videos: Vec<String>,
    pub facilities: Vec<String>,
    pub pricing: Pricing,
    pub occupancy: Occupancy,
    pub seats: SeatCapacity,
    pub bonus: Vec<Bonus>,
    pub owner: Option<OwnerSummary>,
    pub location: Option<GeoPoint>,
    pub created_at: DateTime<Utc>,
}

impl Center {
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            category: None,
            address: None,
            description: None,
            phone: None,
            email: None,
            website: None,
            opening: None,
            price: None,
            logo: None,
            rating: None,
            images: Vec::new(),
            videos: Vec::new(),
            facilities: Vec::new(),
            pricing: Pricing::default(),
            occupancy: Occupancy::default(),
            seats: SeatCapacity::default(),
            bonus: Vec::new(),
            owner: None,
            location: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn with_owner(mut self, owner_id: Uuid, plan: Plan) -> Self {
        self.owner = Some(OwnerSummary {
            id: owner_id,
            subscription: OwnerPlan {
                plan,
                expires_at: None,
            },
        });
        self
    }

    pub fn owner_id(&self) -> Option<Uuid> {
        self.owner.map(|o| o.id)
    }

    pub fn owner_plan(&self) -> Plan {
        self.owner
            .map(|o| o.subscription.plan)
            .unwrap_or_default()
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id() == Some(user_id)
    }

    /// Copy with occupancy hidden, for viewers without detail access
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("center name is required".into()));
        }
        self.occupancy.validate()
    }

    pub fn redacted(&self) -> Center {
        Center {
            occupancy: Occupancy::default(),
            ..self.clone()
        }
    }
}

/// Short center reference embedded in booking listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CenterSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_occupancy_max_defaults_missing_to_zero() {
        assert_eq!(Occupancy::default().max(), 0.0);

        let occ = Occupancy {
            standard: Some(20.0),
            vip: None,
            stage: Some(55.0),
        };
        assert_eq!(occ.max(), 55.0);
    }

    #[test]
    fn test_validate_rejects_bad_occupancy() {
        let mut center = Center::new("Arena".into());
        center.occupancy.vip = Some(120.0);
        assert!(center.validate().is_err());

        center.occupancy.vip = Some(100.0);
        assert!(center.validate().is_ok());

        center.name = "  ".into();
        assert!(center.validate().is_err());
    }

    #[test]
    fn test_geo_point_order() {
        let p = GeoPoint::new(47.917, 106.917);
        assert_eq!(p.coordinates, [106.917, 47.917]);
        assert_eq!(p.lat(), 47.917);
    }

    #[test]
    fn test_redacted_drops_occupancy_only() {
        let mut center = Center::new("Arena".into());
        center.occupancy.standard = Some(80.0);
        center.address = Some("Khan-Uul".into());

        let hidden = center.redacted();
        assert!(hidden.occupancy.is_empty());
        assert_eq!(hidden.address.as_deref(), Some("Khan-Uul"));
    }

    #[test]
    fn test_deserialize_sparse_payload() {
        let center: Center = serde_json::from_str(
            r#"{
                "_id": "11111111-1111-1111-1111-111111111111",
                "name": "Sparse",
                "category": null,
                "address": null,
                "description": null,
                "phone": null,
                "email": null,
                "website": null,
                "opening": null,
                "price": null,
                "logo": null,
                "rating": null,
                "images": [],
                "facilities": [],
                "pricing": {},
                "occupancy": {"standard": 12},
                "seats": {},
                "bonus": [{"title": "Happy hour"}],
                "owner": null,
                "location": null,
                "createdAt": "2025-01-01T00:00:00Z"
            }"#,
        )
        .unwrap();
        assert_eq!(center.occupancy.standard, Some(12.0));
        assert!(center.bonus[0].has_content());
        assert_eq!(center.owner_plan(), Plan::Free);
    }
}
