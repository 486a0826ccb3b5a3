//! Center storage operations

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_datetime, parse_datetime_opt, parse_json, parse_uuid, parse_uuid_opt, OptionalExt};
use crate::error::{Error, Result};
use crate::invariants::assert_center_invariants;
use crate::models::{Center, CenterSummary, GeoPoint, Occupancy, OwnerPlan, OwnerSummary, Plan};

/// Center columns plus the owner's subscription, joined from `users`
const CENTER_SELECT: &str = "SELECT c.id, c.name, c.category, c.address, c.description, c.phone, \
     c.email, c.website, c.opening, c.price, c.logo, c.rating, c.images, c.facilities, \
     c.pricing, c.occupancy, c.seats, c.bonus, c.owner_id, c.lat, c.lng, c.created_at, \
     u.sub_plan, u.sub_active, u.sub_expires, c.videos \
     FROM centers c LEFT JOIN users u ON u.id = c.owner_id";

/// Owner plan as listings see it: inactive or lapsed subscriptions read as free
fn owner_plan(
    plan: Option<String>,
    active: Option<bool>,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> OwnerPlan {
    let plan = plan.map(|p| Plan::parse_or_free(&p)).unwrap_or_default();
    let lapsed = !active.unwrap_or(false) || expires_at.is_some_and(|end| now > end);
    OwnerPlan {
        plan: if lapsed { Plan::Free } else { plan },
        expires_at,
    }
}

fn center_from_row(row: &Row<'_>) -> rusqlite::Result<Center> {
    let owner_id = parse_uuid_opt(row.get(18)?)?;
    let lat: Option<f64> = row.get(19)?;
    let lng: Option<f64> = row.get(20)?;

    let owner = match owner_id {
        Some(id) => {
            let expires_at = parse_datetime_opt(row.get(24)?)?;
            Some(OwnerSummary {
                id,
                subscription: owner_plan(row.get(22)?, row.get(23)?, expires_at, Utc::now()),
            })
        }
        None => None,
    };

    Ok(Center {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        name: row.get(1)?,
        category: row.get(2)?,
        address: row.get(3)?,
        description: row.get(4)?,
        phone: row.get(5)?,
        email: row.get(6)?,
        website: row.get(7)?,
        opening: row.get(8)?,
        price: row.get(9)?,
        logo: row.get(10)?,
        rating: row.get(11)?,
        images: parse_json(row.get(12)?)?,
        videos: parse_json(row.get(25)?)?,
        facilities: parse_json(row.get(13)?)?,
        pricing: parse_json(row.get(14)?)?,
        occupancy: parse_json(row.get(15)?)?,
        seats: parse_json(row.get(16)?)?,
        bonus: parse_json(row.get(17)?)?,
        owner,
        location: lat.zip(lng).map(|(lat, lng)| GeoPoint::new(lat, lng)),
        created_at: parse_datetime(&row.get::<_, String>(21)?)?,
    })
}

pub struct CenterStore<'a> {
    conn: &'a Connection,
}

impl<'a> CenterStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new center
    #[instrument(skip(self, center), fields(center_id = %center.id, name = %center.name))]
    pub fn create(&self, center: &Center) -> Result<()> {
        assert_center_invariants(center);
        self.conn.execute(
            "INSERT INTO centers (id, name, category, address, description, phone, email, website,
                opening, price, logo, rating, images, facilities, pricing, occupancy, seats, bonus,
                owner_id, lat, lng, created_at, videos)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                ?18, ?19, ?20, ?21, ?22, ?23)",
            params![
                center.id.to_string(),
                center.name,
                center.category,
                center.address,
                center.description,
                center.phone,
                center.email,
                center.website,
                center.opening,
                center.price,
                center.logo,
                center.rating,
                serde_json::to_string(&center.images)?,
                serde_json::to_string(&center.facilities)?,
                serde_json::to_string(&center.pricing)?,
                serde_json::to_string(&center.occupancy)?,
                serde_json::to_string(&center.seats)?,
                serde_json::to_string(&center.bonus)?,
                center.owner_id().map(|id| id.to_string()),
                center.location.map(|p| p.lat()),
                center.location.map(|p| p.lng()),
                center.created_at.to_rfc3339(),
                serde_json::to_string(&center.videos)?,
            ],
        )?;
        Ok(())
    }

    /// Find center by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Center>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CENTER_SELECT} WHERE c.id = ?1"))?;
        let center = stmt
            .query_row(params![id.to_string()], center_from_row)
            .optional()?;
        Ok(center)
    }

    /// All centers, newest first
    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<Center>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CENTER_SELECT} ORDER BY c.created_at DESC"))?;
        let centers = stmt
            .query_map([], center_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(centers)
    }

    pub fn count_by_owner(&self, owner_id: Uuid) -> Result<u32> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM centers WHERE owner_id = ?1",
            params![owner_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Overwrite all editable fields; the owner and creation time are kept
    #[instrument(skip(self, center), fields(center_id = %center.id))]
    pub fn update(&self, center: &Center) -> Result<()> {
        assert_center_invariants(center);
        let changed = self.conn.execute(
            "UPDATE centers SET name = ?1, category = ?2, address = ?3, description = ?4,
                phone = ?5, email = ?6, website = ?7, opening = ?8, price = ?9, logo = ?10,
                rating = ?11, images = ?12, facilities = ?13, pricing = ?14, occupancy = ?15,
                seats = ?16, bonus = ?17, lat = ?18, lng = ?19, videos = ?20
             WHERE id = ?21",
            params![
                center.name,
                center.category,
                center.address,
                center.description,
                center.phone,
                center.email,
                center.website,
                center.opening,
                center.price,
                center.logo,
                center.rating,
                serde_json::to_string(&center.images)?,
                serde_json::to_string(&center.facilities)?,
                serde_json::to_string(&center.pricing)?,
                serde_json::to_string(&center.occupancy)?,
                serde_json::to_string(&center.seats)?,
                serde_json::to_string(&center.bonus)?,
                center.location.map(|p| p.lat()),
                center.location.map(|p| p.lng()),
                serde_json::to_string(&center.videos)?,
                center.id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("center {}", center.id)));
        }
        Ok(())
    }

    /// Replace the occupancy percentages
    #[instrument(skip(self, occupancy))]
    pub fn update_occupancy(&self, center_id: Uuid, occupancy: &Occupancy) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE centers SET occupancy = ?1 WHERE id = ?2",
            params![serde_json::to_string(occupancy)?, center_id.to_string()],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("center {}", center_id)));
        }
        Ok(())
    }

    /// Delete a center; its bookings and favorites go with it
    #[instrument(skip(self))]
    pub fn delete(&self, center_id: Uuid) -> Result<bool> {
        let count = self.conn.execute(
            "DELETE FROM centers WHERE id = ?1",
            params![center_id.to_string()],
        )?;
        Ok(count > 0)
    }

    pub fn summary(&self, center_id: Uuid) -> Result<Option<CenterSummary>> {
        let summary = self
            .conn
            .query_row(
                "SELECT id, name, address, phone FROM centers WHERE id = ?1",
                params![center_id.to_string()],
                |row| {
                    Ok(CenterSummary {
                        id: parse_uuid(&row.get::<_, String>(0)?)?,
                        name: row.get(1)?,
                        address: row.get(2)?,
                        phone: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(summary)
    }
}
