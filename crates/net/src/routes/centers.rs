//! Center listing and management

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use playzone_core::subscription::{check_center_limit, check_image_limit, require_owner_feature};
use playzone_core::OwnerFeature;
use playzone_core::{
    bucket_centers, Action, Bonus, Center, CenterFilter, CenterRepository, DomainEvent,
    FilterToggles, GeoPoint, Marker, Occupancy, PermissionMatrix, Plan, PriceRange, Pricing,
    SeatCapacity, User, UserRepository, ViewPermissions,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::extract::{AuthUser, MaybeUser};
use crate::state::ApiState;

pub fn router() -> Router<ApiState> {
    Router::new()
        .route("/", get(list_centers).post(create_center))
        .route("/buckets", get(center_buckets))
        .route("/markers", get(center_markers))
        .route(
            "/:id",
            get(get_center).put(update_center).delete(delete_center),
        )
        .route("/:id/occupancy", put(update_occupancy))
}

/// Filter state sent by the map and list views
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CenterQuery {
    pub category: Option<String>,
    pub q: Option<String>,
    pub only_green: bool,
    pub only_orange: bool,
    pub price_range: Option<String>,
}

impl CenterQuery {
    fn filter(&self) -> CenterFilter {
        let toggles = FilterToggles {
            only_green: self.only_green,
            only_orange: self.only_orange,
            price_range: self
                .price_range
                .as_deref()
                .map(PriceRange::parse)
                .unwrap_or_default(),
        };
        CenterFilter::new(
            self.category.as_deref().unwrap_or("all"),
            self.q.as_deref().unwrap_or(""),
            toggles,
        )
    }
}

/// Centers visible to the viewer, redacted when they cannot see details
fn visible_centers(
    state: &ApiState,
    viewer: Option<&User>,
    query: &CenterQuery,
) -> ApiResult<(Vec<Center>, ViewPermissions)> {
    let perms = ViewPermissions::for_viewer(viewer, Utc::now());
    let centers = state.with_db(|db| db.list_centers())?;

    let visible = if perms.can_view_details {
        let filter = query.filter();
        centers.into_iter().filter(|c| filter.matches(c)).collect()
    } else {
        let filter = query.filter().without_occupancy();
        centers
            .iter()
            .filter(|c| filter.matches(c))
            .map(Center::redacted)
            .collect()
    };
    Ok((visible, perms))
}

#[instrument(skip(state, viewer, query))]
async fn list_centers(
    State(state): State<ApiState>,
    MaybeUser(viewer): MaybeUser,
    Query(query): Query<CenterQuery>,
) -> ApiResult<Json<Vec<Center>>> {
    let (centers, _) = visible_centers(&state, viewer.as_ref(), &query)?;
    Ok(Json(centers))
}

async fn center_buckets(
    State(state): State<ApiState>,
    MaybeUser(viewer): MaybeUser,
    Query(query): Query<CenterQuery>,
) -> ApiResult<Json<Value>> {
    let (centers, perms) = visible_centers(&state, viewer.as_ref(), &query)?;
    let buckets = bucket_centers(&centers);
    Ok(Json(json!({
        "bonus": buckets.bonus,
        "special": buckets.special,
        "regular": buckets.regular,
        "permissions": perms,
    })))
}

async fn center_markers(
    State(state): State<ApiState>,
    MaybeUser(viewer): MaybeUser,
    Query(query): Query<CenterQuery>,
) -> ApiResult<Json<Value>> {
    let now = Utc::now();
    let (centers, perms) = visible_centers(&state, viewer.as_ref(), &query)?;
    let markers: Vec<Marker<'_>> = centers
        .iter()
        .filter(|c| c.location.is_some())
        .map(|c| Marker::derive(c, perms.can_view_details, now))
        .collect();
    Ok(Json(json!({ "markers": markers, "permissions": perms })))
}

async fn get_center(
    State(state): State<ApiState>,
    MaybeUser(viewer): MaybeUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Center>> {
    let center = find_center(&state, id)?;
    let perms = ViewPermissions::for_viewer(viewer.as_ref(), Utc::now());
    if perms.can_view_details {
        Ok(Json(center))
    } else {
        Ok(Json(center.redacted()))
    }
}

/// Editable center fields; absent fields are left unchanged
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CenterInput {
    pub name: Option<String>,
    pub category: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub opening: Option<String>,
    pub price: Option<String>,
    pub logo: Option<String>,
    pub rating: Option<f64>,
    pub images: Option<Vec<String>>,
    pub videos: Option<Vec<String>>,
    pub facilities: Option<Vec<String>>,
    pub pricing: Option<Pricing>,
    pub occupancy: Option<Occupancy>,
    pub seats: Option<SeatCapacity>,
    pub bonus: Option<Vec<Bonus>>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// Admins may create a center on behalf of an owner
    pub owner_id: Option<Uuid>,
}

impl CenterInput {
    fn apply(self, center: &mut Center) {
        replace_if_set(&mut center.category, self.category);
        replace_if_set(&mut center.address, self.address);
        replace_if_set(&mut center.description, self.description);
        replace_if_set(&mut center.phone, self.phone);
        replace_if_set(&mut center.email, self.email);
        replace_if_set(&mut center.website, self.website);
        replace_if_set(&mut center.opening, self.opening);
        replace_if_set(&mut center.price, self.price);
        replace_if_set(&mut center.logo, self.logo);
        replace_if_set(&mut center.rating, self.rating);

        if let Some(name) = self.name {
            center.name = name.trim().to_string();
        }
        if let Some(images) = self.images {
            center.images = images;
        }
        if let Some(videos) = self.videos {
            center.videos = videos;
        }
        if let Some(facilities) = self.facilities {
            center.facilities = facilities;
        }
        if let Some(pricing) = self.pricing {
            center.pricing = pricing;
        }
        if let Some(occupancy) = self.occupancy {
            center.occupancy = occupancy;
        }
        if let Some(seats) = self.seats {
            center.seats = seats;
        }
        if let Some(mut bonus) = self.bonus {
            let now = Utc::now();
            for b in &mut bonus {
                b.created_at.get_or_insert(now);
            }
            center.bonus = bonus;
        }
        if let (Some(lat), Some(lng)) = (self.lat, self.lng) {
            center.location = Some(GeoPoint::new(lat, lng));
        }
    }
}

fn replace_if_set<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

fn find_center(state: &ApiState, id: Uuid) -> ApiResult<Center> {
    state
        .with_db(|db| db.find_center_by_id(id))?
        .ok_or_else(|| ApiError::NotFound("Center not found".into()))
}

/// Load a center the caller may manage
fn managed_center(state: &ApiState, user: &User, id: Uuid, action: Action) -> ApiResult<Center> {
    if !PermissionMatrix::can_perform(user.role, action) {
        return Err(ApiError::Forbidden("Center owner access required".into()));
    }
    let center = find_center(state, id)?;
    if !PermissionMatrix::can_manage_center(user, &center) {
        return Err(ApiError::Forbidden(
            "Access denied. You do not own this center.".into(),
        ));
    }
    // Lapsed owners may still remove their listing
    if action != Action::DeleteCenter {
        require_owner_feature(user, None, Utc::now())?;
    }
    Ok(center)
}

/// Image count and video uploads are limited by the owner's plan
fn check_media(user: &User, center: &Center, now: DateTime<Utc>) -> playzone_core::Result<()> {
    check_image_limit(user, center.images.len(), now)?;
    if !center.videos.is_empty() {
        require_owner_feature(user, Some(OwnerFeature::Video), now)?;
    }
    Ok(())
}

#[instrument(skip(state, user, input), fields(user_id = %user.id))]
async fn create_center(
    State(state): State<ApiState>,
    AuthUser(user): AuthUser,
    Json(input): Json<CenterInput>,
) -> ApiResult<(StatusCode, Json<Center>)> {
    if !PermissionMatrix::can_perform(user.role, Action::CreateCenter) {
        return Err(ApiError::Forbidden("Center owner access required".into()));
    }
    let now = Utc::now();

    let owner_id = match (user.is_admin(), input.owner_id) {
        (true, Some(owner_id)) => Some(owner_id),
        (true, None) => None,
        (false, _) => Some(user.id),
    };

    let requested_owner = input.owner_id;
    let mut center = Center::new(String::new());
    input.apply(&mut center);
    center.validate()?;
    if let Some(owner_id) = owner_id {
        center = center.with_owner(owner_id, Plan::Free);
    }

    let created = state.with_db(|db| {
        if !user.is_admin() {
            let count = db.count_centers_for_owner(user.id)?;
            check_center_limit(&user, count, now)?;
            check_media(&user, &center, now)?;
        }
        if let Some(owner_id) = requested_owner {
            if db.find_user_by_id(owner_id)?.is_none() {
                return Err(playzone_core::Error::NotFound(format!("owner {}", owner_id)));
            }
        }
        db.create_center(&center)?;
        db.find_center_by_id(center.id)
    })?;
    let created = created.ok_or_else(|| ApiError::Internal("created center vanished".into()))?;

    info!(center_id = %created.id, "Center created");
    state.publish(DomainEvent::CentersUpdated {
        center_id: created.id,
    });
    Ok((StatusCode::CREATED, Json(created)))
}

#[instrument(skip(state, user, input), fields(user_id = %user.id))]
async fn update_center(
    State(state): State<ApiState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(input): Json<CenterInput>,
) -> ApiResult<Json<Center>> {
    let mut center = managed_center(&state, &user, id, Action::EditCenter)?;
    input.apply(&mut center);
    center.validate()?;

    let updated = state.with_db(|db| {
        check_media(&user, &center, Utc::now())?;
        db.update_center(&center)?;
        db.find_center_by_id(id)
    })?;
    let updated = updated.ok_or_else(|| ApiError::NotFound("Center not found".into()))?;

    state.publish(DomainEvent::CentersUpdated { center_id: id });
    Ok(Json(updated))
}

#[instrument(skip(state, user), fields(user_id = %user.id))]
async fn delete_center(
    State(state): State<ApiState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    managed_center(&state, &user, id, Action::DeleteCenter)?;
    state.with_db(|db| db.delete_center(id))?;

    info!(center_id = %id, "Center deleted");
    state.publish(DomainEvent::CentersUpdated { center_id: id });
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Serialize)]
struct OccupancyResponse {
    message: &'static str,
    occupancy: Occupancy,
}

async fn update_occupancy(
    State(state): State<ApiState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
    Json(occupancy): Json<Occupancy>,
) -> ApiResult<Json<OccupancyResponse>> {
    managed_center(&state, &user, id, Action::UpdateOccupancy)?;
    occupancy.validate()?;
    state.with_db(|db| db.update_occupancy(id, &occupancy))?;

    state.publish(DomainEvent::OccupancyUpdated {
        center_id: id,
        occupancy,
    });
    Ok(Json(OccupancyResponse {
        message: "Occupancy updated",
        occupancy,
    }))
}
