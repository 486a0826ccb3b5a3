//! PlayZone Core Library
//!
//! Core models, center filtering, plan gating, the booking workflow,
//! permissions, and storage for the PlayZone service.

pub mod auth;
pub mod category;
pub mod error;
pub mod events;
pub mod filter;
pub mod invariants;
pub mod markers;
pub mod models;
pub mod permissions;
pub mod storage;
pub mod subscription;
pub mod workflow;

pub use category::{CategorySelection, CenterCategory};
pub use error::{Error, Result};
pub use events::DomainEvent;
pub use filter::{bucket_centers, CenterBuckets, CenterFilter, FilterToggles, PriceRange};
pub use markers::{Marker, OccupancyBand};
pub use models::*;
pub use permissions::*;
pub use storage::{
    BookingRepository, CenterRepository, Database, PasswordResetRepository, Storage,
    UserRepository,
};
pub use subscription::{AccessDenial, OwnerFeature, PlanInfo, ViewPermissions};
