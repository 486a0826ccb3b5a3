//! Data models for PlayZone

mod booking;
mod center;
mod password_reset;
mod plan;
mod user;

pub use booking::*;
pub use center::*;
pub use password_reset::*;
pub use plan::*;
pub use user::*;
