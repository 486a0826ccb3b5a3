//! HTTP route tree

mod admin;
mod auth;
mod bookings;
mod centers;
mod health;
mod password_reset;
mod subscription;

use axum::Router;

use crate::state::ApiState;

pub use auth::UserView;
pub use centers::{CenterInput, CenterQuery};
pub use subscription::SubscriptionSummary;

/// All routes, before middleware layers
pub fn api_routes() -> Router<ApiState> {
    Router::new()
        .merge(health::router())
        .nest("/api/centers", centers::router())
        .nest("/api/bookings", bookings::router())
        .nest(
            "/api/auth",
            auth::router().merge(password_reset::router()),
        )
        .nest("/api/subscription", subscription::router())
        .nest("/api/admin", admin::router())
}
