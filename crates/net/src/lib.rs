//! PlayZone Network Library
//!
//! The HTTP API over `playzone-core`.
//!
//! # Architecture
//!
//! - **Server**: binds the listener, applies CORS/trace/body-limit layers
//! - **Routes**: centers, bookings, auth, password reset, subscription, admin
//! - **Extractors**: bearer-session authentication (`AuthUser`, `MaybeUser`, `AdminUser`)
//! - **Events**: broadcast bus for `DomainEvent`s published by handlers
//!
//! # Usage
//!
//! ```ignore
//! let state = ApiState::new(Database::open(path)?, ApiSettings::default());
//! let server = Server::start(addr, state, &allowed_origins).await?;
//!
//! shutdown_signal().await;
//! server.shutdown();
//! server.wait().await?;
//! ```

pub mod error;
pub mod events;
pub mod extract;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ApiError, ApiResult, Error, Result};
pub use events::EventBus;
pub use extract::{AdminUser, AuthUser, MaybeUser};
pub use server::{router, shutdown_signal, Server};
pub use state::{ApiSettings, ApiState};

/// Default port for the PlayZone API
pub const DEFAULT_PORT: u16 = 8080;
