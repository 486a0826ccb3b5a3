//! Shared handler state

use std::sync::{Arc, Mutex};
use std::time::Instant;

use axum::extract::FromRef;
use playzone_core::auth::SESSION_HOURS;
use playzone_core::workflow::DEFAULT_RETENTION_DAYS;
use playzone_core::{Database, DomainEvent};
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::events::EventBus;

/// Knobs the API reads at request time
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Lifetime of a login session
    pub session_hours: i64,
    /// Return the generated reset code in the forgot-password response.
    /// There is no SMS gateway, so this is the only way to see it.
    pub expose_reset_codes: bool,
    /// Age in days after which bookings are removed by cleanup
    pub booking_retention_days: i64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            session_hours: SESSION_HOURS,
            expose_reset_codes: false,
            booking_retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

#[derive(Clone)]
pub struct ApiState {
    db: Arc<Mutex<Database>>,
    pub events: EventBus,
    pub settings: Arc<ApiSettings>,
    started: Instant,
}

impl ApiState {
    pub fn new(db: Database, settings: ApiSettings) -> Self {
        Self::from_shared(Arc::new(Mutex::new(db)), settings)
    }

    /// Build on a database handle shared with background jobs
    pub fn from_shared(db: Arc<Mutex<Database>>, settings: ApiSettings) -> Self {
        Self {
            db,
            events: EventBus::new(),
            settings: Arc::new(settings),
            started: Instant::now(),
        }
    }

    /// Seconds since the state was built
    pub fn uptime_secs(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    pub fn db_handle(&self) -> Arc<Mutex<Database>> {
        self.db.clone()
    }

    /// Run `f` with the database locked. Never hold the lock across an await.
    ///
    /// A poisoned lock is recovered: each store call is a single SQLite
    /// statement or transaction, so a panicking handler leaves no partial
    /// write behind.
    pub fn with_db<T, F>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&Database) -> playzone_core::Result<T>,
    {
        let db = self.db.lock().unwrap_or_else(|poisoned| {
            warn!("Recovering poisoned database lock");
            self.db.clear_poison();
            poisoned.into_inner()
        });
        f(&db).map_err(ApiError::from)
    }

    pub fn publish(&self, event: DomainEvent) {
        self.events.publish(event);
    }
}

impl FromRef<ApiState> for EventBus {
    fn from_ref(state: &ApiState) -> Self {
        state.events.clone()
    }
}

impl FromRef<ApiState> for Arc<ApiSettings> {
    fn from_ref(state: &ApiState) -> Self {
        state.settings.clone()
    }
}
