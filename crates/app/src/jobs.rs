//! Background tasks: periodic maintenance and the event log

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use playzone_core::workflow::{run_maintenance, MaintenanceReport};
use playzone_core::Database;
use playzone_net::EventBus;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

/// One maintenance pass against the shared database
pub fn maintenance_pass(
    db: &Mutex<Database>,
    retention_days: i64,
) -> Option<MaintenanceReport> {
    let db = db.lock().unwrap_or_else(|poisoned| {
        tracing::warn!("Recovering poisoned database lock for maintenance");
        poisoned.into_inner()
    });

    match run_maintenance(&db, retention_days, Utc::now()) {
        Ok(report) => Some(report),
        Err(e) => {
            tracing::error!(error = %e, "Maintenance failed");
            None
        }
    }
}

/// Run maintenance now and then every `every`, until `shutdown` fires
pub fn spawn_maintenance(
    db: Arc<Mutex<Database>>,
    retention_days: i64,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        // First tick completes immediately
        let mut ticker = tokio::time::interval(every);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    maintenance_pass(&db, retention_days);
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Maintenance job stopping");
                    break;
                }
            }
        }
    })
}

/// Log every domain event at debug level
pub fn spawn_event_logger(events: &EventBus, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Ok(event) => tracing::debug!(event = event.name(), ?event, "Domain event"),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Event logger lagged");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = shutdown.recv() => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use playzone_core::DomainEvent;
    use uuid::Uuid;

    #[test]
    fn test_maintenance_pass_on_empty_db() {
        let db = Mutex::new(Database::open_in_memory().unwrap());
        let report = maintenance_pass(&db, 5).unwrap();
        assert_eq!(report, MaintenanceReport::default());
    }

    #[tokio::test]
    async fn test_maintenance_job_stops_on_shutdown() {
        let db = Arc::new(Mutex::new(Database::open_in_memory().unwrap()));
        let (tx, rx) = broadcast::channel(1);

        let handle = spawn_maintenance(db, 5, Duration::from_secs(3600), rx);
        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("job did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_event_logger_drains_and_stops() {
        let bus = EventBus::new();
        let (tx, rx) = broadcast::channel(1);
        let handle = spawn_event_logger(&bus, rx);

        assert_eq!(
            bus.publish(DomainEvent::CentersUpdated {
                center_id: Uuid::new_v4()
            }),
            1
        );
        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("logger did not stop")
            .unwrap();
    }
}
