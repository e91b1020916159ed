use crate::scrape::cycle::{self, CycleError};
use crate::storage::Database;
use reqwest::Client;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// Drives the ingestion loop at a fixed cadence.
///
/// One cycle runs at a time. A tick that comes due while a cycle is still
/// in flight fires once the cycle returns; missed ticks are never stacked
/// into a catch-up burst.
pub struct Scheduler {
    db: Database,
    client: Client,
    interval: Duration,
}

impl Scheduler {
    pub fn new(db: Database, client: Client, interval: Duration) -> Self {
        Self {
            db,
            client,
            interval,
        }
    }

    /// Runs cycles until `shutdown` flips to true or the database becomes
    /// unusable. The first cycle starts immediately, before the first wait.
    ///
    /// Cycle failures are contained: an unreachable feed, a malformed
    /// document, or an empty feeds table is logged and the loop waits for
    /// the next tick. Only an unrecoverable storage error is returned.
    /// Shutdown is observed between cycles, never mid-cycle, so an
    /// in-flight cycle always finishes its writes.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<(), CycleError> {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval = ?self.interval, "Scheduler started");

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    // A dropped sender counts as a shutdown request
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Shutdown requested, stopping scheduler");
                        return Ok(());
                    }
                    continue;
                }
                _ = ticker.tick() => {}
            }

            match cycle::run_cycle(&self.db, &self.client).await {
                Ok(_) => {}
                Err(e) if e.is_fatal() => {
                    tracing::error!(error = %e, "Storage unavailable, stopping scheduler");
                    return Err(e);
                }
                Err(CycleError::NoFeeds) => {
                    tracing::info!("No feeds registered yet, waiting for next tick");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Cycle failed, waiting for next tick");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_shutdown_signal_stops_the_loop() {
        let db = Database::open(":memory:").await.unwrap();
        let client = feed::build_client().unwrap();
        let scheduler = Arc::new(Scheduler::new(db, client, Duration::from_millis(10)));

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn({
            let scheduler = scheduler.clone();
            async move { scheduler.run(rx).await }
        });

        // Let a few NoFeeds cycles pass, then signal
        tokio::time::sleep(Duration::from_millis(35)).await;
        tx.send(true).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler did not stop after shutdown signal")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_dropped_sender_stops_the_loop() {
        let db = Database::open(":memory:").await.unwrap();
        let client = feed::build_client().unwrap();
        let scheduler = Scheduler::new(db, client, Duration::from_secs(3600));

        let (tx, rx) = watch::channel(false);
        drop(tx);

        let result = tokio::time::timeout(Duration::from_secs(5), scheduler.run(rx))
            .await
            .expect("scheduler did not stop after sender drop");
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_unrecoverable_storage_error_is_returned() {
        let db = Database::open(":memory:").await.unwrap();
        db.pool.close().await;

        let client = feed::build_client().unwrap();
        let scheduler = Scheduler::new(db, client, Duration::from_millis(10));

        // Keep the sender alive so the loop only stops via the error path
        let (_tx, rx) = watch::channel(false);
        let result = tokio::time::timeout(Duration::from_secs(5), scheduler.run(rx))
            .await
            .expect("scheduler did not stop on storage loss");

        match result {
            Err(CycleError::Storage(e)) => assert!(e.is_unrecoverable()),
            other => panic!("Expected unrecoverable Storage error, got {:?}", other),
        }
    }
}
