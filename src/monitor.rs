use crate::api::DuplicatiClient;
use crate::error::{Error, Result};
use crate::metrics::values::ReconciledMetrics;
use crate::output::OutputHandler;
use crate::reconcile::reconcile;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::MissedTickBehavior;

/// Polls one backup job and keeps the last-known-good reconciled metrics.
///
/// Every failure is absorbed at the tick boundary: subscribers always see the
/// previous successful result (or the initial unset state), never a transient
/// error. Ticks never overlap; a slow fetch simply delays the next one.
pub struct MonitorEngine {
    api: Arc<DuplicatiClient>,
    backup_id: String,
    interval: Duration,
    cached: Arc<Mutex<Option<ReconciledMetrics>>>,
    updates: watch::Sender<Option<ReconciledMetrics>>,
    output: Arc<Mutex<Box<dyn OutputHandler>>>,
}

impl MonitorEngine {
    pub fn new(
        api: Arc<DuplicatiClient>,
        backup_id: String,
        interval: Duration,
        output: Box<dyn OutputHandler>,
    ) -> Self {
        let (updates, _) = watch::channel(None);
        Self {
            api,
            backup_id,
            interval,
            cached: Arc::new(Mutex::new(None)),
            updates,
            output: Arc::new(Mutex::new(output)),
        }
    }

    /// One fetch + reconcile, without touching the cache.
    pub async fn poll_once(&self) -> Result<ReconciledMetrics> {
        let entry = self.api.get_backup(&self.backup_id).await?;
        reconcile(&entry.metadata)
    }

    /// One poll tick. On success the cache is overwritten and subscribers are
    /// notified; on any failure the cache is left untouched.
    pub async fn refresh(&self) {
        match self.poll_once().await {
            Ok(metrics) => {
                *self.cached.lock().await = Some(metrics.clone());
                let _ = self.updates.send(Some(metrics.clone()));
                let mut output = self.output.lock().await;
                if let Err(e) = output.write(&metrics).await {
                    log::error!("Error writing sensor output: {}", e);
                }
            }
            Err(Error::CannotConnect(e)) => log::error!("Failed to connect: {}", e),
            Err(Error::InvalidAuth(e)) => log::error!("Authentication failed: {}", e),
            Err(Error::ApiResponse(e)) => log::error!("API response error: {}", e),
            Err(Error::MalformedData(e)) => log::error!("Malformed server data: {}", e),
            Err(e) => log::error!("Unexpected error during poll: {}", e),
        }
    }

    /// Poll until ctrl-c.
    pub async fn run(&self) {
        log::info!(
            "Polling backup '{}' on {} every {}s",
            self.backup_id,
            self.api.host(),
            self.interval.as_secs()
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.refresh().await,
                _ = tokio::signal::ctrl_c() => {
                    log::info!("Shutting down...");
                    break;
                }
            }
        }

        let mut output = self.output.lock().await;
        if let Err(e) = output.close().await {
            log::error!("Error closing sensor output: {}", e);
        }
    }

    /// Last-known-good metrics, if any tick has succeeded yet.
    pub async fn current(&self) -> Option<ReconciledMetrics> {
        self.cached.lock().await.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ReconciledMetrics>> {
        self.updates.subscribe()
    }
}
