//! Periodic propagation sampling.

use crate::error::{PropagationError, Result};
use crate::intelligence::PropagationIntelligence;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Background task that refreshes a [`PropagationIntelligence`] store on a
/// fixed interval until stopped.
pub struct PropagationService {
    intelligence: Arc<PropagationIntelligence>,
    interval: Duration,
    running: Mutex<Option<Running>>,
}

impl PropagationService {
    pub fn new(intelligence: Arc<PropagationIntelligence>, interval: Duration) -> Self {
        Self {
            intelligence,
            interval,
            running: Mutex::new(None),
        }
    }

    pub fn intelligence(&self) -> &Arc<PropagationIntelligence> {
        &self.intelligence
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    /// Take one sample immediately, then keep sampling every interval.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> Result<()> {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if running.as_ref().is_some_and(|r| !r.handle.is_finished()) {
            return Err(PropagationError::AlreadyRunning);
        }

        self.intelligence.refresh();

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let intelligence = Arc::clone(&self.intelligence);
        let period = self.interval;

        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        intelligence.refresh();
                    }
                }
            }
            tracing::debug!("propagation sampling loop exited");
        });

        *running = Some(Running { cancel, handle });
        tracing::info!(interval_secs = period.as_secs(), "propagation service started");
        Ok(())
    }

    /// Cancel the sampling task and wait for it to finish. No-op when idle.
    pub async fn stop(&self) -> Result<()> {
        let running = self.running.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(Running { cancel, handle }) = running else {
            return Ok(());
        };

        cancel.cancel();
        handle
            .await
            .map_err(|e| PropagationError::TaskFailed(e.to_string()))?;
        tracing::info!("propagation service stopped");
        Ok(())
    }
}

impl Drop for PropagationService {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().ok().and_then(Option::take) {
            running.cancel.cancel();
        }
    }
}
