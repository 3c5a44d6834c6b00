//! Cleanup Scheduler: a background task that periodically
//! sweeps expired repository entries so a long-lived process does not
//! grow the revocation/rotation sets without bound.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::repository::TokenRepository;

/// Owns a background task that calls
/// [`TokenRepository::cleanup_expired`] on a fixed interval until stopped
/// or dropped. Stopping is idempotent and safe to call from `Drop`.
pub struct CleanupScheduler {
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl CleanupScheduler {
    /// Spawns the background sweep loop against `repository`.
    pub fn start<R>(repository: Arc<R>, interval: Duration, batch_limit: usize) -> Self
    where
        R: TokenRepository + 'static,
    {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => {
                        debug!("cleanup scheduler stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        match repository.cleanup_expired(Utc::now(), batch_limit).await {
                            Ok(removed) if removed > 0 => {
                                debug!(removed, "cleanup pass removed expired repository entries");
                            }
                            Ok(_) => {}
                            Err(error) => {
                                warn!(%error, "cleanup pass failed, will retry next interval");
                            }
                        }
                    }
                }
            }
        });

        Self {
            cancel,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Signals the background task to stop and aborts it if it has not
    /// already exited. Safe to call more than once.
    pub fn stop(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.lock().expect("cleanup scheduler mutex poisoned").take() {
            handle.abort();
        }
    }
}

impl Drop for CleanupScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
