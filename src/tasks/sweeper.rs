use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::chat::ChatService;
use crate::metrics::SweepMetrics;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SweeperError {
    #[error("Sweep interval must be greater than zero")]
    ZeroInterval,
}

/// Background task that deletes expired messages on a fixed interval
pub struct ExpirySweeper {
    chat: Arc<ChatService>,
    interval: Duration,
    shutdown: broadcast::Receiver<()>,
}

impl ExpirySweeper {
    pub fn new(
        chat: Arc<ChatService>,
        interval: Duration,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<Self, SweeperError> {
        if interval.is_zero() {
            return Err(SweeperError::ZeroInterval);
        }

        Ok(Self {
            chat,
            interval,
            shutdown,
        })
    }

    /// Run until shutdown. A failed sweep is logged and retried on the next tick.
    ///
    /// Losing the shutdown sender does not stop the sweeper.
    pub async fn run(mut self) {
        let mut timer = tokio::time::interval(self.interval);

        // Skip immediate first tick
        timer.tick().await;

        tracing::info!(
            sweep_interval_secs = self.interval.as_secs_f64(),
            message_lifetime_secs = self.chat.message_lifetime().num_seconds(),
            "Expiry sweeper started"
        );

        let mut watch_shutdown = true;

        loop {
            tokio::select! {
                signal = self.shutdown.recv(), if watch_shutdown => {
                    if let Err(RecvError::Closed) = signal {
                        tracing::debug!("Shutdown sender dropped, sweeper keeps running");
                        watch_shutdown = false;
                        continue;
                    }
                    tracing::info!("Expiry sweeper received shutdown signal");
                    break;
                }
                _ = timer.tick() => {
                    self.sweep().await;
                }
            }
        }

        tracing::info!("Expiry sweeper stopped");
    }

    async fn sweep(&self) {
        match self.chat.cleanup_expired_messages().await {
            Ok(removed) => {
                SweepMetrics::record_success(removed);
                if removed > 0 {
                    tracing::info!(removed = removed, "Removed expired messages");
                } else {
                    tracing::trace!("No expired messages");
                }
            }
            Err(e) => {
                SweepMetrics::record_failure();
                tracing::warn!(error = %e, "Expired message cleanup failed");
            }
        }
    }
}
