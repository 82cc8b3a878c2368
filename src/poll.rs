// MIT License - Copyright (c) 2026 Peter Wright
// Change polling

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::bridge::BridgeCore;

/// Self-rescheduling poll task.
///
/// Each cycle queries the panel through the serialized gate, reconciles the
/// observation against the last-observed state, and arms the next cycle.
/// Rearming happens whatever the query's outcome, so a failing panel slows
/// nothing down permanently; it just produces a log line per interval.
pub(crate) struct Poller {
    shutdown_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    /// Spawn the loop. The first poll runs immediately; every later one
    /// runs `polling_interval` after the previous cycle finished.
    pub(crate) fn spawn(core: Arc<BridgeCore>) -> Self {
        let interval = core.config.polling_interval;
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            loop {
                poll_once(&core).await;

                // Arm the next cycle; a shutdown request wakes the sleep
                // early instead of waiting the interval out.
                tokio::select! {
                    _ = sleep(interval) => {}
                    _ = shutdown_rx.changed() => {}
                }
                if *shutdown_rx.borrow() {
                    debug!("Polling stopped");
                    break;
                }
            }
        });

        Self {
            shutdown_tx,
            handle: Some(handle),
        }
    }

    /// Request shutdown. A query already in flight drains on its own task
    /// but does not re-arm the timer.
    pub(crate) fn stop(mut self) {
        let _ = self.shutdown_tx.send(true);
        // Detach: the task exits after the in-flight cycle, if any.
        drop(self.handle.take());
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// One poll cycle: fetch, then reconcile against the last-observed state.
pub(crate) async fn poll_once(core: &BridgeCore) {
    match core.fetch_current_state().await {
        Ok(observed) => {
            let description = observed.description().unwrap_or("unknown");
            let mut last = core.last_observed.lock().await;
            match *last {
                None => {
                    // The first observation is a baseline, not a change;
                    // pushing it would have the host announce a state change
                    // on every startup.
                    info!("State is currently set to: {description}");
                    *last = Some(observed);
                }
                Some(previous) if previous == observed => {
                    // State hasn't changed
                }
                Some(_) => {
                    info!("State was externally set to: {description}");
                    core.sink.update_current_state(observed);
                    *last = Some(observed);
                }
            }
        }
        Err(e) if e.is_transitioning() => {
            // Expected while someone is arming the system; the status
            // settles by a later cycle.
            debug!("Skipping reconciliation: {e}");
        }
        Err(e) => {
            warn!("Error polling: {e}");
        }
    }
}
