// MIT License - Copyright (c) 2026 Peter Wright
// Panel service and host sink seams

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::debug;

use crate::error::{BridgeError, Result};
use crate::state::{HapCurrentState, HapTargetState, PanelStatus};

/// Client for a PowerLink2-style panel.
///
/// The bridge core only needs the two status operations; transport, auth and
/// protocol details live behind this trait.
#[async_trait]
pub trait PanelService: Send + Sync {
    /// Current arm status as reported by the panel.
    async fn get_status(&self) -> Result<PanelStatus>;

    /// Command the panel into the given status.
    async fn set_status(&self, status: PanelStatus) -> Result<()>;
}

/// Host-framework sink for pushed characteristic updates.
///
/// Pushes are fire-and-forget: the host acknowledges nothing, so the
/// methods are synchronous and infallible from the bridge's point of view.
pub trait StateSink: Send + Sync {
    /// Push a new current-state value to the host.
    fn update_current_state(&self, state: HapCurrentState);

    /// Push a new target-state value to the host.
    fn update_target_state(&self, state: HapTargetState);
}

/// In-memory panel used to exercise the host integration without a live
/// panel, and by the test suite.
///
/// The reported status can be overwritten out-of-band with [`report`], the
/// way a person at a physical keypad would change it.
///
/// [`report`]: SimulatedPanel::report
pub struct SimulatedPanel {
    status: Mutex<PanelStatus>,
    latency: Duration,
}

impl SimulatedPanel {
    /// Panel that answers immediately.
    pub fn new(initial: PanelStatus) -> Self {
        Self::with_latency(initial, Duration::ZERO)
    }

    /// Panel that takes `latency` to answer each call.
    pub fn with_latency(initial: PanelStatus, latency: Duration) -> Self {
        Self {
            status: Mutex::new(initial),
            latency,
        }
    }

    /// Overwrite the reported status out-of-band (external change).
    pub async fn report(&self, status: PanelStatus) {
        *self.status.lock().await = status;
    }

    /// The status the panel currently reports.
    pub async fn status(&self) -> PanelStatus {
        self.status.lock().await.clone()
    }
}

#[async_trait]
impl PanelService for SimulatedPanel {
    async fn get_status(&self) -> Result<PanelStatus> {
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }
        let status = self.status.lock().await.clone();
        debug!("Simulated panel reports: {status}");
        Ok(status)
    }

    async fn set_status(&self, status: PanelStatus) -> Result<()> {
        // The real panel rejects anything outside its command set.
        if let PanelStatus::Other(s) = &status {
            return Err(BridgeError::Service {
                message: format!("panel cannot be commanded into status '{s}'"),
            });
        }
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }
        debug!("Simulated panel set to: {status}");
        *self.status.lock().await = status;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_panel_reports_what_it_was_set_to() {
        let panel = SimulatedPanel::new(PanelStatus::Disarmed);
        assert_eq!(panel.get_status().await.unwrap(), PanelStatus::Disarmed);

        panel.set_status(PanelStatus::ArmedAway).await.unwrap();
        assert_eq!(panel.get_status().await.unwrap(), PanelStatus::ArmedAway);
    }

    #[tokio::test]
    async fn test_simulated_panel_rejects_unknown_commands() {
        let panel = SimulatedPanel::new(PanelStatus::Disarmed);
        let err = panel
            .set_status(PanelStatus::Other("exit_delay".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Service { .. }));
        // The reported status is untouched by the failed write
        assert_eq!(panel.status().await, PanelStatus::Disarmed);
    }

    #[tokio::test]
    async fn test_out_of_band_report_overrides_status() {
        let panel = SimulatedPanel::new(PanelStatus::ArmedAway);
        panel.report(PanelStatus::Other("entry_delay".into())).await;
        assert_eq!(
            panel.get_status().await.unwrap(),
            PanelStatus::Other("entry_delay".into())
        );
    }
}
