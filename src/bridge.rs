// MIT License - Copyright (c) 2026 Peter Wright
// Synchronization core

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::error::Result;
use crate::poll::Poller;
use crate::query::SerializedQuery;
use crate::service::{PanelService, StateSink};
use crate::state::{
    hap_state_for, panel_command_for, HapCurrentState, HapTargetState, TargetCommand,
};

/// Static accessory identification, exposed once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessoryInfo {
    pub manufacturer: &'static str,
    pub model: &'static str,
    pub serial_number: &'static str,
}

const ACCESSORY_INFO: AccessoryInfo = AccessoryInfo {
    manufacturer: "Visonic",
    model: "PowerLink2",
    serial_number: "0",
};

/// How long the simulated setting path takes to "succeed".
const SIMULATED_SET_DELAY: Duration = Duration::from_secs(2);

/// Shared state behind a [`SecuritySystem`], also driven by the poll task.
pub(crate) struct BridgeCore {
    pub(crate) config: BridgeConfig,
    pub(crate) service: Arc<dyn PanelService>,
    pub(crate) sink: Arc<dyn StateSink>,
    query: SerializedQuery,
    /// Most recent state pushed to or confirmed by the host; `None` until
    /// the first successful poll or command. The panel stays authoritative -
    /// this is a cache for change detection only.
    pub(crate) last_observed: Mutex<Option<HapCurrentState>>,
}

impl BridgeCore {
    /// Query the panel (serialized) and map the report into HAP terms.
    pub(crate) async fn fetch_current_state(&self) -> Result<HapCurrentState> {
        debug!("getCurrentState");
        let status = self.query.run(|| self.service.get_status()).await?;
        hap_state_for(&status)
    }

    /// Map the target to its panel command, issue it, and reconcile the
    /// cached state on success. Callers have already stripped `NightArm`;
    /// the redirect loop resolves it to its substitute regardless.
    pub(crate) async fn write_target(&self, requested: HapTargetState) -> Result<()> {
        let mut target = requested;
        let status = loop {
            match panel_command_for(target) {
                TargetCommand::Set(status) => break status,
                TargetCommand::Redirect(substitute) => target = substitute,
            }
        };

        let description = target.description().unwrap_or("unknown");
        info!("Setting security system state to: {description}");

        if self.config.simulate_setting {
            info!(">>> Simulating state setting");
            sleep(SIMULATED_SET_DELAY).await;
            if let Some(current) = target.as_current() {
                self.sink.update_current_state(current);
            }
            return Ok(());
        }

        debug!("Panel status to set: {status}");
        self.service.set_status(status).await?;

        // The change is self-initiated: recording it keeps the next poll
        // from re-announcing it as external.
        if let Some(current) = target.as_current() {
            self.sink.update_current_state(current);
            *self.last_observed.lock().await = Some(current);
        }
        Ok(())
    }
}

/// The synchronization core between a PowerLink2-style panel and a
/// HAP-style host.
///
/// Owns the last-observed state, the serialized query gate and the poll
/// loop. Nothing is process-global, so several instances - one per panel -
/// can coexist.
pub struct SecuritySystem {
    core: Arc<BridgeCore>,
    poller: Option<Poller>,
}

impl SecuritySystem {
    /// Create a bridge over the given panel service and host sink.
    ///
    /// Polling starts immediately when the config enables it (the default),
    /// so this must be called from within a Tokio runtime.
    pub fn new(
        config: BridgeConfig,
        service: Arc<dyn PanelService>,
        sink: Arc<dyn StateSink>,
    ) -> Self {
        let poll_for_changes = config.poll_for_changes;
        let core = Arc::new(BridgeCore {
            config,
            service,
            sink,
            query: SerializedQuery::new(),
            last_observed: Mutex::new(None),
        });
        let mut system = Self { core, poller: None };
        if poll_for_changes {
            system.start_polling();
        }
        system
    }

    /// Static manufacturer/model/serial identification.
    pub fn accessory_info(&self) -> AccessoryInfo {
        ACCESSORY_INFO
    }

    /// Accessory display name from the config.
    pub fn name(&self) -> &str {
        &self.core.config.name
    }

    /// Current panel state in HAP terms.
    ///
    /// Answers both the current-state and the target-state read hooks. An
    /// [`UnmappedStatus`](crate::BridgeError::UnmappedStatus) error is a
    /// retryable "between states" condition, not a failure of the panel.
    pub async fn current_state(&self) -> Result<HapCurrentState> {
        self.core.fetch_current_state().await
    }

    /// Target-space projection of the current panel state.
    pub async fn target_state(&self) -> Result<HapTargetState> {
        let current = self.core.fetch_current_state().await?;
        // The mapper never yields AlarmTriggered, so the projection is
        // total in practice; fall back to Disarm rather than panic.
        Ok(current.as_target().unwrap_or(HapTargetState::Disarm))
    }

    /// Handle a target-state write from the host.
    ///
    /// `NightArm` is not supported by the panel: the target characteristic
    /// is re-pushed with `StayArm`, the substituted write runs on its own
    /// task, and the original caller is acked immediately. The panel is
    /// never commanded with a night value.
    ///
    /// For supported targets the panel is commanded directly; on success
    /// the current-state characteristic and the last-observed cache are
    /// updated to match, on failure both are left untouched and the error
    /// is surfaced.
    pub async fn set_target_state(&self, target: HapTargetState) -> Result<()> {
        debug!("setTargetState: {}", target.name());

        if target == HapTargetState::NightArm {
            info!(
                "'Night' arm was selected, but that's not supported by the panel, \
                 so 'home' arm will be set instead"
            );
            self.core.sink.update_target_state(HapTargetState::StayArm);
            let core = Arc::clone(&self.core);
            tokio::spawn(async move {
                if let Err(e) = core.write_target(HapTargetState::StayArm).await {
                    warn!("Substituted 'home' arm failed: {e}");
                }
            });
            return Ok(());
        }

        self.core.write_target(target).await
    }

    /// Most recent state pushed to or confirmed by the host, if any.
    pub async fn last_observed_state(&self) -> Option<HapCurrentState> {
        *self.core.last_observed.lock().await
    }

    /// Begin polling for externally initiated changes (e.g. someone arming
    /// the system at a physical keypad). No-op when already polling.
    pub fn start_polling(&mut self) {
        if self.poller.is_none() {
            self.poller = Some(Poller::spawn(Arc::clone(&self.core)));
        }
    }

    /// Stop polling. A poll that is already querying the panel is allowed
    /// to finish, but no further cycle is scheduled.
    pub fn stop_polling(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.stop();
        }
    }

    /// Whether the poll loop is currently running.
    pub fn is_polling(&self) -> bool {
        self.poller.is_some()
    }
}
