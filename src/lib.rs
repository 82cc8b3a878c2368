// MIT License - Copyright (c) 2026 Peter Wright
//
//! # powerlink-bridge
//!
//! Bridges a Visonic PowerLink2-style alarm panel (disarmed / armed-home /
//! armed-away) to a HAP-style security-system abstraction (off / stay-arm /
//! away-arm / night-arm) with asynchronous external-change notification.
//!
//! The panel's network client stays outside this crate, behind the
//! [`PanelService`] trait; the host framework stays behind [`StateSink`].
//! What lives here is the synchronization core: the bidirectional state
//! mapping (including the lossy night-arm case), the polling protocol that
//! detects changes made at a physical keypad, and the queuing discipline
//! that keeps status queries from overlapping.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use powerlink_bridge::{
//!     BridgeConfig, HapCurrentState, HapTargetState, PanelStatus, SecuritySystem,
//!     SimulatedPanel, StateSink,
//! };
//!
//! struct LogSink;
//!
//! impl StateSink for LogSink {
//!     fn update_current_state(&self, state: HapCurrentState) {
//!         println!("current -> {}", state.name());
//!     }
//!     fn update_target_state(&self, state: HapTargetState) {
//!         println!("target -> {}", state.name());
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> powerlink_bridge::Result<()> {
//!     let config = BridgeConfig::builder().name("Alarm").build();
//!     let panel = Arc::new(SimulatedPanel::new(PanelStatus::Disarmed));
//!     let mut system = SecuritySystem::new(config, panel, Arc::new(LogSink));
//!
//!     system.set_target_state(HapTargetState::AwayArm).await?;
//!
//!     system.stop_polling();
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod error;
mod poll;
pub mod query;
pub mod service;
pub mod state;

// Re-exports for convenience
pub use bridge::{AccessoryInfo, SecuritySystem};
pub use config::{BridgeConfig, BridgeConfigBuilder};
pub use error::{BridgeError, Result};
pub use query::SerializedQuery;
pub use service::{PanelService, SimulatedPanel, StateSink};
pub use state::{
    hap_state_for, panel_command_for, HapCurrentState, HapTargetState, PanelStatus, TargetCommand,
};
