// MIT License - Copyright (c) 2026 Peter Wright

use crate::state::PanelStatus;

/// All errors that can occur in the powerlink-bridge library.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The panel reported a status with no HAP equivalent. This happens,
    /// for example, when the system has begun arming and is giving people
    /// time to exit; the status settles once the transition finishes.
    #[error("no HAP state corresponds to panel status '{status}' - the system may be transitioning")]
    UnmappedStatus { status: PanelStatus },

    /// Communication failure in the underlying panel service (network,
    /// auth, protocol). Carried verbatim from the service.
    #[error("panel service error: {message}")]
    Service { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// True when the failure is the panel reporting a transitional status
    /// rather than a communication problem. Callers should retry on a later
    /// query instead of treating this as fatal.
    pub fn is_transitioning(&self) -> bool {
        matches!(self, BridgeError::UnmappedStatus { .. })
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
