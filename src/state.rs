// MIT License - Copyright (c) 2026 Peter Wright
// Panel <-> HAP state mapping

use std::fmt;

use crate::error::{BridgeError, Result};

/// Arm status of a PowerLink2-style panel.
///
/// The panel only accepts the three known statuses as commands, but it can
/// *report* anything - e.g. an exit-delay status while the system is in the
/// middle of arming. Unknown reports are preserved verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PanelStatus {
    Disarmed,
    ArmedHome,
    ArmedAway,
    /// Any status the panel reports that has no known meaning here
    /// (typically transitional).
    Other(String),
}

impl PanelStatus {
    /// Parse a status string as reported by the panel service.
    pub fn from_report(s: &str) -> Self {
        match s {
            "disarmed" => Self::Disarmed,
            "armed_home" => Self::ArmedHome,
            "armed_away" => Self::ArmedAway,
            other => Self::Other(other.to_string()),
        }
    }

    /// The wire string for this status.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Disarmed => "disarmed",
            Self::ArmedHome => "armed_home",
            Self::ArmedAway => "armed_away",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for PanelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HAP security-system current state.
///
/// The discriminants are the HAP characteristic encoding. Current and target
/// states share the numbers for home/away/off; `night` exists only on the
/// target side, which is why there is no current-side value 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HapCurrentState {
    StayArm = 0,
    AwayArm = 1,
    Disarmed = 3,
    /// Defined by HAP but never produced by this bridge.
    AlarmTriggered = 4,
}

impl HapCurrentState {
    /// Characteristic value as sent to the host.
    pub fn value(&self) -> u8 {
        *self as u8
    }

    /// Characteristic name on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StayArm => "STAY_ARM",
            Self::AwayArm => "AWAY_ARM",
            Self::Disarmed => "DISARMED",
            Self::AlarmTriggered => "ALARM_TRIGGERED",
        }
    }

    /// Human-readable description for logging. `None` for states that the
    /// panel cannot express.
    pub fn description(&self) -> Option<&'static str> {
        match self {
            Self::StayArm => Some("home"),
            Self::AwayArm => Some("away"),
            Self::Disarmed => Some("off"),
            Self::AlarmTriggered => None,
        }
    }

    /// The target-side state this current state corresponds to.
    /// `None` for alarm-triggered, which has no target-side value.
    pub fn as_target(&self) -> Option<HapTargetState> {
        match self {
            Self::StayArm => Some(HapTargetState::StayArm),
            Self::AwayArm => Some(HapTargetState::AwayArm),
            Self::Disarmed => Some(HapTargetState::Disarm),
            Self::AlarmTriggered => None,
        }
    }
}

/// HAP security-system target state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum HapTargetState {
    StayArm = 0,
    AwayArm = 1,
    NightArm = 2,
    Disarm = 3,
}

impl HapTargetState {
    /// Characteristic value as received from the host.
    pub fn value(&self) -> u8 {
        *self as u8
    }

    /// Characteristic name on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::StayArm => "STAY_ARM",
            Self::AwayArm => "AWAY_ARM",
            Self::NightArm => "NIGHT_ARM",
            Self::Disarm => "DISARM",
        }
    }

    /// Parse a characteristic name (e.g. from a host command payload).
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "STAY_ARM" => Some(Self::StayArm),
            "AWAY_ARM" => Some(Self::AwayArm),
            "NIGHT_ARM" => Some(Self::NightArm),
            "DISARM" => Some(Self::Disarm),
            _ => None,
        }
    }

    /// Human-readable description for logging. `None` for `NightArm`,
    /// which the panel cannot express.
    pub fn description(&self) -> Option<&'static str> {
        match self {
            Self::StayArm => Some("home"),
            Self::AwayArm => Some("away"),
            Self::Disarm => Some("off"),
            Self::NightArm => None,
        }
    }

    /// The current-side state this target settles into once the panel
    /// confirms it. `None` for `NightArm`, which must be substituted first.
    pub fn as_current(&self) -> Option<HapCurrentState> {
        match self {
            Self::StayArm => Some(HapCurrentState::StayArm),
            Self::AwayArm => Some(HapCurrentState::AwayArm),
            Self::Disarm => Some(HapCurrentState::Disarmed),
            Self::NightArm => None,
        }
    }
}

/// Map a reported panel status to the HAP current state.
///
/// Total over the three known statuses. Anything else has no HAP equivalent
/// and yields [`BridgeError::UnmappedStatus`]; this never silently defaults.
pub fn hap_state_for(status: &PanelStatus) -> Result<HapCurrentState> {
    match status {
        PanelStatus::Disarmed => Ok(HapCurrentState::Disarmed),
        PanelStatus::ArmedHome => Ok(HapCurrentState::StayArm),
        PanelStatus::ArmedAway => Ok(HapCurrentState::AwayArm),
        other => Err(BridgeError::UnmappedStatus {
            status: other.clone(),
        }),
    }
}

/// Outcome of mapping a HAP target state onto the panel's command set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetCommand {
    /// Write this status to the panel.
    Set(PanelStatus),
    /// The panel cannot represent the requested state. Re-issue the
    /// target-state write with the substitute instead of commanding the
    /// panel directly.
    Redirect(HapTargetState),
}

/// Map a HAP target state to the panel command that realizes it.
///
/// `NightArm` is not a panel concept; it redirects to `StayArm` rather than
/// failing, so the command path substitutes instead of erroring.
pub fn panel_command_for(target: HapTargetState) -> TargetCommand {
    match target {
        HapTargetState::StayArm => TargetCommand::Set(PanelStatus::ArmedHome),
        HapTargetState::AwayArm => TargetCommand::Set(PanelStatus::ArmedAway),
        HapTargetState::Disarm => TargetCommand::Set(PanelStatus::Disarmed),
        HapTargetState::NightArm => TargetCommand::Redirect(HapTargetState::StayArm),
    }
}
