// MIT License - Copyright (c) 2026 Peter Wright

use std::time::Duration;

/// Configuration for a [`SecuritySystem`](crate::SecuritySystem) instance.
///
/// The panel connection fields are opaque to the bridge core: they are handed
/// through to whatever [`PanelService`](crate::PanelService) implementation
/// the embedder wires in.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Display name of the accessory.
    pub name: String,
    /// Panel host (e.g. IP address).
    pub host: String,
    /// Panel account username.
    pub username: String,
    /// Panel account password.
    pub password: String,
    /// Whether to poll the panel for externally initiated changes
    /// (default: true).
    pub poll_for_changes: bool,
    /// Interval between polls (default: 10s).
    pub polling_interval: Duration,
    /// Verbose logging of get/set traffic.
    pub debug: bool,
    /// Replace panel writes with a fixed-delay success path that still
    /// updates the current-state characteristic. Lets the host integration
    /// be exercised without a live panel.
    pub simulate_setting: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            name: "Security System".to_string(),
            host: String::new(),
            username: String::new(),
            password: String::new(),
            poll_for_changes: true,
            polling_interval: Duration::from_secs(10),
            debug: false,
            simulate_setting: false,
        }
    }
}

impl BridgeConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }
}

/// Builder for [`BridgeConfig`].
#[derive(Debug, Clone, Default)]
pub struct BridgeConfigBuilder {
    config: BridgeConfig,
}

impl BridgeConfigBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.username = username.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = password.into();
        self
    }

    pub fn poll_for_changes(mut self, poll: bool) -> Self {
        self.config.poll_for_changes = poll;
        self
    }

    pub fn polling_interval(mut self, interval: Duration) -> Self {
        self.config.polling_interval = interval;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    pub fn simulate_setting(mut self, simulate: bool) -> Self {
        self.config.simulate_setting = simulate;
        self
    }

    pub fn build(self) -> BridgeConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert!(config.poll_for_changes);
        assert_eq!(config.polling_interval, Duration::from_secs(10));
        assert!(!config.debug);
        assert!(!config.simulate_setting);
    }

    #[test]
    fn test_config_builder() {
        let config = BridgeConfig::builder()
            .name("Front Alarm")
            .host("10.0.0.5")
            .username("user")
            .password("pass")
            .polling_interval(Duration::from_secs(30))
            .poll_for_changes(false)
            .build();

        assert_eq!(config.name, "Front Alarm");
        assert_eq!(config.host, "10.0.0.5");
        assert_eq!(config.username, "user");
        assert_eq!(config.password, "pass");
        assert_eq!(config.polling_interval, Duration::from_secs(30));
        assert!(!config.poll_for_changes);
    }
}
