// MIT License - Copyright (c) 2026 Peter Wright
// MQTT host adapter

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde::{Deserialize, Serialize};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use powerlink_bridge::{
    BridgeConfig, HapCurrentState, HapTargetState, PanelService, PanelStatus, SecuritySystem,
    SimulatedPanel, StateSink,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "powerlink2mqtt")]
#[command(about = "Bridge between a PowerLink2-style alarm panel and MQTT")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Config {
    #[serde(default)]
    panel: PanelToml,
    #[serde(default)]
    bridge: BridgeToml,
    mqtt: MqttToml,
}

#[derive(Debug, Deserialize, Default)]
struct PanelToml {
    #[serde(default)]
    host: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    /// Use the in-memory simulated panel instead of a live connection.
    #[serde(default = "default_true")]
    simulate: bool,
    #[serde(default = "default_initial_status")]
    initial_status: String,
    /// Simulated per-call latency in milliseconds.
    #[serde(default)]
    latency_ms: u64,
}

#[derive(Debug, Deserialize)]
struct BridgeToml {
    #[serde(default = "default_name")]
    name: String,
    #[serde(default = "default_true")]
    poll_for_changes: bool,
    #[serde(default = "default_polling_interval")]
    polling_interval_secs: u64,
    #[serde(default)]
    debug: bool,
    #[serde(default)]
    simulate_setting: bool,
}

impl Default for BridgeToml {
    fn default() -> Self {
        Self {
            name: default_name(),
            poll_for_changes: true,
            polling_interval_secs: default_polling_interval(),
            debug: false,
            simulate_setting: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MqttToml {
    url: String,
    #[serde(default = "default_client_id")]
    client_id: String,
    #[serde(default = "default_subscribe_topic")]
    subscribe_topic: String,
    #[serde(default = "default_publish_topic")]
    publish_topic: String,
}

fn default_true() -> bool {
    true
}
fn default_initial_status() -> String {
    "disarmed".to_string()
}
fn default_name() -> String {
    "Security System".to_string()
}
fn default_polling_interval() -> u64 {
    10
}
fn default_client_id() -> String {
    "powerlink-bridge".to_string()
}
fn default_subscribe_topic() -> String {
    "powerlink/cmd".to_string()
}
fn default_publish_topic() -> String {
    "powerlink".to_string()
}

fn build_bridge_config(panel: &PanelToml, bridge: &BridgeToml) -> BridgeConfig {
    BridgeConfig::builder()
        .name(&bridge.name)
        .host(&panel.host)
        .username(&panel.username)
        .password(&panel.password)
        .poll_for_changes(bridge.poll_for_changes)
        .polling_interval(Duration::from_secs(bridge.polling_interval_secs))
        .debug(bridge.debug)
        .simulate_setting(bridge.simulate_setting)
        .build()
}

// ---------------------------------------------------------------------------
// MQTT JSON types
// ---------------------------------------------------------------------------

// Published messages — all share the {now, op, ...} flat structure

#[derive(Serialize)]
struct MqttStateEvent {
    now: u64,
    op: String,
    state: String,
    value: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

#[derive(Serialize)]
struct MqttAccessoryInfo {
    now: u64,
    op: String,
    name: String,
    manufacturer: String,
    model: String,
    #[serde(rename = "serialNumber")]
    serial_number: String,
}

#[derive(Serialize)]
struct MqttCmdAck {
    now: u64,
    op: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    src: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    /// Set when a query failed because the panel is between states.
    #[serde(skip_serializing_if = "Option::is_none")]
    transitioning: Option<bool>,
}

// Inbound command (subscribed)
#[derive(Deserialize)]
struct MqttCommand {
    op: String,
    #[serde(default)]
    state: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn now_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

async fn publish_json(client: &AsyncClient, topic: &str, payload: &impl Serialize, retain: bool) {
    match serde_json::to_string(payload) {
        Ok(json) => {
            if let Err(e) = client.publish(topic, QoS::AtLeastOnce, retain, json).await {
                error!("Failed to publish to {topic}: {e}");
            }
        }
        Err(e) => error!("Failed to serialize MQTT payload: {e}"),
    }
}

async fn publish_current_state(client: &AsyncClient, topic: &str, state: HapCurrentState) {
    let msg = MqttStateEvent {
        now: now_epoch_ms(),
        op: "CURRENT_STATE".to_string(),
        state: state.name().to_string(),
        value: state.value(),
        description: state.description().map(str::to_string),
    };
    publish_json(client, topic, &msg, true).await;
}

async fn publish_target_state(client: &AsyncClient, topic: &str, state: HapTargetState) {
    let msg = MqttStateEvent {
        now: now_epoch_ms(),
        op: "TARGET_STATE".to_string(),
        state: state.name().to_string(),
        value: state.value(),
        description: state.description().map(str::to_string),
    };
    publish_json(client, topic, &msg, false).await;
}

async fn publish_cmd_ack(
    client: &AsyncClient,
    topic: &str,
    success: bool,
    src: Option<serde_json::Value>,
    error: Option<String>,
    transitioning: Option<bool>,
) {
    let msg = MqttCmdAck {
        now: now_epoch_ms(),
        op: "CMD_ACK".to_string(),
        success,
        src,
        error,
        transitioning,
    };
    publish_json(client, topic, &msg, false).await;
}

async fn publish_accessory_info(client: &AsyncClient, topic: &str, system: &SecuritySystem) {
    let info = system.accessory_info();
    let msg = MqttAccessoryInfo {
        now: now_epoch_ms(),
        op: "ACCESSORY_INFO".to_string(),
        name: system.name().to_string(),
        manufacturer: info.manufacturer.to_string(),
        model: info.model.to_string(),
        serial_number: info.serial_number.to_string(),
    };
    publish_json(client, topic, &msg, true).await;
}

// ---------------------------------------------------------------------------
// Host sink
// ---------------------------------------------------------------------------

enum StateUpdate {
    Current(HapCurrentState),
    Target(HapTargetState),
}

/// Forwards characteristic pushes from the bridge to the MQTT publisher
/// task. The sink itself never awaits: pushes are fire-and-forget.
struct MqttSink {
    tx: mpsc::UnboundedSender<StateUpdate>,
}

impl StateSink for MqttSink {
    fn update_current_state(&self, state: HapCurrentState) {
        let _ = self.tx.send(StateUpdate::Current(state));
    }

    fn update_target_state(&self, state: HapTargetState) {
        let _ = self.tx.send(StateUpdate::Target(state));
    }
}

// ---------------------------------------------------------------------------
// MQTT command handler
// ---------------------------------------------------------------------------

async fn handle_command(
    payload_str: &str,
    cmd: MqttCommand,
    client: &AsyncClient,
    topic: &str,
    system: &SecuritySystem,
) {
    // Raw payload for the CMD_ACK src field
    let src_json = serde_json::from_str::<serde_json::Value>(payload_str).ok();

    match cmd.op.as_str() {
        "PING" => {
            info!("Command: PING");
            publish_cmd_ack(client, topic, true, src_json, None, None).await;
        }

        "STATUS" => {
            debug!("Command: STATUS");
            match system.current_state().await {
                Ok(state) => {
                    publish_current_state(client, topic, state).await;
                    publish_cmd_ack(client, topic, true, src_json, None, None).await;
                }
                Err(e) => {
                    warn!("STATUS failed: {e}");
                    let transitioning = e.is_transitioning();
                    publish_cmd_ack(
                        client,
                        topic,
                        false,
                        src_json,
                        Some(e.to_string()),
                        Some(transitioning),
                    )
                    .await;
                }
            }
        }

        "SET_TARGET" => {
            let target = match cmd.state.as_deref().and_then(HapTargetState::from_name) {
                Some(target) => target,
                None => {
                    warn!("SET_TARGET: missing or unknown state: {:?}", cmd.state);
                    publish_cmd_ack(
                        client,
                        topic,
                        false,
                        src_json,
                        Some("missing or unknown target state".to_string()),
                        None,
                    )
                    .await;
                    return;
                }
            };
            info!("Command: SET_TARGET {}", target.name());
            match system.set_target_state(target).await {
                Ok(()) => {
                    publish_cmd_ack(client, topic, true, src_json, None, None).await;
                }
                Err(e) => {
                    error!("SET_TARGET {} failed: {e}", target.name());
                    publish_cmd_ack(client, topic, false, src_json, Some(e.to_string()), None)
                        .await;
                }
            }
        }

        other => {
            warn!("Unknown command: {other}");
            publish_cmd_ack(client, topic, false, src_json, None, None).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config
    let config_text =
        std::fs::read_to_string(&cli.config).context("Failed to read config file")?;
    let config: Config = toml::from_str(&config_text).context("Failed to parse config file")?;

    // RUST_LOG controls verbosity (e.g. RUST_LOG=powerlink_bridge=trace).
    // Default: info, or debug when the config asks for it.
    let default_directive = if config.bridge.debug { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));

    // systemd journal already adds timestamps, so omit them when running under systemd
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt().without_time().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let panel: Arc<dyn PanelService> = if config.panel.simulate {
        let initial = PanelStatus::from_report(&config.panel.initial_status);
        info!("Using simulated panel (initial status: {initial})");
        Arc::new(SimulatedPanel::with_latency(
            initial,
            Duration::from_millis(config.panel.latency_ms),
        ))
    } else {
        anyhow::bail!(
            "no live PowerLink2 client is built in; set panel.simulate = true, \
             or embed the library with your own PanelService implementation"
        );
    };

    let (mqtt_host, mqtt_port) = parse_mqtt_url(&config.mqtt.url)?;
    let publish_topic = config.mqtt.publish_topic;
    let subscribe_topic = config.mqtt.subscribe_topic;

    // Set up MQTT
    let mut mqtt_opts = MqttOptions::new(&config.mqtt.client_id, &mqtt_host, mqtt_port);
    mqtt_opts.set_keep_alive(Duration::from_secs(30));
    let (client, mut eventloop) = AsyncClient::new(mqtt_opts, 256);

    client
        .subscribe(&subscribe_topic, QoS::AtLeastOnce)
        .await
        .context("Failed to subscribe to MQTT topic")?;
    info!("MQTT: subscribed to {subscribe_topic}");

    // The bridge pushes characteristic updates into this channel; a task
    // below turns them into MQTT messages.
    let (sink_tx, mut sink_rx) = mpsc::unbounded_channel();
    let sink = Arc::new(MqttSink { tx: sink_tx });

    let bridge_config = build_bridge_config(&config.panel, &config.bridge);
    let system = Arc::new(SecuritySystem::new(bridge_config, panel, sink));
    info!("Bridge started (polling: {})", system.is_polling());

    publish_accessory_info(&client, &publish_topic, &system).await;

    // Task 1: characteristic pushes -> MQTT
    let client_pushes = client.clone();
    let topic_pushes = publish_topic.clone();
    let push_handle = tokio::spawn(async move {
        while let Some(update) = sink_rx.recv().await {
            match update {
                StateUpdate::Current(state) => {
                    publish_current_state(&client_pushes, &topic_pushes, state).await;
                }
                StateUpdate::Target(state) => {
                    publish_target_state(&client_pushes, &topic_pushes, state).await;
                }
            }
        }
    });

    // Task 2: MQTT event loop (receives messages, handles commands)
    let system_cmds = Arc::clone(&system);
    let client_cmds = client.clone();
    let topic_cmds = publish_topic.clone();
    let sub_topic = subscribe_topic.clone();
    let mqtt_handle = tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    // (Re)subscribe after every broker connect/reconnect.
                    // rumqttc does not auto-resubscribe, so without this a
                    // broker restart silently drops our subscription and we
                    // stop receiving commands.
                    info!("MQTT: connected, subscribing to {sub_topic}");
                    if let Err(e) = client_cmds.subscribe(&sub_topic, QoS::AtLeastOnce).await {
                        error!("Failed to subscribe to {sub_topic}: {e}");
                    }
                }
                Ok(Event::Incoming(Packet::Publish(msg))) => {
                    if msg.topic == sub_topic {
                        let payload = String::from_utf8_lossy(&msg.payload);
                        match serde_json::from_str::<MqttCommand>(&payload) {
                            Ok(cmd) => {
                                info!("MQTT command received: {payload}");
                                handle_command(
                                    &payload,
                                    cmd,
                                    &client_cmds,
                                    &topic_cmds,
                                    &system_cmds,
                                )
                                .await;
                            }
                            Err(e) => {
                                warn!("Failed to parse MQTT command: {e}");
                            }
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    error!("MQTT event loop error: {e}");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
            }
        }
    });

    // Wait for a signal
    let mut sigterm = signal(SignalKind::terminate())?;
    info!("MQTT bridge running. Send SIGINT/SIGTERM to stop.");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received SIGINT, shutting down...");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    mqtt_handle.abort();
    push_handle.abort();

    match Arc::try_unwrap(system) {
        Ok(mut system) => system.stop_polling(),
        Err(_arc) => {
            warn!("Could not unwrap bridge for clean shutdown (tasks still hold references)");
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Parse an MQTT URL like "mqtt://host:port" into (host, port).
fn parse_mqtt_url(url: &str) -> Result<(String, u16)> {
    let stripped = url
        .strip_prefix("mqtt://")
        .or_else(|| url.strip_prefix("tcp://"))
        .unwrap_or(url);

    let (host, port_str) = stripped
        .rsplit_once(':')
        .context("MQTT URL must be in format mqtt://host:port")?;

    let port: u16 = port_str.parse().context("Invalid MQTT port number")?;

    Ok((host.to_string(), port))
}
