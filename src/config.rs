//! Node configuration parameters
//!
//! Process-wide settings: broker and backend endpoints, access-point
//! credentials, link timeouts and sampling cadence. Loaded once at startup
//! through [`ConfigPort`](crate::app::ports::ConfigPort); the compiled
//! defaults apply when nothing is stored, and are seeded into flash on
//! first boot.
//!
//! Site-specific endpoints and the pre-shared broker credentials are baked
//! in at build time from the environment:
//!
//! ```text
//! BROKER_HOST  BROKER_PORT  BROKER_USER  BROKER_PASS
//! BACKEND_HOST BACKEND_PORT
//! ```

use serde::{Deserialize, Serialize};

use crate::identity::SensorType;

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    // --- Messaging broker ---
    /// Broker host name or IP
    pub broker_host: String,
    /// Broker TCP port
    pub broker_port: u16,
    /// Pre-shared broker user (`user:vhost` for AMQP-backed brokers)
    pub broker_username: String,
    /// Pre-shared broker password
    pub broker_password: String,
    /// First topic segment; readings go to `{root}/{deviceId}/sensors`
    pub topic_root: String,

    // --- Activation backend ---
    pub backend_host: String,
    pub backend_port: u16,
    pub activation_path: String,

    // --- Provisioning access point ---
    /// AP SSID prefix; the MAC suffix is appended
    pub ap_ssid_prefix: String,
    /// WPA2 passphrase of the provisioning AP (8-63 bytes)
    pub ap_password: String,

    // --- Time ---
    pub ntp_server: String,

    // --- Link timing (milliseconds) ---
    /// Upper bound for one wireless connect attempt
    pub wifi_timeout_ms: u32,
    /// Upper bound for one messaging connect attempt
    pub messaging_timeout_ms: u32,
    /// Activation request timeout
    pub http_timeout_ms: u32,
    /// Sleep between polls inside a bounded connect
    pub link_poll_interval_ms: u32,
    /// Poll count allowed for the station join during activation
    pub activation_join_attempts: u32,

    // --- Cadence (milliseconds) ---
    /// Interval between published samples
    pub sample_interval_ms: u32,
    /// Sleep between control ticks
    pub tick_interval_ms: u32,

    // --- PIR ---
    /// Warm-up window before motion is trusted
    pub pir_stabilization_ms: u32,
    /// How long the indicator stays lit after the last high reading
    pub pir_led_hold_ms: u32,

    // --- Control surface ---
    /// Button hold time that triggers the destructive reset
    pub reset_hold_ms: u32,
    /// Delay between a successful provisioning and the restart
    pub restart_grace_ms: u32,

    /// Sensor assumed when the store carries no `sensorType`
    pub default_sensor_type: SensorType,
}

/// Build-time override for a port; an unparsable value keeps the default.
fn build_port(value: Option<&str>, default: u16) -> u16 {
    value.and_then(|p| p.parse().ok()).unwrap_or(default)
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            broker_host: option_env!("BROKER_HOST").unwrap_or("broker.local").into(),
            broker_port: build_port(option_env!("BROKER_PORT"), 1883),
            broker_username: option_env!("BROKER_USER").unwrap_or("").into(),
            broker_password: option_env!("BROKER_PASS").unwrap_or("").into(),
            topic_root: "devices".into(),

            backend_host: option_env!("BACKEND_HOST").unwrap_or("192.168.4.2").into(),
            backend_port: build_port(option_env!("BACKEND_PORT"), 3003),
            activation_path: "/api/devices/activate".into(),

            ap_ssid_prefix: "Clinica-Setup-".into(),
            ap_password: "12345678".into(),

            ntp_server: "pool.ntp.org".into(),

            wifi_timeout_ms: 10_000,
            messaging_timeout_ms: 5_000,
            http_timeout_ms: 5_000,
            link_poll_interval_ms: 500,
            activation_join_attempts: 20,

            sample_interval_ms: 60_000, // 1/min
            tick_interval_ms: 100,      // 10 Hz

            pir_stabilization_ms: 120_000, // 2 min
            pir_led_hold_ms: 3_000,

            reset_hold_ms: 5_000,
            restart_grace_ms: 3_000,

            default_sensor_type: SensorType::Dht22,
        }
    }
}

impl NodeConfig {
    /// Bound for the station join performed while activating.
    pub fn activation_join_timeout_ms(&self) -> u32 {
        self.activation_join_attempts
            .saturating_mul(self.link_poll_interval_ms)
    }

    /// Full activation endpoint URL.
    pub fn activation_url(&self) -> String {
        format!(
            "http://{}:{}{}",
            self.backend_host, self.backend_port, self.activation_path
        )
    }

    /// Broker URL in the `mqtt://host:port` form.
    pub fn broker_url(&self) -> String {
        format!("mqtt://{}:{}", self.broker_host, self.broker_port)
    }

    /// Broker password masked for logs: first four characters then `****`.
    pub fn masked_broker_password(&self) -> String {
        let shown: String = self.broker_password.chars().take(4).collect();
        format!("{shown}****")
    }
}
