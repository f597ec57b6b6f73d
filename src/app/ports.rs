//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ModeController (domain)
//! ```
//!
//! Driven adapters (board I/O, radio, broker, storage, clock, provisioning
//! surface) implement these traits.  The
//! [`ModeController`](super::controller::ModeController) consumes them via
//! generics, so the domain core never touches hardware directly.
//!
//! ## Blocking
//!
//! Every port call is expected to return promptly.  The only places the tick
//! loop waits are the bounded polls in
//! [`ConnectivityManager`](crate::connectivity::ConnectivityManager), which
//! sleep through [`TimePort::delay_ms`].

use crate::config::NodeConfig;
use crate::error::{CommsError, ProvisioningError};
use crate::identity::DeviceId;

use super::provisioning::{ProvisioningForm, ProvisioningOutcome};

// ───────────────────────────────────────────────────────────────
// Board ports (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// One temperature/humidity measurement.  Either field is NaN when the
/// sensor could not be read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClimateSample {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

impl ClimateSample {
    /// Sample reported when the sensor did not answer.
    pub const FAILED: Self = Self {
        temperature_c: f32::NAN,
        humidity_pct: f32::NAN,
    };

    pub fn is_valid(&self) -> bool {
        !self.temperature_c.is_nan() && !self.humidity_pct.is_nan()
    }
}

/// Read-side port: the sampler calls this to obtain raw sensor data.
pub trait SensorPort {
    /// Temperature + humidity.  Never fails; failures are NaN.
    fn read_climate(&mut self) -> ClimateSample;

    /// Raw 12-bit ADC count from the gas sensor (0..=4095).  `None` when
    /// the conversion failed.
    fn read_gas_raw(&mut self) -> Option<u16>;

    /// Current PIR output level.
    fn read_motion(&mut self) -> bool;
}

/// The destructive-reset push button.
pub trait ButtonPort {
    /// `true` while the button is held down.
    fn is_reset_pressed(&mut self) -> bool;
}

/// The single status indicator LED.
pub trait IndicatorPort {
    fn set_indicator(&mut self, on: bool);
}

/// Whole-system control.
pub trait SystemPort {
    /// Reboot the node.  On hardware this does not return.
    fn restart(&mut self);
}

/// Everything the controller touches on the board itself.
pub trait BoardPort: SensorPort + ButtonPort + IndicatorPort + SystemPort {}

impl<T: SensorPort + ButtonPort + IndicatorPort + SystemPort> BoardPort for T {}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Monotonic clock, wall clock and blocking delay.
pub trait TimePort {
    /// Milliseconds since boot (monotonic).
    fn uptime_ms(&self) -> u64;

    /// Seconds since the Unix epoch.  Before time sync this counts from
    /// 1970-01-01.
    fn unix_secs(&self) -> i64;

    /// Block the caller for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Link ports
// ───────────────────────────────────────────────────────────────

/// Wireless radio.
pub trait WifiPort {
    /// Start (or restart) association with `ssid`.  Returns once the request
    /// is issued; completion is observed through [`is_connected`](Self::is_connected).
    fn begin(&mut self, ssid: &str, password: &str) -> Result<(), CommsError>;

    /// `true` once the station is associated and has an address.
    fn is_connected(&self) -> bool;

    /// Bring up the local access point used while provisioning.
    fn start_access_point(&mut self, ssid: &str, password: &str) -> Result<(), CommsError>;
}

/// Message-bus client.  The broker endpoint and credentials come from
/// [`NodeConfig`]; the client identifier is derived from the device identity.
pub trait MessagingPort {
    /// Attempt a session handshake.  `Ok(())` means the attempt is under way
    /// or already established.
    fn connect(&mut self, client_id: &str, username: &str, password: &str) -> Result<(), CommsError>;

    /// `true` once the broker has acknowledged the session.
    fn is_connected(&self) -> bool;

    /// Keep-alive and inbound processing.  Called every tick while connected.
    fn service(&mut self);

    /// Publish one message at-most-once.
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError>;
}

// ───────────────────────────────────────────────────────────────
// Provisioning ports
// ───────────────────────────────────────────────────────────────

/// Backend activation call: exchanges a one-time token for a device id.
pub trait ActivationPort {
    fn activate(&mut self, token: &str) -> Result<DeviceId, ProvisioningError>;
}

/// The configuration form served while in provisioning mode.
pub trait ProvisioningSurface {
    /// Start serving the form.
    fn start(&mut self) -> Result<(), CommsError>;

    /// Take the next pending submission, if any.
    fn poll_submission(&mut self) -> Option<ProvisioningForm>;

    /// Show the outcome of the last submission to the operator.
    fn report(&mut self, outcome: &ProvisioningOutcome);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the process-wide [`NodeConfig`].
///
/// Implementations MUST validate values both before persisting and after
/// loading, rejecting invalid ranges with [`ConfigError::ValidationFailed`].
pub trait ConfigPort {
    /// Load and validate the stored configuration.  Returns
    /// [`ConfigError::NotFound`] on first boot; the caller falls back to
    /// [`NodeConfig::default()`].
    fn load(&self) -> Result<NodeConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&mut self, config: &NodeConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage, namespaced.
///
/// Writes are atomic per key.  [`erase_namespace`](Self::erase_namespace)
/// must be committed to flash before it returns; the destructive reset
/// relies on that before restarting.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;

    /// Remove every key in `namespace`.
    fn erase_namespace(&mut self, namespace: &str) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    Io,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    Io,
    /// Stored bytes are not what the reader expected.
    Corrupted,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::Io => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::Io => write!(f, "I/O error"),
            Self::Corrupted => write!(f, "stored value corrupted"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl std::error::Error for StorageError {}
