//! Outbound application events.
//!
//! The [`ModeController`](super::controller::ModeController) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on the
//! other side decide what to do with them: log to serial, count them in a
//! test, etc.

use crate::connectivity::{Link, LinkState};
use crate::error::{CommsError, ProvisioningError};
use crate::identity::{DeviceMode, SensorType};

/// Why the node is wiping its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    /// The reset button was held past the threshold.
    ButtonHeld,
    /// The stored network could not be joined on the first operational boot.
    BootstrapWifiFailed,
}

/// Why an interval produced no publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Sensor read failed or PIR not armed.
    NoReading,
    /// Payload could not be serialised.
    Encode,
    /// Broker refused or session down.
    Publish(CommsError),
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Boot finished; carries the selected mode.
    Booted(DeviceMode),

    /// A link attempt resolved.
    LinkChanged { link: Link, state: LinkState },

    /// A payload went out.
    Published {
        sensor_type: SensorType,
        readings: usize,
    },

    /// An interval elapsed without a publish.
    SampleSkipped(SkipReason),

    /// The PIR finished stabilizing.
    SensorReady,

    /// Identity is about to be erased and the node restarted.
    ResetTriggered(ResetReason),

    /// A provisioning submission was accepted; restart is scheduled.
    Provisioned,

    /// A provisioning submission was rejected at the boundary.
    ProvisioningRejected(ProvisioningError),

    /// The node is restarting now.
    Restarting,
}
