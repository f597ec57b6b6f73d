//! Error types for the sensor node firmware.
//!
//! Link failures and provisioning rejections are small `Copy` enums so they
//! can be passed through the controller and reported on the provisioning
//! surface without allocation.  Storage and config errors live next to
//! their ports in [`crate::app::ports`].

use core::fmt;

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    InvalidSsid,
    InvalidPassword,
    WifiConnectFailed,
    AccessPointFailed,
    MessagingConnectFailed,
    MessagingNotConnected,
    PublishFailed,
    HttpFailed,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be at most 64 bytes)"),
            Self::WifiConnectFailed => write!(f, "WiFi connection failed"),
            Self::AccessPointFailed => write!(f, "access point start failed"),
            Self::MessagingConnectFailed => write!(f, "broker connection failed"),
            Self::MessagingNotConnected => write!(f, "broker not connected"),
            Self::PublishFailed => write!(f, "publish failed"),
            Self::HttpFailed => write!(f, "HTTP request failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Provisioning errors
// ---------------------------------------------------------------------------

/// Reasons a provisioning submission is rejected. All of these are
/// surfaced to the operator; none of them restart the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningError {
    /// One or more of `ssid`, `password`, `token` was empty.
    MissingField,
    /// A field does not fit the fixed-capacity identity record.
    FieldTooLong,
    /// The station interface never associated within the join window.
    WifiJoinFailed,
    /// The activation request could not be sent or timed out.
    ActivationUnreachable,
    /// The backend answered with a non-200 status.
    ActivationRejected(u16),
    /// The backend answered 200 but the body was not a success envelope.
    ActivationMalformed,
    /// The identity could not be persisted.
    StoreFailed,
}

impl fmt::Display for ProvisioningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField => write!(f, "all fields are required"),
            Self::FieldTooLong => write!(f, "a field exceeds its maximum length"),
            Self::WifiJoinFailed => write!(f, "could not connect to WiFi, check SSID and password"),
            Self::ActivationUnreachable => write!(f, "activation service unreachable"),
            Self::ActivationRejected(status) => {
                write!(f, "activation rejected (HTTP {status}), check the token")
            }
            Self::ActivationMalformed => write!(f, "activation response not understood"),
            Self::StoreFailed => write!(f, "could not save configuration"),
        }
    }
}
