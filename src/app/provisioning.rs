//! Provisioning: form handling, activation exchange, identity commit.
//!
//! ```text
//!  form body ─▶ parse_form ─▶ validate ─▶ join STA ─▶ activate(token)
//!                                                        │
//!                               report ◀─ save identity ◀┘
//! ```
//!
//! Every failure is reported back to the operator and leaves the node in
//! provisioning mode with nothing persisted.  Only a fully successful
//! submission schedules the restart.

use core::fmt;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{ActivationPort, MessagingPort, StoragePort, TimePort, WifiPort};
use crate::config::NodeConfig;
use crate::connectivity::{ConnectivityManager, LinkState};
use crate::error::ProvisioningError;
use crate::identity::{self, DeviceId, DeviceIdentity, Passphrase, Ssid};

// ---------------------------------------------------------------------------
// Form
// ---------------------------------------------------------------------------

/// Submitted configuration form.  Fields are already URL-decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisioningForm {
    pub ssid: String,
    pub password: String,
    pub token: String,
}

impl ProvisioningForm {
    /// Reject empty or oversized fields before any network attempt.
    pub fn validate(&self) -> Result<(), ProvisioningError> {
        if self.ssid.is_empty() || self.password.is_empty() || self.token.is_empty() {
            return Err(ProvisioningError::MissingField);
        }
        if self.ssid.len() > Ssid::new().capacity() || self.password.len() > Passphrase::new().capacity() {
            return Err(ProvisioningError::FieldTooLong);
        }
        Ok(())
    }
}

/// Parse an `application/x-www-form-urlencoded` body.  Unknown keys are
/// ignored; missing keys leave the field empty.
pub fn parse_form(body: &str) -> ProvisioningForm {
    let mut form = ProvisioningForm::default();
    for pair in body.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = url_decode(value);
        match url_decode(key).as_str() {
            "ssid" => form.ssid = value,
            "password" => form.password = value,
            "token" => form.token = value.trim().to_string(),
            _ => {}
        }
    }
    form
}

/// Decode `+` and `%XX` escapes.  Malformed escapes are kept verbatim.
pub fn url_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                match (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push((hi << 4) | lo);
                        i += 2;
                    }
                    _ => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Activation wire format
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ActivationRequest<'a> {
    token: &'a str,
}

#[derive(Deserialize)]
struct ActivationResponse {
    success: bool,
    data: Option<ActivationData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivationData {
    device_id: String,
}

/// JSON body for the activation request.
pub fn activation_request_body(token: &str) -> Result<Vec<u8>, ProvisioningError> {
    serde_json::to_vec(&ActivationRequest { token }).map_err(|_| ProvisioningError::ActivationMalformed)
}

/// Interpret the activation response.  Only HTTP 200 with
/// `{"success": true, "data": {"deviceId": "..."}}` succeeds.
pub fn parse_activation_response(status: u16, body: &[u8]) -> Result<DeviceId, ProvisioningError> {
    if status != 200 {
        return Err(ProvisioningError::ActivationRejected(status));
    }
    let resp: ActivationResponse =
        serde_json::from_slice(body).map_err(|_| ProvisioningError::ActivationMalformed)?;
    if !resp.success {
        return Err(ProvisioningError::ActivationRejected(status));
    }
    let device_id = resp
        .data
        .map(|d| d.device_id)
        .filter(|id| !id.is_empty())
        .ok_or(ProvisioningError::ActivationMalformed)?;
    DeviceId::try_from(device_id.as_str()).map_err(|()| ProvisioningError::ActivationMalformed)
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of one submission, shown on the provisioning surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningOutcome {
    Activated { device_id: DeviceId },
    Rejected(ProvisioningError),
}

impl fmt::Display for ProvisioningOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Activated { device_id } => {
                write!(f, "Device activated as {device_id}. Restarting...")
            }
            Self::Rejected(e) => write!(f, "Error: {e}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Submit flow
// ---------------------------------------------------------------------------

/// Run one submission end to end.  Blocks for the station join and the
/// activation request.  On success the identity is persisted and returned.
pub fn submit<W: WifiPort, M: MessagingPort>(
    form: &ProvisioningForm,
    links: &mut ConnectivityManager<W, M>,
    activation: &mut impl ActivationPort,
    storage: &mut impl StoragePort,
    clock: &mut impl TimePort,
    config: &NodeConfig,
) -> Result<DeviceIdentity, ProvisioningError> {
    form.validate()?;
    info!("Provisioning: submission for ssid='{}'", form.ssid);

    let joined = links.join(
        &form.ssid,
        &form.password,
        config.activation_join_timeout_ms(),
        clock,
    );
    if joined != LinkState::Connected {
        warn!("Provisioning: could not join '{}'", form.ssid);
        return Err(ProvisioningError::WifiJoinFailed);
    }

    let device_id = activation.activate(&form.token)?;
    info!("Provisioning: activated as {}", device_id);

    let identity = DeviceIdentity::new(
        &form.ssid,
        &form.password,
        &device_id,
        config.default_sensor_type,
    )?;
    identity::save(storage, &identity).map_err(|e| {
        warn!("Provisioning: storing identity failed: {}", e);
        ProvisioningError::StoreFailed
    })?;
    Ok(identity)
}
