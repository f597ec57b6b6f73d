//! Device identity and its persistence.
//!
//! The identity record (`ssid`, `password`, `deviceId`, `sensorType`) is
//! written once by provisioning and read once at boot. Its presence decides
//! the [`DeviceMode`]. Keys live in the `device_config` namespace of the
//! [`StoragePort`]; erasing that namespace is what sends the node back into
//! provisioning.

use core::fmt;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{StorageError, StoragePort};
use crate::error::ProvisioningError;

/// NVS namespace holding the identity keys.
pub const NAMESPACE: &str = "device_config";

pub const KEY_SSID: &str = "ssid";
pub const KEY_PASSWORD: &str = "password";
pub const KEY_DEVICE_ID: &str = "deviceId";
pub const KEY_SENSOR_TYPE: &str = "sensorType";

pub type Ssid = heapless::String<32>;
pub type Passphrase = heapless::String<64>;
pub type DeviceId = heapless::String<64>;

/// Largest value stored under any identity key.
const MAX_VALUE_LEN: usize = 64;

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// Top-level operating mode, chosen once at boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceMode {
    /// No identity stored: run the access point and configuration form.
    Provisioning,
    /// Identity stored: join the network, sample and publish.
    Operational,
}

// ---------------------------------------------------------------------------
// Sensor type
// ---------------------------------------------------------------------------

/// The sensor fitted to this node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorType {
    /// Temperature + relative humidity.
    Dht22,
    /// Methane / combustible gas, analog output.
    Mq4,
    /// Passive-infrared motion.
    Pir,
}

impl SensorType {
    /// Wire and storage tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dht22 => "dht22",
            Self::Mq4 => "mq4",
            Self::Pir => "pir",
        }
    }

    /// Parse a stored tag. Unknown tags yield `None`.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "dht22" => Some(Self::Dht22),
            "mq4" => Some(Self::Mq4),
            "pir" => Some(Self::Pir),
            _ => None,
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Persisted identity. Immutable for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub ssid: Ssid,
    pub password: Passphrase,
    pub device_id: DeviceId,
    /// `None` when the stored tag names a sensor this firmware does not know.
    pub sensor_type: Option<SensorType>,
}

impl DeviceIdentity {
    /// Build an identity from provisioning input.
    pub fn new(
        ssid: &str,
        password: &str,
        device_id: &str,
        sensor_type: SensorType,
    ) -> Result<Self, ProvisioningError> {
        Ok(Self {
            ssid: Ssid::try_from(ssid).map_err(|()| ProvisioningError::FieldTooLong)?,
            password: Passphrase::try_from(password)
                .map_err(|()| ProvisioningError::FieldTooLong)?,
            device_id: DeviceId::try_from(device_id)
                .map_err(|()| ProvisioningError::FieldTooLong)?,
            sensor_type: Some(sensor_type),
        })
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// `true` when `ssid`, `password` and `deviceId` are all present.
pub fn is_complete(storage: &impl StoragePort) -> bool {
    [KEY_SSID, KEY_PASSWORD, KEY_DEVICE_ID]
        .iter()
        .all(|key| storage.exists(NAMESPACE, key))
}

/// Load the identity, or `Ok(None)` when the record is incomplete.
///
/// A missing `sensorType` falls back to `default_sensor`.
pub fn load(
    storage: &impl StoragePort,
    default_sensor: SensorType,
) -> Result<Option<DeviceIdentity>, StorageError> {
    if !is_complete(storage) {
        info!("Identity: no complete configuration stored");
        return Ok(None);
    }

    let ssid = read_value(storage, KEY_SSID)?;
    let password = read_value(storage, KEY_PASSWORD)?;
    let device_id = read_value(storage, KEY_DEVICE_ID)?;

    let sensor_type = if storage.exists(NAMESPACE, KEY_SENSOR_TYPE) {
        let tag: heapless::String<MAX_VALUE_LEN> = read_value(storage, KEY_SENSOR_TYPE)?;
        let parsed = SensorType::parse(tag.as_str());
        if parsed.is_none() {
            warn!("Identity: unrecognised sensorType '{}'", tag);
        }
        parsed
    } else {
        Some(default_sensor)
    };

    info!(
        "Identity: loaded deviceId={} ssid='{}' sensor={:?}",
        device_id, ssid, sensor_type
    );
    Ok(Some(DeviceIdentity {
        ssid,
        password,
        device_id,
        sensor_type,
    }))
}

/// Persist a freshly provisioned identity.
pub fn save(storage: &mut impl StoragePort, identity: &DeviceIdentity) -> Result<(), StorageError> {
    storage.write(NAMESPACE, KEY_SSID, identity.ssid.as_bytes())?;
    storage.write(NAMESPACE, KEY_PASSWORD, identity.password.as_bytes())?;
    storage.write(NAMESPACE, KEY_DEVICE_ID, identity.device_id.as_bytes())?;
    if let Some(sensor) = identity.sensor_type {
        storage.write(NAMESPACE, KEY_SENSOR_TYPE, sensor.as_str().as_bytes())?;
    }
    info!(
        "Identity: saved deviceId={} ssid='{}'",
        identity.device_id, identity.ssid
    );
    Ok(())
}

/// Erase every identity key. The next boot enters provisioning.
pub fn erase(storage: &mut impl StoragePort) -> Result<(), StorageError> {
    storage.erase_namespace(NAMESPACE)?;
    info!("Identity: configuration cleared");
    Ok(())
}

fn read_value<const N: usize>(
    storage: &impl StoragePort,
    key: &str,
) -> Result<heapless::String<N>, StorageError> {
    let mut buf = [0u8; MAX_VALUE_LEN];
    let len = storage.read(NAMESPACE, key, &mut buf)?;
    let text = core::str::from_utf8(&buf[..len]).map_err(|_| StorageError::Corrupted)?;
    heapless::String::try_from(text).map_err(|()| StorageError::Corrupted)
}
