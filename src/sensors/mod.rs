//! Sensor subsystem: per-type conversion and the [`SensorSampler`].
//!
//! The sampler is built once for the configured [`SensorType`] and never
//! changes type.  It turns raw board readings into a [`SensorPayload`] at
//! each publish interval; the PIR variant additionally needs
//! [`SensorSampler::sample_tick`] on every control tick.

pub mod climate;
pub mod gas;
pub mod motion;

use log::{debug, warn};
use serde::Serialize;

use crate::app::ports::SensorPort;
use crate::config::NodeConfig;
use crate::identity::SensorType;
use motion::MotionSampler;

pub const METRIC_MOTION: &str = "motion";

// ---------------------------------------------------------------------------
// Payload model
// ---------------------------------------------------------------------------

/// A reading value: numeric for climate and gas, boolean for motion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReadingValue {
    Number(f64),
    Flag(bool),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub metric: &'static str,
    pub value: ReadingValue,
    /// ISO-8601 UTC, second precision.
    pub timestamp: String,
}

/// One publish worth of readings from this node's sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorPayload {
    pub sensor_type: SensorType,
    pub readings: Vec<Reading>,
}

impl SensorPayload {
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Round to one decimal place, half away from zero.
pub fn round_1dp(v: f32) -> f64 {
    (f64::from(v) * 10.0).round() / 10.0
}

/// Format Unix seconds as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn format_timestamp(unix_secs: i64) -> String {
    chrono::DateTime::from_timestamp(unix_secs, 0)
        .unwrap_or_default()
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string()
}

// ---------------------------------------------------------------------------
// Sampler
// ---------------------------------------------------------------------------

enum Kind {
    Climate,
    Gas,
    Motion(MotionSampler),
    /// Stored type tag not understood; nothing is ever published.
    Unrecognized,
}

pub struct SensorSampler {
    kind: Kind,
}

impl SensorSampler {
    /// Build the sampler for `sensor_type`.  `None` means the stored tag was
    /// not recognised.
    pub fn init(sensor_type: Option<SensorType>, now_ms: u64, config: &NodeConfig) -> Self {
        let kind = match sensor_type {
            Some(SensorType::Dht22) => Kind::Climate,
            Some(SensorType::Mq4) => Kind::Gas,
            Some(SensorType::Pir) => Kind::Motion(MotionSampler::new(
                now_ms,
                config.pir_stabilization_ms,
                config.pir_led_hold_ms,
            )),
            None => {
                warn!("Sampler: unrecognised sensor type, readings disabled");
                Kind::Unrecognized
            }
        };
        Self { kind }
    }

    pub fn sensor_type(&self) -> Option<SensorType> {
        match self.kind {
            Kind::Climate => Some(SensorType::Dht22),
            Kind::Gas => Some(SensorType::Mq4),
            Kind::Motion(_) => Some(SensorType::Pir),
            Kind::Unrecognized => None,
        }
    }

    /// Per-tick work.  Only the PIR sampler has any.
    pub fn sample_tick(&mut self, board: &mut impl SensorPort, now_ms: u64) {
        if let Kind::Motion(pir) = &mut self.kind {
            let level = board.read_motion();
            pir.tick(level, now_ms);
        }
    }

    /// `false` only while a PIR is stabilizing.
    pub fn is_ready(&self) -> bool {
        match &self.kind {
            Kind::Motion(pir) => pir.is_ready(),
            Kind::Climate | Kind::Gas | Kind::Unrecognized => true,
        }
    }

    /// One-shot "sensor became ready" signal.
    pub fn take_ready_signal(&mut self) -> bool {
        match &mut self.kind {
            Kind::Motion(pir) => pir.take_ready_signal(),
            Kind::Climate | Kind::Gas | Kind::Unrecognized => false,
        }
    }

    /// Whether the motion indicator hold is active.
    pub fn indicator_on(&self) -> bool {
        match &self.kind {
            Kind::Motion(pir) => pir.indicator_on(),
            Kind::Climate | Kind::Gas | Kind::Unrecognized => false,
        }
    }

    pub fn motion(&self) -> Option<&MotionSampler> {
        match &self.kind {
            Kind::Motion(pir) => Some(pir),
            Kind::Climate | Kind::Gas | Kind::Unrecognized => None,
        }
    }

    /// Take one sample and build its payload.  `None` when this interval
    /// has nothing valid to publish.  For PIR this clears the motion latch.
    pub fn read_and_format(&mut self, board: &mut impl SensorPort, unix_secs: i64) -> Option<SensorPayload> {
        let timestamp = format_timestamp(unix_secs);
        let (sensor_type, readings) = match &mut self.kind {
            Kind::Climate => (
                SensorType::Dht22,
                climate::readings(board.read_climate(), &timestamp)?,
            ),
            Kind::Gas => (SensorType::Mq4, gas::readings(board.read_gas_raw(), &timestamp)?),
            Kind::Motion(pir) => {
                let Some(motion) = pir.take_motion() else {
                    debug!("Sampler: PIR not armed yet, skipping interval");
                    return None;
                };
                (
                    SensorType::Pir,
                    vec![Reading {
                        metric: METRIC_MOTION,
                        value: ReadingValue::Flag(motion),
                        timestamp,
                    }],
                )
            }
            Kind::Unrecognized => {
                debug!("Sampler: no recognised sensor, skipping interval");
                return None;
            }
        };
        Some(SensorPayload {
            sensor_type,
            readings,
        })
    }
}
