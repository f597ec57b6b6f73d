//! DHT22 temperature / humidity conversion.
//!
//! A read that produced NaN in either channel is dropped whole; the two
//! readings are always published together with one timestamp.

use log::warn;

use super::{Reading, ReadingValue, round_1dp};
use crate::app::ports::ClimateSample;

pub const METRIC_TEMPERATURE: &str = "temperature";
pub const METRIC_HUMIDITY: &str = "humidity";

pub fn readings(sample: ClimateSample, timestamp: &str) -> Option<Vec<Reading>> {
    if !sample.is_valid() {
        warn!(
            "DHT22: invalid read (t={} rh={}), skipping interval",
            sample.temperature_c, sample.humidity_pct
        );
        return None;
    }
    Some(vec![
        Reading {
            metric: METRIC_TEMPERATURE,
            value: ReadingValue::Number(round_1dp(sample.temperature_c)),
            timestamp: timestamp.into(),
        },
        Reading {
            metric: METRIC_HUMIDITY,
            value: ReadingValue::Number(round_1dp(sample.humidity_pct)),
            timestamp: timestamp.into(),
        },
    ])
}
