//! MQ-4 gas sensor scaling.
//!
//! The module's analog output is read as a raw 12-bit count and scaled
//! linearly onto 0–1000.  There is no calibration curve; the value is a
//! relative concentration index.

use log::warn;

use super::{Reading, ReadingValue, round_1dp};

pub const METRIC_GAS: &str = "gas";

/// ADC full-scale count (12-bit).
pub const ADC_FULL_SCALE: u16 = 4095;
/// Upper end of the published index.
pub const INDEX_MAX: f32 = 1000.0;

/// Scale a raw count onto 0–1000.  Counts above full scale are clamped.
pub fn scale(raw: u16) -> f32 {
    f32::from(raw.min(ADC_FULL_SCALE)) / f32::from(ADC_FULL_SCALE) * INDEX_MAX
}

/// `None` when the ADC produced no count; the interval is skipped rather
/// than published as zero.
pub fn readings(raw: Option<u16>, timestamp: &str) -> Option<Vec<Reading>> {
    let Some(raw) = raw else {
        warn!("MQ4: no ADC count, skipping interval");
        return None;
    };
    Some(vec![Reading {
        metric: METRIC_GAS,
        value: ReadingValue::Number(round_1dp(scale(raw))),
        timestamp: timestamp.into(),
    }])
}
