//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART in production).  Each line starts with a fixed
//! tag so serial captures can be grepped.

use log::{info, warn};

use crate::app::events::{AppEvent, SkipReason};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink {
    published: u32,
    skipped: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> u32 {
        self.published
    }

    pub fn skipped(&self) -> u32 {
        self.skipped
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Booted(mode) => info!("BOOT | mode={:?}", mode),
            AppEvent::LinkChanged { link, state } => info!("LINK | {:?} -> {:?}", link, state),
            AppEvent::Published {
                sensor_type,
                readings,
            } => {
                self.published = self.published.wrapping_add(1);
                info!(
                    "PUBLISH | sensor={} readings={} total={}",
                    sensor_type, readings, self.published
                );
            }
            AppEvent::SampleSkipped(reason) => {
                self.skipped = self.skipped.wrapping_add(1);
                match reason {
                    SkipReason::NoReading => info!("SKIP | no reading this interval"),
                    SkipReason::Encode => warn!("SKIP | payload encode failed"),
                    SkipReason::Publish(e) => warn!("SKIP | publish failed: {}", e),
                }
            }
            AppEvent::SensorReady => info!("SENSOR | ready"),
            AppEvent::ResetTriggered(reason) => warn!("RESET | {:?}", reason),
            AppEvent::Provisioned => info!("PROVISION | accepted, restart scheduled"),
            AppEvent::ProvisioningRejected(e) => warn!("PROVISION | rejected: {}", e),
            AppEvent::Restarting => info!("RESTART"),
        }
    }
}
