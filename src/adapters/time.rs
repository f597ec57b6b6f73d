//! ESP32 time adapter.
//!
//! Implements [`TimePort`]: monotonic uptime, wall-clock seconds and a
//! blocking delay.
//!
//! - **`target_os = "espidf"`**: uptime from `esp_timer_get_time()`, wall
//!   time from the SNTP-disciplined system clock, delays through FreeRTOS.
//! - **`not(target_os = "espidf")`**: `std::time` for host-side runs.

use crate::app::ports::TimePort;

/// Unix time for 2020-01-01; anything earlier means SNTP has not synced.
const EPOCH_2020: i64 = 1_577_836_800;

/// Time adapter for the ESP32 platform.
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
    #[cfg(target_os = "espidf")]
    sntp: Option<esp_idf_svc::sntp::EspSntp<'static>>,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
            #[cfg(target_os = "espidf")]
            sntp: None,
        }
    }

    /// Start SNTP against `server`.  Sync completes in the background once
    /// the station has an address.
    #[cfg(target_os = "espidf")]
    pub fn start_sntp(&mut self, server: &str) -> Result<(), esp_idf_svc::sys::EspError> {
        use esp_idf_svc::sntp::{EspSntp, SntpConf};

        let mut conf = SntpConf::default();
        conf.servers[0] = server;
        self.sntp = Some(EspSntp::new(&conf)?);
        log::info!("Time: SNTP started ({})", server);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn start_sntp(&mut self, server: &str) -> Result<(), core::convert::Infallible> {
        log::info!("Time(sim): host clock used, SNTP '{}' skipped", server);
        Ok(())
    }

    /// `true` once the wall clock looks synchronised.
    pub fn is_synced(&self) -> bool {
        self.unix_secs() >= EPOCH_2020
    }
}

impl TimePort for Esp32TimeAdapter {
    #[cfg(target_os = "espidf")]
    fn uptime_ms(&self) -> u64 {
        // SAFETY: esp_timer_get_time is a read-only query of the system timer.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    #[cfg(not(target_os = "espidf"))]
    fn uptime_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn unix_secs(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_secs() as i64)
    }

    #[cfg(target_os = "espidf")]
    fn delay_ms(&mut self, ms: u32) {
        esp_idf_svc::hal::delay::FreeRtos::delay_ms(ms);
    }

    #[cfg(not(target_os = "espidf"))]
    fn delay_ms(&mut self, ms: u32) {
        std::thread::sleep(std::time::Duration::from_millis(u64::from(ms)));
    }
}
