//! Single-colour status LED on a push-pull GPIO.
//!
//! Generic over any `embedded-hal` output pin so the same driver runs on the
//! ESP32 `PinDriver` and on host test pins.  Redundant writes are skipped.

use embedded_hal::digital::OutputPin;
use log::warn;

pub struct StatusLed<P> {
    pin: P,
    on: bool,
}

impl<P: OutputPin> StatusLed<P> {
    /// Take ownership of `pin` and drive it low.
    pub fn new(mut pin: P) -> Self {
        if pin.set_low().is_err() {
            warn!("StatusLed: initial write failed");
        }
        Self { pin, on: false }
    }

    pub fn set(&mut self, on: bool) {
        if on == self.on {
            return;
        }
        let result = if on { self.pin.set_high() } else { self.pin.set_low() };
        match result {
            Ok(()) => self.on = on,
            Err(_) => warn!("StatusLed: GPIO write failed"),
        }
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}
