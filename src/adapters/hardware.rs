//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the DHT22 data line (read through `dht_sensor`), the gas ADC
//! channel, the PIR and button inputs and the status LED, exposing them
//! through [`SensorPort`], [`ButtonPort`], [`IndicatorPort`] and
//! [`SystemPort`].  This is the only module in the system that touches
//! actual hardware.  On non-espidf targets, the pins are host test doubles
//! and the ADC is simulated.

use dht_sensor::dht22;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::warn;

use crate::app::ports::{ButtonPort, ClimateSample, IndicatorPort, SensorPort, SystemPort};
use crate::drivers::hw_init::OneshotAdc;
use crate::drivers::status_led::StatusLed;

/// Concrete adapter that combines all board I/O behind port traits.
pub struct BoardAdapter<DP, D, PIR, BTN, LED> {
    /// Open-drain, pulled up.
    dht_pin: DP,
    delay: D,
    gas: OneshotAdc,
    pir: PIR,
    /// Active low, pulled up.
    button: BTN,
    led: StatusLed<LED>,
    #[cfg(not(target_os = "espidf"))]
    restart_requested: bool,
}

impl<DP, D, PIR, BTN, LED> BoardAdapter<DP, D, PIR, BTN, LED>
where
    DP: InputPin + OutputPin,
    D: DelayNs,
    PIR: InputPin,
    BTN: InputPin,
    LED: OutputPin,
{
    pub fn new(dht_pin: DP, delay: D, gas: OneshotAdc, pir: PIR, button: BTN, led: StatusLed<LED>) -> Self {
        Self {
            dht_pin,
            delay,
            gas,
            pir,
            button,
            led,
            #[cfg(not(target_os = "espidf"))]
            restart_requested: false,
        }
    }

    pub fn gas_adc_mut(&mut self) -> &mut OneshotAdc {
        &mut self.gas
    }

    pub fn led(&self) -> &StatusLed<LED> {
        &self.led
    }

    /// Host only: `true` once [`SystemPort::restart`] was called.
    #[cfg(not(target_os = "espidf"))]
    pub fn restart_requested(&self) -> bool {
        self.restart_requested
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<DP, D, PIR, BTN, LED> SensorPort for BoardAdapter<DP, D, PIR, BTN, LED>
where
    DP: InputPin + OutputPin,
    D: DelayNs,
    PIR: InputPin,
    BTN: InputPin,
    LED: OutputPin,
{
    fn read_climate(&mut self) -> ClimateSample {
        match dht22::blocking::read(&mut self.delay, &mut self.dht_pin) {
            Ok(r) => ClimateSample {
                temperature_c: r.temperature,
                humidity_pct: r.relative_humidity,
            },
            Err(e) => {
                warn!("DHT22: read failed: {:?}", e);
                ClimateSample::FAILED
            }
        }
    }

    fn read_gas_raw(&mut self) -> Option<u16> {
        let raw = self.gas.read_raw();
        if raw.is_none() {
            warn!("MQ4: ADC conversion failed");
        }
        raw
    }

    fn read_motion(&mut self) -> bool {
        self.pir.is_high().unwrap_or(false)
    }
}

// ── Control surface ───────────────────────────────────────────

impl<DP, D, PIR, BTN, LED> ButtonPort for BoardAdapter<DP, D, PIR, BTN, LED>
where
    BTN: InputPin,
{
    fn is_reset_pressed(&mut self) -> bool {
        self.button.is_low().unwrap_or(false)
    }
}

impl<DP, D, PIR, BTN, LED> IndicatorPort for BoardAdapter<DP, D, PIR, BTN, LED>
where
    LED: OutputPin,
{
    fn set_indicator(&mut self, on: bool) {
        self.led.set(on);
    }
}

impl<DP, D, PIR, BTN, LED> SystemPort for BoardAdapter<DP, D, PIR, BTN, LED> {
    #[cfg(target_os = "espidf")]
    fn restart(&mut self) {
        esp_idf_svc::hal::reset::restart();
    }

    #[cfg(not(target_os = "espidf"))]
    fn restart(&mut self) {
        log::info!("Board(sim): restart requested");
        self.restart_requested = true;
    }
}
