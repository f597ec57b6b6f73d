//! GPIO / peripheral pin assignments for the sensor node board (ESP32-WROOM).
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// DHT22 single-wire data line (open-drain, 10 kΩ pull-up).
pub const DHT22_GPIO: i32 = 4;

/// MQ-4 analog output via resistive divider.  GPIO 35 is input-only.
pub const MQ4_ADC_GPIO: i32 = 35;
/// ADC1 channel for [`MQ4_ADC_GPIO`].
pub const MQ4_ADC_CHANNEL: u32 = 7;

/// HC-SR501 PIR digital output.  HIGH = motion.
pub const PIR_GPIO: i32 = 15;

// ---------------------------------------------------------------------------
// Operator interface
// ---------------------------------------------------------------------------

/// On-board status LED.  Active high.
pub const STATUS_LED_GPIO: i32 = 2;

/// BOOT button, active-low with pull-up.  Held to factory-reset.
pub const RESET_BUTTON_GPIO: i32 = 0;
