//! Board-level drivers: reset button, indicator, analog input.

pub mod button;
pub mod hw_init;
pub mod led_patterns;
pub mod status_led;
