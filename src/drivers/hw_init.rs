//! One-shot analog input for the gas sensor.
//!
//! Configures an ADC1 oneshot unit with 12 dB attenuation and 12-bit width
//! using raw ESP-IDF sys calls.  Built once from `main()` before the tick
//! loop starts and then owned by the board adapter.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads the configured ADC1 channel via the oneshot API.
//! On host/test: returns an injected raw value.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

// ── Error type ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={})", rc),
        }
    }
}

impl std::error::Error for HwInitError {}

// ── ADC (oneshot) ─────────────────────────────────────────────

pub struct OneshotAdc {
    channel: u32,
    #[cfg(target_os = "espidf")]
    handle: adc_oneshot_unit_handle_t,
    #[cfg(not(target_os = "espidf"))]
    sim_raw: u16,
}

impl OneshotAdc {
    /// Create the ADC1 unit and configure `channel`.
    #[cfg(target_os = "espidf")]
    pub fn new(channel: u32) -> Result<Self, HwInitError> {
        let init_cfg = adc_oneshot_unit_init_cfg_t {
            unit_id: adc_unit_t_ADC_UNIT_1,
            ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
            ..Default::default()
        };
        let mut handle: adc_oneshot_unit_handle_t = core::ptr::null_mut();
        // SAFETY: called once from main() before the tick loop; `handle` is a
        // valid out-pointer for the duration of the call.
        let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &mut handle) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::AdcInitFailed(ret));
        }

        let chan_cfg = adc_oneshot_chan_cfg_t {
            atten: adc_atten_t_ADC_ATTEN_DB_12,
            bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
        };
        // SAFETY: `handle` was just created by adc_oneshot_new_unit.
        let ret = unsafe { adc_oneshot_config_channel(handle, channel, &chan_cfg) };
        if ret != ESP_OK as i32 {
            // SAFETY: releasing the unit we own.
            unsafe { adc_oneshot_del_unit(handle) };
            return Err(HwInitError::AdcInitFailed(ret));
        }

        info!("hw_init: ADC1 channel {} configured", channel);
        Ok(Self { channel, handle })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new(channel: u32) -> Result<Self, HwInitError> {
        log::info!("hw_init(sim): ADC1 channel {} simulated", channel);
        Ok(Self { channel, sim_raw: 0 })
    }

    pub fn channel(&self) -> u32 {
        self.channel
    }

    /// Raw count, or `None` if the conversion failed.
    #[cfg(target_os = "espidf")]
    pub fn read_raw(&mut self) -> Option<u16> {
        let mut raw: i32 = 0;
        // SAFETY: `handle` is owned by self and only used from the tick loop.
        let ret = unsafe { adc_oneshot_read(self.handle, self.channel, &mut raw) };
        if ret != ESP_OK as i32 {
            return None;
        }
        Some(raw.clamp(0, 4095) as u16)
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn read_raw(&mut self) -> Option<u16> {
        Some(self.sim_raw)
    }

    /// Host only: set the value the next reads return.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_raw(&mut self, raw: u16) {
        self.sim_raw = raw;
    }
}

#[cfg(target_os = "espidf")]
impl Drop for OneshotAdc {
    fn drop(&mut self) {
        // SAFETY: the unit is owned by self and no longer used after drop.
        unsafe { adc_oneshot_del_unit(self.handle) };
    }
}
