//! Hardware identity derived from the ESP32 factory MAC address.
//!
//! The provisioning access point is named `<prefix><MAC>` with the full
//! 6-byte MAC in uppercase hex, e.g. `Clinica-Setup-DEADBEEFCAFE`, so that
//! several unprovisioned nodes in one room can be told apart.

use core::fmt::Write;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: `mac` is a valid 6-byte out-buffer.
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// MAC as 12 uppercase hex digits.
pub fn mac_hex(mac: &MacAddress) -> heapless::String<12> {
    let mut s = heapless::String::new();
    for b in mac {
        let _ = write!(s, "{:02X}", b);
    }
    s
}

/// SSID of the provisioning access point.  Truncated to the 32-byte SSID
/// limit.
pub fn access_point_ssid(prefix: &str, mac: &MacAddress) -> String {
    let mut ssid = format!("{}{}", prefix, mac_hex(mac));
    if ssid.len() > 32 {
        let mut cut = 32;
        while !ssid.is_char_boundary(cut) {
            cut -= 1;
        }
        ssid.truncate(cut);
    }
    ssid
}
