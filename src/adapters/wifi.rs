//! WiFi adapter: station join plus the provisioning access point.
//!
//! Implements [`WifiPort`].  The adapter only issues requests; waiting for
//! the association is bounded by
//! [`ConnectivityManager`](crate::connectivity::ConnectivityManager).
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver calls via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stubs for host-side tests.

use log::{info, warn};

use crate::app::ports::WifiPort;
use crate::error::CommsError;

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), CommsError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(CommsError::InvalidSsid);
    }
    Ok(())
}

/// Empty means an open network; otherwise WPA2 wants 8-64 bytes.
fn validate_password(password: &str) -> Result<(), CommsError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(CommsError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter (ESP-IDF)
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct WifiAdapter {
    wifi: esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>,
    ap: Option<esp_idf_svc::wifi::AccessPointConfiguration>,
}

#[cfg(target_os = "espidf")]
impl WifiAdapter {
    pub fn new(wifi: esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>) -> Self {
        Self { wifi, ap: None }
    }

    fn apply(
        &mut self,
        client: Option<esp_idf_svc::wifi::ClientConfiguration>,
    ) -> Result<(), esp_idf_svc::sys::EspError> {
        use esp_idf_svc::wifi::Configuration;

        let conf = match (client, self.ap.clone()) {
            (Some(c), Some(ap)) => Configuration::Mixed(c, ap),
            (Some(c), None) => Configuration::Client(c),
            (None, Some(ap)) => Configuration::AccessPoint(ap),
            (None, None) => Configuration::None,
        };
        self.wifi.set_configuration(&conf)?;
        if !self.wifi.is_started()? {
            self.wifi.start()?;
        }
        Ok(())
    }
}

#[cfg(target_os = "espidf")]
impl WifiPort for WifiAdapter {
    fn begin(&mut self, ssid: &str, password: &str) -> Result<(), CommsError> {
        use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration};

        validate_ssid(ssid)?;
        validate_password(password)?;

        let client = ClientConfiguration {
            ssid: ssid.try_into().map_err(|_| CommsError::InvalidSsid)?,
            password: password.try_into().map_err(|_| CommsError::InvalidPassword)?,
            auth_method: if password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            ..Default::default()
        };

        let _ = self.wifi.wifi_mut().disconnect();
        self.apply(Some(client)).map_err(|e| {
            warn!("WiFi: configuration rejected: {}", e);
            CommsError::WifiConnectFailed
        })?;
        self.wifi.wifi_mut().connect().map_err(|e| {
            warn!("WiFi: connect request failed: {}", e);
            CommsError::WifiConnectFailed
        })?;
        info!("WiFi: association requested for '{}'", ssid);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false) && self.wifi.is_up().unwrap_or(false)
    }

    fn start_access_point(&mut self, ssid: &str, password: &str) -> Result<(), CommsError> {
        use esp_idf_svc::wifi::{AccessPointConfiguration, AuthMethod};

        validate_ssid(ssid)?;
        validate_password(password)?;

        self.ap = Some(AccessPointConfiguration {
            ssid: ssid.try_into().map_err(|_| CommsError::InvalidSsid)?,
            password: password.try_into().map_err(|_| CommsError::InvalidPassword)?,
            auth_method: if password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            channel: 1,
            ..Default::default()
        });
        // Station half stays configured: the submit flow joins over it.
        self.apply(Some(Default::default())).map_err(|e| {
            warn!("WiFi: access point failed: {}", e);
            CommsError::AccessPointFailed
        })
    }
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter (simulation)
// ───────────────────────────────────────────────────────────────

/// Host-side stand-in.  A join succeeds when the requested credentials
/// match the network registered with [`sim_set_network`](Self::sim_set_network).
#[cfg(not(target_os = "espidf"))]
#[derive(Default)]
pub struct WifiAdapter {
    network: Option<(String, String)>,
    requested: Option<(String, String)>,
    ap_ssid: Option<String>,
    link_dropped: bool,
    begin_calls: u32,
}

#[cfg(not(target_os = "espidf"))]
impl WifiAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the single reachable network.
    pub fn sim_set_network(&mut self, ssid: &str, password: &str) {
        self.network = Some((ssid.into(), password.into()));
    }

    /// Simulate losing the association until the next `begin`.
    pub fn sim_drop_link(&mut self) {
        self.link_dropped = true;
    }

    pub fn begin_calls(&self) -> u32 {
        self.begin_calls
    }

    pub fn access_point(&self) -> Option<&str> {
        self.ap_ssid.as_deref()
    }
}

#[cfg(not(target_os = "espidf"))]
impl WifiPort for WifiAdapter {
    fn begin(&mut self, ssid: &str, password: &str) -> Result<(), CommsError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.begin_calls = self.begin_calls.wrapping_add(1);
        self.requested = Some((ssid.into(), password.into()));
        self.link_dropped = false;
        info!("WiFi(sim): association requested for '{}'", ssid);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        !self.link_dropped && self.requested.is_some() && self.requested == self.network
    }

    fn start_access_point(&mut self, ssid: &str, password: &str) -> Result<(), CommsError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ap_ssid = Some(ssid.into());
        info!("WiFi(sim): access point '{}' up", ssid);
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
