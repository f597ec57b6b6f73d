//! Wireless and messaging link orchestration.
//!
//! Both links are brought up by a single bounded, blocking attempt built on
//! [`poll_until`].  There is no backoff: the controller simply calls the
//! connect again on the next tick while a link is down.  A link is reported
//! [`LinkState::Connected`] only when the port confirmed it during the same
//! attempt.

use log::{info, warn};

use crate::app::ports::{MessagingPort, TimePort, WifiPort};
use crate::config::NodeConfig;
use crate::error::CommsError;
use crate::identity::DeviceIdentity;
use crate::retry::poll_until;

/// Prefix of the broker client identifier; the device id follows.
pub const CLIENT_ID_PREFIX: &str = "ESP32_";

/// State of one link as last observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    /// Only ever observed from inside a bounded attempt.
    Connecting,
    Connected,
}

/// Which link an observation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    Wireless,
    Messaging,
}

/// Broker client identifier for `device_id`.
pub fn client_id(device_id: &str) -> String {
    format!("{CLIENT_ID_PREFIX}{device_id}")
}

/// Owns both link ports and their observed state.
pub struct ConnectivityManager<W, M> {
    wifi: W,
    messaging: M,
    wireless_state: LinkState,
    messaging_state: LinkState,
    wifi_timeout_ms: u32,
    messaging_timeout_ms: u32,
    poll_interval_ms: u32,
    broker_username: String,
    broker_password: String,
}

impl<W: WifiPort, M: MessagingPort> ConnectivityManager<W, M> {
    pub fn new(wifi: W, messaging: M, config: &NodeConfig) -> Self {
        Self {
            wifi,
            messaging,
            wireless_state: LinkState::Disconnected,
            messaging_state: LinkState::Disconnected,
            wifi_timeout_ms: config.wifi_timeout_ms,
            messaging_timeout_ms: config.messaging_timeout_ms,
            poll_interval_ms: config.link_poll_interval_ms,
            broker_username: config.broker_username.clone(),
            broker_password: config.broker_password.clone(),
        }
    }

    // ── Wireless ──────────────────────────────────────────────

    /// Join the identity's network, blocking for at most the configured
    /// wifi timeout (plus one poll interval).
    pub fn connect_wireless(&mut self, identity: &DeviceIdentity, clock: &mut impl TimePort) -> LinkState {
        self.join(&identity.ssid, &identity.password, self.wifi_timeout_ms, clock)
    }

    /// Join `ssid` with an explicit bound.  Never fails: a refused request
    /// or a timeout both yield [`LinkState::Disconnected`].
    pub fn join(
        &mut self,
        ssid: &str,
        password: &str,
        timeout_ms: u32,
        clock: &mut impl TimePort,
    ) -> LinkState {
        info!("WiFi: connecting to '{}' (timeout {} ms)", ssid, timeout_ms);
        self.wireless_state = LinkState::Connecting;

        if let Err(e) = self.wifi.begin(ssid, password) {
            warn!("WiFi: connect request refused: {}", e);
            self.wireless_state = LinkState::Disconnected;
            return self.wireless_state;
        }

        let wifi = &self.wifi;
        let joined = poll_until(clock, timeout_ms, self.poll_interval_ms, || wifi.is_connected());

        self.wireless_state = if joined {
            info!("WiFi: connected to '{}'", ssid);
            LinkState::Connected
        } else {
            warn!("WiFi: no association with '{}' within {} ms", ssid, timeout_ms);
            LinkState::Disconnected
        };
        self.wireless_state
    }

    /// Refresh and return whether the station is associated.
    pub fn is_wireless_connected(&mut self) -> bool {
        self.wireless_state = if self.wifi.is_connected() {
            LinkState::Connected
        } else {
            LinkState::Disconnected
        };
        self.wireless_state == LinkState::Connected
    }

    pub fn start_access_point(&mut self, ssid: &str, password: &str) -> Result<(), CommsError> {
        self.wifi.start_access_point(ssid, password)?;
        info!("WiFi: access point '{}' up", ssid);
        Ok(())
    }

    // ── Messaging ─────────────────────────────────────────────

    /// Open a broker session for `identity`, blocking for at most the
    /// configured messaging timeout (plus one poll interval).
    pub fn connect_messaging(&mut self, identity: &DeviceIdentity, clock: &mut impl TimePort) -> LinkState {
        let client_id = client_id(&identity.device_id);
        info!(
            "Broker: connecting as '{}' user='{}' password={}****",
            client_id,
            self.broker_username,
            self.broker_password.chars().take(4).collect::<String>()
        );
        self.messaging_state = LinkState::Connecting;

        let messaging = &mut self.messaging;
        let (user, pass) = (self.broker_username.as_str(), self.broker_password.as_str());
        let established = poll_until(clock, self.messaging_timeout_ms, self.poll_interval_ms, || {
            if messaging.is_connected() {
                return true;
            }
            if let Err(e) = messaging.connect(&client_id, user, pass) {
                warn!("Broker: attempt failed: {}", e);
            }
            messaging.is_connected()
        });

        self.messaging_state = if established {
            info!("Broker: session established");
            LinkState::Connected
        } else {
            warn!("Broker: no session within {} ms", self.messaging_timeout_ms);
            LinkState::Disconnected
        };
        self.messaging_state
    }

    /// Refresh and return whether the broker session is up.
    pub fn is_messaging_connected(&mut self) -> bool {
        self.messaging_state = if self.messaging.is_connected() {
            LinkState::Connected
        } else {
            LinkState::Disconnected
        };
        self.messaging_state == LinkState::Connected
    }

    /// Keep-alive processing.  No-op while disconnected.
    pub fn service_messaging(&mut self) {
        if self.messaging_state == LinkState::Connected {
            self.messaging.service();
        }
    }

    /// Publish on the current session.  Fails without retrying when the
    /// session is down.
    pub fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
        if !self.is_messaging_connected() {
            return Err(CommsError::MessagingNotConnected);
        }
        self.messaging.publish(topic, payload)
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn wireless_state(&self) -> LinkState {
        self.wireless_state
    }

    pub fn messaging_state(&self) -> LinkState {
        self.messaging_state
    }

    pub fn wifi(&self) -> &W {
        &self.wifi
    }

    pub fn messaging(&self) -> &M {
        &self.messaging
    }
}
