//! Messaging adapter: MQTT client over `esp_idf_svc::mqtt`.
//!
//! Implements [`MessagingPort`].  On hardware the ESP-IDF client runs its
//! own network task; a poll thread drains the connection and mirrors the
//! session state into an atomic code that [`is_connected`] reads.
//!
//! [`is_connected`]: MessagingPort::is_connected

use log::{info, warn};

use crate::app::ports::MessagingPort;
use crate::error::CommsError;

// ───────────────────────────────────────────────────────────────
// MQTT adapter (ESP-IDF)
// ───────────────────────────────────────────────────────────────

/// Session state mirrored from the client's event stream.
#[cfg(target_os = "espidf")]
mod session {
    pub const IDLE: u8 = 0;
    pub const CONNECTED: u8 = 1;
    pub const DISCONNECTED: u8 = 2;
    pub const ERROR: u8 = 3;

    pub fn describe(state: u8) -> &'static str {
        match state {
            CONNECTED => "connected",
            DISCONNECTED => "disconnected by broker",
            ERROR => "transport error",
            _ => "no answer yet",
        }
    }
}

#[cfg(target_os = "espidf")]
pub struct MqttAdapter {
    broker_url: String,
    client: Option<esp_idf_svc::mqtt::client::EspMqttClient<'static>>,
    state: std::sync::Arc<std::sync::atomic::AtomicU8>,
}

#[cfg(target_os = "espidf")]
impl MqttAdapter {
    pub fn new(broker_url: &str) -> Self {
        Self {
            broker_url: broker_url.into(),
            client: None,
            state: std::sync::Arc::new(std::sync::atomic::AtomicU8::new(session::IDLE)),
        }
    }
}

#[cfg(target_os = "espidf")]
impl MessagingPort for MqttAdapter {
    fn connect(&mut self, client_id: &str, username: &str, password: &str) -> Result<(), CommsError> {
        use std::sync::atomic::Ordering;

        use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration};

        if self.client.is_some() {
            // The ESP-IDF client reconnects on its own; report where it is.
            let state = self.state.load(Ordering::Acquire);
            if state != session::CONNECTED {
                warn!("MQTT: session pending, broker state: {}", session::describe(state));
                return Err(CommsError::MessagingConnectFailed);
            }
            return Ok(());
        }

        let conf = MqttClientConfiguration {
            client_id: Some(client_id),
            username: (!username.is_empty()).then_some(username),
            password: (!password.is_empty()).then_some(password),
            ..Default::default()
        };
        let (client, mut conn) = EspMqttClient::new(&self.broker_url, &conf).map_err(|e| {
            warn!("MQTT: client init failed: {}", e);
            CommsError::MessagingConnectFailed
        })?;

        let state = self.state.clone();
        std::thread::Builder::new()
            .name("mqtt-poll".into())
            .stack_size(6 * 1024)
            .spawn(move || {
                while let Ok(event) = conn.next() {
                    match event.payload() {
                        EventPayload::Connected(_) => state.store(session::CONNECTED, Ordering::Release),
                        EventPayload::Disconnected => state.store(session::DISCONNECTED, Ordering::Release),
                        EventPayload::Error(e) => {
                            state.store(session::ERROR, Ordering::Release);
                            warn!("MQTT: {:?}", e);
                        }
                        _ => {}
                    }
                }
                state.store(session::DISCONNECTED, Ordering::Release);
                info!("MQTT: connection closed");
            })
            .map_err(|e| {
                warn!("MQTT: poll thread spawn failed: {}", e);
                CommsError::MessagingConnectFailed
            })?;

        self.client = Some(client);
        info!("MQTT: session requested at {}", self.broker_url);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.load(std::sync::atomic::Ordering::Acquire) == session::CONNECTED
    }

    fn service(&mut self) {}

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
        use esp_idf_svc::mqtt::client::QoS;

        let client = self.client.as_mut().ok_or(CommsError::MessagingNotConnected)?;
        client
            .publish(topic, QoS::AtMostOnce, false, payload)
            .map(|_| ())
            .map_err(|e| {
                warn!("MQTT: publish to '{}' failed: {}", topic, e);
                CommsError::PublishFailed
            })
    }
}

// ───────────────────────────────────────────────────────────────
// MQTT adapter (simulation)
// ───────────────────────────────────────────────────────────────

/// Host-side stand-in with an in-memory broker.
#[cfg(not(target_os = "espidf"))]
pub struct MqttAdapter {
    broker_url: String,
    broker_up: bool,
    connected: bool,
    client_id: Option<String>,
    connect_calls: u32,
    service_calls: u32,
    published: Vec<(String, Vec<u8>)>,
}

#[cfg(not(target_os = "espidf"))]
impl MqttAdapter {
    pub fn new(broker_url: &str) -> Self {
        Self {
            broker_url: broker_url.into(),
            broker_up: true,
            connected: false,
            client_id: None,
            connect_calls: 0,
            service_calls: 0,
            published: Vec::new(),
        }
    }

    /// Make the broker (un)reachable.  Going down drops the session.
    pub fn sim_set_broker(&mut self, up: bool) {
        self.broker_up = up;
        if !up {
            self.connected = false;
        }
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn connect_calls(&self) -> u32 {
        self.connect_calls
    }

    pub fn service_calls(&self) -> u32 {
        self.service_calls
    }

    pub fn published(&self) -> &[(String, Vec<u8>)] {
        &self.published
    }
}

#[cfg(not(target_os = "espidf"))]
impl MessagingPort for MqttAdapter {
    fn connect(&mut self, client_id: &str, _username: &str, _password: &str) -> Result<(), CommsError> {
        self.connect_calls = self.connect_calls.wrapping_add(1);
        if !self.broker_up {
            warn!("MQTT(sim): {} refused '{}' (broker down)", self.broker_url, client_id);
            return Err(CommsError::MessagingConnectFailed);
        }
        self.client_id = Some(client_id.into());
        self.connected = true;
        info!("MQTT(sim): '{}' connected to {}", client_id, self.broker_url);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn service(&mut self) {
        self.service_calls = self.service_calls.wrapping_add(1);
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
        if !self.connected {
            return Err(CommsError::MessagingNotConnected);
        }
        self.published.push((topic.into(), payload.to_vec()));
        Ok(())
    }
}
