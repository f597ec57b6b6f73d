//! ConnectivityManager against the host simulation adapters and the
//! virtual clock.

use clinicnode::adapters::mqtt::MqttAdapter;
use clinicnode::adapters::wifi::WifiAdapter;
use clinicnode::app::ports::TimePort;
use clinicnode::connectivity::{ConnectivityManager, LinkState};
use clinicnode::error::CommsError;
use clinicnode::identity::{DeviceIdentity, SensorType};

use crate::mock_hw::{test_config, VirtualClock};

fn identity(password: &str) -> DeviceIdentity {
    DeviceIdentity::new("ClinicNet", password, "node-5", SensorType::Mq4).unwrap()
}

fn manager(network_password: &str) -> ConnectivityManager<WifiAdapter, MqttAdapter> {
    let config = test_config();
    let mut wifi = WifiAdapter::new();
    wifi.sim_set_network("ClinicNet", network_password);
    ConnectivityManager::new(wifi, MqttAdapter::new(&config.broker_url()), &config)
}

#[test]
fn both_links_come_up_without_waiting() {
    let mut links = manager("ward-7-secret");
    let mut clock = VirtualClock::new();
    let id = identity("ward-7-secret");

    assert_eq!(links.connect_wireless(&id, &mut clock), LinkState::Connected);
    assert_eq!(links.connect_messaging(&id, &mut clock), LinkState::Connected);
    assert_eq!(clock.now(), 0);
    assert_eq!(links.messaging().client_id(), Some("ESP32_node-5"));
}

#[test]
fn wrong_password_times_out_within_bound() {
    let mut links = manager("ward-7-secret");
    let mut clock = VirtualClock::new();
    let cfg = test_config();

    let state = links.connect_wireless(&identity("wrong-password"), &mut clock);
    assert_eq!(state, LinkState::Disconnected);
    assert!(clock.uptime_ms() >= u64::from(cfg.wifi_timeout_ms));
    assert!(clock.uptime_ms() < u64::from(cfg.wifi_timeout_ms + cfg.link_poll_interval_ms));
    assert_eq!(links.wifi().begin_calls(), 1);
}

#[test]
fn refused_request_fails_immediately() {
    let mut links = manager("ward-7-secret");
    let mut clock = VirtualClock::new();
    // Rejected by the radio's own validation: no polling happens.
    let state = links.join("", "ward-7-secret", 10_000, &mut clock);
    assert_eq!(state, LinkState::Disconnected);
    assert_eq!(clock.now(), 0);
}

#[test]
fn broker_down_retries_until_deadline() {
    let mut clock = VirtualClock::new();
    let cfg = test_config();
    let id = identity("ward-7-secret");

    let mut mqtt = MqttAdapter::new(&cfg.broker_url());
    mqtt.sim_set_broker(false);
    let mut wifi = WifiAdapter::new();
    wifi.sim_set_network("ClinicNet", "ward-7-secret");
    let mut down = ConnectivityManager::new(wifi, mqtt, &cfg);

    let start = clock.now();
    assert_eq!(down.connect_messaging(&id, &mut clock), LinkState::Disconnected);
    let spent = clock.now() - start;
    assert!(spent >= u64::from(cfg.messaging_timeout_ms));
    assert!(spent < u64::from(cfg.messaging_timeout_ms + cfg.link_poll_interval_ms));
    // One attempt per poll: 0, 500, 1000 ms.
    assert_eq!(down.messaging().connect_calls(), 3);
}

#[test]
fn publish_without_session_is_refused() {
    let mut links = manager("ward-7-secret");
    assert_eq!(
        links.publish("devices/node-5/sensors", b"{}"),
        Err(CommsError::MessagingNotConnected)
    );
    assert!(links.messaging().published().is_empty());
}

#[test]
fn service_only_runs_on_live_session() {
    let mut links = manager("ward-7-secret");
    let mut clock = VirtualClock::new();
    links.service_messaging();
    assert_eq!(links.messaging().service_calls(), 0);

    links.connect_messaging(&identity("ward-7-secret"), &mut clock);
    links.service_messaging();
    assert_eq!(links.messaging().service_calls(), 1);
}
