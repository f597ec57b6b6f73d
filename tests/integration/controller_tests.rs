//! ModeController lifecycle tests: boot selection, steady-state link
//! recovery, sampling cadence and the destructive reset.

use clinicnode::app::events::{AppEvent, ResetReason, SkipReason};
use clinicnode::config::NodeConfig;
use clinicnode::connectivity::{Link, LinkState};
use clinicnode::error::{CommsError, ProvisioningError};
use clinicnode::identity::{self, DeviceMode, SensorType};

use crate::mock_hw::{test_config, MemStorage, MockActivation, MockBoard, MockWifi, Rig};

const SSID: &str = "ClinicNet";
const PASS: &str = "ward-7-secret";

fn operational_rig(sensor: SensorType, board: MockBoard) -> Rig {
    let mut rig = Rig::new(
        MockWifi::with_network(SSID, PASS),
        MockActivation::failing(ProvisioningError::ActivationUnreachable),
        MemStorage::provisioned(SSID, PASS, "node-1", sensor),
        board,
    );
    assert_eq!(rig.boot(), DeviceMode::Operational);
    rig
}

fn payloads(rig: &Rig) -> Vec<serde_json::Value> {
    rig.broker
        .published()
        .iter()
        .map(|(_, body)| serde_json::from_str(body).unwrap())
        .collect()
}

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn empty_store_boots_into_provisioning() {
    let mut rig = Rig::new(
        MockWifi::default(),
        MockActivation::accepting("node-1"),
        MemStorage::new(),
        MockBoard::new(),
    );
    assert_eq!(rig.boot(), DeviceMode::Provisioning);
    assert_eq!(rig.ctl.mode(), DeviceMode::Provisioning);
    assert_eq!(
        rig.wifi.0.borrow().access_point.as_deref(),
        Some("Clinica-Setup-DEADBEEFCAFE")
    );
    assert!(rig.portal.0.borrow().started);
    assert!(rig.sink.events.contains(&AppEvent::Booted(DeviceMode::Provisioning)));
    assert_eq!(rig.wifi.begin_calls(), 0);
}

#[test]
fn stored_identity_boots_operational_with_both_links() {
    let rig = operational_rig(SensorType::Dht22, MockBoard::with_climate(21.0, 40.0));
    assert_eq!(rig.ctl.links().wireless_state(), LinkState::Connected);
    assert_eq!(rig.ctl.links().messaging_state(), LinkState::Connected);
    assert_eq!(rig.ctl.topic(), "devices/node-1/sensors");
    assert_eq!(
        rig.broker.0.borrow().client_id.as_deref(),
        Some("ESP32_node-1")
    );
    assert!(rig.sink.events.contains(&AppEvent::Booted(DeviceMode::Operational)));
}

#[test]
fn partial_store_boots_into_provisioning() {
    let mut storage = MemStorage::new();
    storage.put(identity::NAMESPACE, identity::KEY_SSID, SSID);
    storage.put(identity::NAMESPACE, identity::KEY_PASSWORD, PASS);
    let mut rig = Rig::new(
        MockWifi::with_network(SSID, PASS),
        MockActivation::accepting("node-1"),
        storage,
        MockBoard::new(),
    );
    assert_eq!(rig.boot(), DeviceMode::Provisioning);
}

#[test]
fn bootstrap_wifi_failure_erases_and_restarts() {
    let mut rig = Rig::new(
        MockWifi::with_network(SSID, "the-real-password"),
        MockActivation::accepting("node-1"),
        MemStorage::provisioned(SSID, PASS, "node-1", SensorType::Dht22),
        MockBoard::new(),
    );
    let before = rig.clock.now();
    rig.boot();

    // One bounded attempt: timeout plus at most one poll interval.
    let cfg = rig.ctl.config().clone();
    assert!(rig.clock.now() - before < u64::from(cfg.wifi_timeout_ms + cfg.link_poll_interval_ms));

    assert!(rig.ctl.is_halted());
    assert_eq!(rig.board.restarts, 1);
    assert_eq!(rig.storage.erases, 1);
    assert!(!identity::is_complete(&rig.storage));
    assert!(rig.sink.events.contains(&AppEvent::ResetTriggered(
        ResetReason::BootstrapWifiFailed
    )));

    // The next boot lands in provisioning.
    let storage = std::mem::take(&mut rig.storage);
    let mut next = Rig::new(
        MockWifi::with_network(SSID, "the-real-password"),
        MockActivation::accepting("node-1"),
        storage,
        MockBoard::new(),
    );
    assert_eq!(next.boot(), DeviceMode::Provisioning);
}

#[test]
fn halted_controller_ignores_ticks() {
    let mut rig = Rig::new(
        MockWifi::with_network(SSID, "other"),
        MockActivation::accepting("node-1"),
        MemStorage::provisioned(SSID, PASS, "node-1", SensorType::Mq4),
        MockBoard::new(),
    );
    rig.boot();
    let events = rig.sink.events.len();
    rig.run_for(20_000);
    assert_eq!(rig.sink.events.len(), events);
    assert_eq!(rig.board.restarts, 1);
}

// ── Sampling ──────────────────────────────────────────────────

#[test]
fn climate_published_once_per_interval() {
    let mut rig = operational_rig(SensorType::Dht22, MockBoard::with_climate(21.44, 55.6));
    rig.run_for(9_900);
    assert!(rig.broker.published().is_empty());

    rig.run_for(100);
    let published = rig.broker.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0, "devices/node-1/sensors");

    let p = &payloads(&rig)[0];
    assert_eq!(p["sensorType"], "dht22");
    assert_eq!(p["readings"][0]["metric"], "temperature");
    assert_eq!(p["readings"][0]["value"], 21.4);
    assert_eq!(p["readings"][1]["metric"], "humidity");
    assert_eq!(p["readings"][1]["value"], 55.6);
    assert_eq!(p["readings"][0]["timestamp"], "2024-01-01T00:00:10Z");
    assert_eq!(p["readings"][0]["timestamp"], p["readings"][1]["timestamp"]);

    rig.run_for(10_000);
    assert_eq!(rig.broker.published().len(), 2);
}

#[test]
fn failed_read_skips_only_that_interval() {
    let mut rig = operational_rig(SensorType::Dht22, MockBoard::new());
    rig.run_for(10_000);
    assert!(rig.broker.published().is_empty());
    assert_eq!(
        rig.sink
            .count(|e| *e == AppEvent::SampleSkipped(SkipReason::NoReading)),
        1
    );
    assert_eq!(rig.ctl.mode(), DeviceMode::Operational);

    rig.board.climate = Some(clinicnode::app::ports::ClimateSample {
        temperature_c: 19.0,
        humidity_pct: 35.0,
    });
    rig.run_for(10_000);
    assert_eq!(rig.broker.published().len(), 1);
}

#[test]
fn gas_publishes_scaled_index() {
    let mut board = MockBoard::new();
    board.gas_raw = Some(4095);
    let mut rig = operational_rig(SensorType::Mq4, board);
    rig.run_for(10_000);
    let p = &payloads(&rig)[0];
    assert_eq!(p["sensorType"], "mq4");
    assert_eq!(p["readings"][0]["metric"], "gas");
    assert_eq!(p["readings"][0]["value"], 1000.0);
}

#[test]
fn failed_gas_conversion_skips_interval() {
    let mut board = MockBoard::new();
    board.gas_raw = None;
    let mut rig = operational_rig(SensorType::Mq4, board);
    rig.run_for(10_000);
    assert!(rig.broker.published().is_empty());
    assert_eq!(
        rig.sink.count(|e| *e == AppEvent::SampleSkipped(SkipReason::NoReading)),
        1
    );

    rig.board.gas_raw = Some(2048);
    rig.run_for(10_000);
    assert_eq!(payloads(&rig)[0]["readings"][0]["value"], 500.1);
}

#[test]
fn pir_waits_for_stabilization_then_reports_and_clears() {
    let mut rig = operational_rig(SensorType::Pir, MockBoard::new());

    // Motion during the 5 s warm-up is ignored.
    rig.board.motion = true;
    rig.run_for(2_000);
    rig.board.motion = false;
    rig.run_for(4_000);
    assert!(rig.ctl.sampler().unwrap().is_ready());
    assert_eq!(rig.sink.count(|e| *e == AppEvent::SensorReady), 1);

    // Short pulse well before the publish.
    rig.board.motion = true;
    rig.run_for(200);
    rig.board.motion = false;
    assert!(rig.board.indicator);

    rig.run_for(10_000 - rig.clock.now());
    let p = payloads(&rig);
    assert_eq!(p.len(), 1);
    assert_eq!(p[0]["sensorType"], "pir");
    assert_eq!(p[0]["readings"][0]["metric"], "motion");
    assert_eq!(p[0]["readings"][0]["value"], true);

    // No new edge: the next interval reports false.
    rig.run_for(10_000);
    let p = payloads(&rig);
    assert_eq!(p.len(), 2);
    assert_eq!(p[1]["readings"][0]["value"], false);
    assert!(!rig.board.indicator);
}

#[test]
fn pir_not_armed_skips_interval() {
    let config = NodeConfig {
        pir_stabilization_ms: 15_000,
        ..test_config()
    };
    let mut rig = Rig::with_config(
        config,
        MockWifi::with_network(SSID, PASS),
        MockActivation::accepting("node-1"),
        MemStorage::provisioned(SSID, PASS, "node-1", SensorType::Pir),
        MockBoard::new(),
    );
    rig.boot();
    rig.board.motion = true;
    rig.run_for(10_000);
    assert!(!rig.ctl.sampler().unwrap().is_ready());
    assert!(rig.broker.published().is_empty());
    assert!(rig.sink.events.contains(&AppEvent::SampleSkipped(SkipReason::NoReading)));

    // Still high when it arms: the arming tick counts as the rising edge.
    rig.run_for(10_000);
    let p = payloads(&rig);
    assert_eq!(p.len(), 1);
    assert_eq!(p[0]["readings"][0]["value"], true);
}

#[test]
fn unrecognised_sensor_type_stays_operational_without_publishing() {
    let mut storage = MemStorage::provisioned(SSID, PASS, "node-1", SensorType::Dht22);
    storage.put(identity::NAMESPACE, identity::KEY_SENSOR_TYPE, "co2");
    let mut rig = Rig::new(
        MockWifi::with_network(SSID, PASS),
        MockActivation::accepting("node-1"),
        storage,
        MockBoard::with_climate(20.0, 30.0),
    );
    assert_eq!(rig.boot(), DeviceMode::Operational);
    assert_eq!(rig.ctl.sampler().unwrap().sensor_type(), None);
    rig.run_for(30_000);
    assert!(rig.broker.published().is_empty());
    assert_eq!(
        rig.sink
            .count(|e| *e == AppEvent::SampleSkipped(SkipReason::NoReading)),
        3
    );
}

// ── Steady-state links ────────────────────────────────────────

#[test]
fn broker_outage_is_retried_every_tick_and_recovers() {
    let mut rig = operational_rig(SensorType::Mq4, MockBoard::new());
    rig.broker.set_up(false);
    let calls = rig.broker.connect_calls();

    rig.step();
    rig.step();
    assert!(rig.broker.connect_calls() >= calls + 2);
    assert_eq!(rig.ctl.mode(), DeviceMode::Operational);

    rig.broker.set_up(true);
    rig.step();
    assert_eq!(rig.ctl.links().messaging_state(), LinkState::Connected);
    // One from boot, one from the recovery.
    let connected = AppEvent::LinkChanged {
        link: Link::Messaging,
        state: LinkState::Connected,
    };
    assert_eq!(rig.sink.count(|e| *e == connected), 2);
}

#[test]
fn publish_failure_is_logged_not_fatal() {
    let mut rig = operational_rig(SensorType::Mq4, MockBoard::new());
    rig.broker.set_up(false);
    rig.run_for(10_000);
    assert!(rig.broker.published().is_empty());
    assert!(rig.sink.events.contains(&AppEvent::SampleSkipped(SkipReason::Publish(
        CommsError::MessagingNotConnected
    ))));
    assert_eq!(rig.storage.erases, 0);
    assert_eq!(rig.board.restarts, 0);
}

#[test]
fn wifi_drop_is_rejoined_without_reset() {
    let mut rig = operational_rig(SensorType::Mq4, MockBoard::new());
    let joins = rig.wifi.begin_calls();
    rig.wifi.drop_link();
    rig.step();
    assert_eq!(rig.wifi.begin_calls(), joins + 1);
    assert_eq!(rig.ctl.links().wireless_state(), LinkState::Connected);
    assert_eq!(rig.storage.erases, 0);
    assert!(identity::is_complete(&rig.storage));
}

#[test]
fn messaging_serviced_every_tick() {
    let mut rig = operational_rig(SensorType::Mq4, MockBoard::new());
    rig.run_for(1_000);
    assert_eq!(rig.broker.0.borrow().service_calls, 10);
}

// ── Reset button ──────────────────────────────────────────────

#[test]
fn short_press_does_nothing() {
    let mut rig = operational_rig(SensorType::Mq4, MockBoard::new());
    rig.board.button = true;
    rig.run_for(4_800);
    rig.board.button = false;
    rig.run_for(10_000);
    assert_eq!(rig.board.restarts, 0);
    assert_eq!(rig.storage.erases, 0);
}

#[test]
fn long_press_resets_exactly_once() {
    let mut rig = operational_rig(SensorType::Mq4, MockBoard::new());
    rig.board.button = true;
    rig.run_for(12_000);
    assert_eq!(rig.board.restarts, 1);
    assert_eq!(rig.storage.erases, 1);
    assert!(!identity::is_complete(&rig.storage));
    assert_eq!(
        rig.sink
            .count(|e| *e == AppEvent::ResetTriggered(ResetReason::ButtonHeld)),
        1
    );
}

#[test]
fn long_press_works_in_provisioning_too() {
    let mut rig = Rig::new(
        MockWifi::default(),
        MockActivation::accepting("node-1"),
        MemStorage::new(),
        MockBoard::new(),
    );
    rig.boot();
    rig.board.button = true;
    rig.run_for(6_000);
    assert_eq!(rig.board.restarts, 1);
    assert!(rig.ctl.is_halted());
}

// ── Indicator ─────────────────────────────────────────────────

#[test]
fn provisioning_indicator_blinks() {
    let mut rig = Rig::new(
        MockWifi::default(),
        MockActivation::accepting("node-1"),
        MemStorage::new(),
        MockBoard::new(),
    );
    rig.boot();
    let mut seen_on = false;
    let mut seen_off = false;
    for _ in 0..20 {
        rig.step();
        seen_on |= rig.board.indicator;
        seen_off |= !rig.board.indicator;
    }
    assert!(seen_on && seen_off);
}
