//! Integration tests for the access-point provisioning flow.
//!
//! Verifies the end-to-end sequence: the portal hands over a form, the
//! node joins the submitted network, exchanges the token for a device id,
//! persists the identity and restarts after the grace delay.  Every
//! rejection is reported back to the portal without state loss.

use clinicnode::app::events::AppEvent;
use clinicnode::app::provisioning::{parse_form, ProvisioningOutcome};
use clinicnode::error::ProvisioningError;
use clinicnode::identity::{self, DeviceMode, SensorType};

use crate::mock_hw::{MemStorage, MockActivation, MockBoard, MockWifi, Rig};

const SSID: &str = "ClinicNet";
const PASS: &str = "ward-7-secret";

fn provisioning_rig(activation: MockActivation) -> Rig {
    let mut rig = Rig::new(
        MockWifi::with_network(SSID, PASS),
        activation,
        MemStorage::new(),
        MockBoard::new(),
    );
    assert_eq!(rig.boot(), DeviceMode::Provisioning);
    rig
}

#[test]
fn successful_submission_persists_and_restarts_after_grace() {
    let mut rig = provisioning_rig(MockActivation::accepting("node-42"));
    rig.portal.submit(SSID, PASS, "tok-1");
    rig.step();

    assert_eq!(rig.activation.tokens(), vec!["tok-1".to_string()]);
    assert!(identity::is_complete(&rig.storage));
    assert!(rig.ctl.restart_pending());
    assert!(rig.sink.events.contains(&AppEvent::Provisioned));
    assert!(matches!(
        rig.portal.reports().as_slice(),
        [ProvisioningOutcome::Activated { device_id }] if device_id.as_str() == "node-42"
    ));

    // Restart waits for the grace delay; the loop keeps running meanwhile.
    rig.run_for(2_900);
    assert_eq!(rig.board.restarts, 0);
    rig.step();
    assert_eq!(rig.board.restarts, 1);
    assert!(rig.ctl.is_halted());

    let stored = identity::load(&rig.storage, SensorType::Mq4).unwrap().unwrap();
    assert_eq!(stored.device_id.as_str(), "node-42");
    assert_eq!(stored.ssid.as_str(), SSID);
    // Written with the process-wide default, not the loader's fallback.
    assert_eq!(stored.sensor_type, Some(SensorType::Dht22));

    // Next boot is operational.
    let storage = std::mem::take(&mut rig.storage);
    let mut next = Rig::new(
        MockWifi::with_network(SSID, PASS),
        MockActivation::accepting("unused"),
        storage,
        MockBoard::new(),
    );
    assert_eq!(next.boot(), DeviceMode::Operational);
    assert_eq!(next.ctl.topic(), "devices/node-42/sensors");
}

#[test]
fn empty_field_rejected_before_any_network_attempt() {
    let mut rig = provisioning_rig(MockActivation::accepting("node-42"));
    rig.portal.submit(SSID, PASS, "");
    rig.step();

    assert_eq!(rig.wifi.begin_calls(), 0);
    assert!(rig.activation.tokens().is_empty());
    assert_eq!(
        rig.portal.reports(),
        vec![ProvisioningOutcome::Rejected(ProvisioningError::MissingField)]
    );
    assert!(!rig.ctl.restart_pending());
    assert_eq!(rig.ctl.mode(), DeviceMode::Provisioning);
}

#[test]
fn unreachable_network_rejected_within_bound() {
    let mut rig = provisioning_rig(MockActivation::accepting("node-42"));
    rig.portal.submit(SSID, "not-the-password", "tok-1");
    let before = rig.clock.now();
    rig.step();

    let cfg = rig.ctl.config().clone();
    let bound = u64::from(cfg.tick_interval_ms)
        + u64::from(cfg.activation_join_timeout_ms())
        + u64::from(cfg.link_poll_interval_ms);
    assert!(rig.clock.now() - before < bound);

    assert!(rig.activation.tokens().is_empty());
    assert!(rig.sink.events.contains(&AppEvent::ProvisioningRejected(
        ProvisioningError::WifiJoinFailed
    )));
    assert!(!identity::is_complete(&rig.storage));
    assert_eq!(rig.board.restarts, 0);
}

#[test]
fn rejected_token_keeps_node_provisioning_and_allows_retry() {
    let mut rig = provisioning_rig(MockActivation::failing(
        ProvisioningError::ActivationRejected(401),
    ));
    rig.portal.submit(SSID, PASS, "expired");
    rig.step();
    assert!(!identity::is_complete(&rig.storage));
    assert_eq!(
        rig.portal.reports(),
        vec![ProvisioningOutcome::Rejected(
            ProvisioningError::ActivationRejected(401)
        )]
    );

    rig.activation.0.borrow_mut().response = Ok("node-7".into());
    rig.portal.submit(SSID, PASS, "fresh");
    rig.step();
    assert!(identity::is_complete(&rig.storage));
    assert_eq!(
        rig.activation.tokens(),
        vec!["expired".to_string(), "fresh".to_string()]
    );
}

#[test]
fn form_body_from_browser_is_decoded() {
    let form = parse_form("ssid=Clinic+Ward%207&password=p%40ss%26word&token=abc-123");
    assert_eq!(form.ssid, "Clinic Ward 7");
    assert_eq!(form.password, "p@ss&word");
    assert_eq!(form.token, "abc-123");
    assert!(form.validate().is_ok());
}

#[test]
fn idle_portal_does_nothing() {
    let mut rig = provisioning_rig(MockActivation::accepting("node-42"));
    rig.run_for(30_000);
    assert!(rig.portal.reports().is_empty());
    assert_eq!(rig.wifi.begin_calls(), 0);
    assert_eq!(rig.board.restarts, 0);
}
