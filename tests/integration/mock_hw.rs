//! Mock adapters for integration tests.
//!
//! Links, activation and the portal are moved into the controller, so their
//! state lives behind `Rc<RefCell<..>>` handles the test keeps a clone of.
//! Board, storage and sink are passed by `&mut` on every call and are
//! plain structs.  All time comes from [`VirtualClock`]; `delay_ms` only
//! advances it.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use clinicnode::app::controller::ModeController;
use clinicnode::app::events::AppEvent;
use clinicnode::app::ports::{
    ActivationPort, ButtonPort, ClimateSample, EventSink, IndicatorPort, MessagingPort,
    ProvisioningSurface, SensorPort, StorageError, StoragePort, SystemPort, TimePort, WifiPort,
};
use clinicnode::app::provisioning::{ProvisioningForm, ProvisioningOutcome};
use clinicnode::config::NodeConfig;
use clinicnode::connectivity::ConnectivityManager;
use clinicnode::error::{CommsError, ProvisioningError};
use clinicnode::identity::{DeviceId, DeviceIdentity, SensorType};

/// 2024-01-01T00:00:00Z
pub const BOOT_UNIX_SECS: i64 = 1_704_067_200;

// ── VirtualClock ──────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct VirtualClock(Rc<Cell<u64>>);

#[allow(dead_code)]
impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> u64 {
        self.0.get()
    }

    pub fn advance(&self, ms: u64) {
        self.0.set(self.0.get() + ms);
    }
}

impl TimePort for VirtualClock {
    fn uptime_ms(&self) -> u64 {
        self.0.get()
    }

    fn unix_secs(&self) -> i64 {
        BOOT_UNIX_SECS + (self.0.get() / 1000) as i64
    }

    fn delay_ms(&mut self, ms: u32) {
        self.advance(u64::from(ms));
    }
}

// ── MockBoard ─────────────────────────────────────────────────

pub struct MockBoard {
    pub climate: Option<ClimateSample>,
    /// `None` simulates a failed ADC conversion.
    pub gas_raw: Option<u16>,
    pub motion: bool,
    pub button: bool,
    pub indicator: bool,
    pub restarts: u32,
}

impl Default for MockBoard {
    fn default() -> Self {
        Self {
            climate: None,
            gas_raw: Some(0),
            motion: false,
            button: false,
            indicator: false,
            restarts: 0,
        }
    }
}

#[allow(dead_code)]
impl MockBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_climate(temperature_c: f32, humidity_pct: f32) -> Self {
        Self {
            climate: Some(ClimateSample {
                temperature_c,
                humidity_pct,
            }),
            ..Self::default()
        }
    }
}

impl SensorPort for MockBoard {
    fn read_climate(&mut self) -> ClimateSample {
        self.climate.unwrap_or(ClimateSample::FAILED)
    }

    fn read_gas_raw(&mut self) -> Option<u16> {
        self.gas_raw
    }

    fn read_motion(&mut self) -> bool {
        self.motion
    }
}

impl ButtonPort for MockBoard {
    fn is_reset_pressed(&mut self) -> bool {
        self.button
    }
}

impl IndicatorPort for MockBoard {
    fn set_indicator(&mut self, on: bool) {
        self.indicator = on;
    }
}

impl SystemPort for MockBoard {
    fn restart(&mut self) {
        self.restarts += 1;
    }
}

// ── MemStorage ────────────────────────────────────────────────

#[derive(Default)]
pub struct MemStorage {
    data: HashMap<(String, String), Vec<u8>>,
    pub erases: u32,
}

#[allow(dead_code)]
impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage holding a complete identity.
    pub fn provisioned(ssid: &str, password: &str, device_id: &str, sensor: SensorType) -> Self {
        let mut s = Self::new();
        let identity = DeviceIdentity::new(ssid, password, device_id, sensor).unwrap();
        clinicnode::identity::save(&mut s, &identity).unwrap();
        s
    }

    pub fn put(&mut self, namespace: &str, key: &str, value: &str) {
        self.data
            .insert((namespace.into(), key.into()), value.as_bytes().to_vec());
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl StoragePort for MemStorage {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let v = self
            .data
            .get(&(namespace.to_string(), key.to_string()))
            .ok_or(StorageError::NotFound)?;
        if v.len() > buf.len() {
            return Err(StorageError::Full);
        }
        buf[..v.len()].copy_from_slice(v);
        Ok(v.len())
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.data
            .insert((namespace.into(), key.into()), data.to_vec());
        Ok(())
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        self.data
            .contains_key(&(namespace.to_string(), key.to_string()))
    }

    fn erase_namespace(&mut self, namespace: &str) -> Result<(), StorageError> {
        self.erases += 1;
        self.data.retain(|(ns, _), _| ns != namespace);
        Ok(())
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── MockWifi ──────────────────────────────────────────────────

#[derive(Default)]
pub struct WifiSim {
    /// The only network in range.
    pub network: Option<(String, String)>,
    pub requested: Option<(String, String)>,
    /// Simulated association loss.
    pub dropped: bool,
    pub begin_calls: u32,
    pub access_point: Option<String>,
}

#[derive(Clone, Default)]
pub struct MockWifi(pub Rc<RefCell<WifiSim>>);

#[allow(dead_code)]
impl MockWifi {
    pub fn with_network(ssid: &str, password: &str) -> Self {
        let w = Self::default();
        w.0.borrow_mut().network = Some((ssid.into(), password.into()));
        w
    }

    pub fn drop_link(&self) {
        self.0.borrow_mut().dropped = true;
    }

    pub fn begin_calls(&self) -> u32 {
        self.0.borrow().begin_calls
    }
}

impl WifiPort for MockWifi {
    fn begin(&mut self, ssid: &str, password: &str) -> Result<(), CommsError> {
        let mut s = self.0.borrow_mut();
        s.begin_calls += 1;
        s.requested = Some((ssid.into(), password.into()));
        s.dropped = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        let s = self.0.borrow();
        !s.dropped && s.requested.is_some() && s.requested == s.network
    }

    fn start_access_point(&mut self, ssid: &str, _password: &str) -> Result<(), CommsError> {
        self.0.borrow_mut().access_point = Some(ssid.into());
        Ok(())
    }
}

// ── MockBroker ────────────────────────────────────────────────

pub struct BrokerSim {
    pub up: bool,
    pub connected: bool,
    pub client_id: Option<String>,
    pub connect_calls: u32,
    pub service_calls: u32,
    pub published: Vec<(String, String)>,
}

impl Default for BrokerSim {
    fn default() -> Self {
        Self {
            up: true,
            connected: false,
            client_id: None,
            connect_calls: 0,
            service_calls: 0,
            published: Vec::new(),
        }
    }
}

#[derive(Clone, Default)]
pub struct MockBroker(pub Rc<RefCell<BrokerSim>>);

#[allow(dead_code)]
impl MockBroker {
    pub fn set_up(&self, up: bool) {
        let mut s = self.0.borrow_mut();
        s.up = up;
        if !up {
            s.connected = false;
        }
    }

    pub fn published(&self) -> Vec<(String, String)> {
        self.0.borrow().published.clone()
    }

    pub fn connect_calls(&self) -> u32 {
        self.0.borrow().connect_calls
    }
}

impl MessagingPort for MockBroker {
    fn connect(&mut self, client_id: &str, _username: &str, _password: &str) -> Result<(), CommsError> {
        let mut s = self.0.borrow_mut();
        s.connect_calls += 1;
        if !s.up {
            return Err(CommsError::MessagingConnectFailed);
        }
        s.client_id = Some(client_id.into());
        s.connected = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.0.borrow().connected
    }

    fn service(&mut self) {
        self.0.borrow_mut().service_calls += 1;
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
        let mut s = self.0.borrow_mut();
        if !s.connected {
            return Err(CommsError::MessagingNotConnected);
        }
        s.published
            .push((topic.into(), String::from_utf8_lossy(payload).into_owned()));
        Ok(())
    }
}

// ── MockActivation ────────────────────────────────────────────

pub struct ActivationSim {
    pub response: Result<String, ProvisioningError>,
    pub tokens: Vec<String>,
}

#[derive(Clone)]
pub struct MockActivation(pub Rc<RefCell<ActivationSim>>);

#[allow(dead_code)]
impl MockActivation {
    pub fn accepting(device_id: &str) -> Self {
        Self(Rc::new(RefCell::new(ActivationSim {
            response: Ok(device_id.into()),
            tokens: Vec::new(),
        })))
    }

    pub fn failing(e: ProvisioningError) -> Self {
        Self(Rc::new(RefCell::new(ActivationSim {
            response: Err(e),
            tokens: Vec::new(),
        })))
    }

    pub fn tokens(&self) -> Vec<String> {
        self.0.borrow().tokens.clone()
    }
}

impl ActivationPort for MockActivation {
    fn activate(&mut self, token: &str) -> Result<DeviceId, ProvisioningError> {
        let mut s = self.0.borrow_mut();
        s.tokens.push(token.into());
        let id = s.response.clone()?;
        DeviceId::try_from(id.as_str()).map_err(|()| ProvisioningError::ActivationMalformed)
    }
}

// ── MockPortal ────────────────────────────────────────────────

#[derive(Default)]
pub struct PortalSim {
    pub started: bool,
    pub pending: Option<ProvisioningForm>,
    pub reports: Vec<ProvisioningOutcome>,
}

#[derive(Clone, Default)]
pub struct MockPortal(pub Rc<RefCell<PortalSim>>);

#[allow(dead_code)]
impl MockPortal {
    pub fn submit(&self, ssid: &str, password: &str, token: &str) {
        self.0.borrow_mut().pending = Some(ProvisioningForm {
            ssid: ssid.into(),
            password: password.into(),
            token: token.into(),
        });
    }

    pub fn reports(&self) -> Vec<ProvisioningOutcome> {
        self.0.borrow().reports.clone()
    }
}

impl ProvisioningSurface for MockPortal {
    fn start(&mut self) -> Result<(), CommsError> {
        self.0.borrow_mut().started = true;
        Ok(())
    }

    fn poll_submission(&mut self) -> Option<ProvisioningForm> {
        self.0.borrow_mut().pending.take()
    }

    fn report(&mut self, outcome: &ProvisioningOutcome) {
        self.0.borrow_mut().reports.push(outcome.clone());
    }
}

// ── Rig ───────────────────────────────────────────────────────

pub type TestController = ModeController<MockWifi, MockBroker, MockActivation, MockPortal, VirtualClock>;

/// Controller plus handles to every mock it owns.
pub struct Rig {
    pub ctl: TestController,
    pub wifi: MockWifi,
    pub broker: MockBroker,
    pub activation: MockActivation,
    pub portal: MockPortal,
    pub clock: VirtualClock,
    pub board: MockBoard,
    pub storage: MemStorage,
    pub sink: RecordingSink,
}

/// Short timings so tests stay readable.
pub fn test_config() -> NodeConfig {
    NodeConfig {
        wifi_timeout_ms: 2_000,
        messaging_timeout_ms: 1_000,
        link_poll_interval_ms: 500,
        activation_join_attempts: 4,
        sample_interval_ms: 10_000,
        tick_interval_ms: 100,
        pir_stabilization_ms: 5_000,
        pir_led_hold_ms: 1_000,
        reset_hold_ms: 5_000,
        restart_grace_ms: 3_000,
        ..NodeConfig::default()
    }
}

#[allow(dead_code)]
impl Rig {
    pub fn new(wifi: MockWifi, activation: MockActivation, storage: MemStorage, board: MockBoard) -> Self {
        Self::with_config(test_config(), wifi, activation, storage, board)
    }

    pub fn with_config(
        config: NodeConfig,
        wifi: MockWifi,
        activation: MockActivation,
        storage: MemStorage,
        board: MockBoard,
    ) -> Self {
        let broker = MockBroker::default();
        let portal = MockPortal::default();
        let clock = VirtualClock::new();
        let links = ConnectivityManager::new(wifi.clone(), broker.clone(), &config);
        let ctl = ModeController::new(
            config,
            links,
            activation.clone(),
            portal.clone(),
            clock.clone(),
            "Clinica-Setup-DEADBEEFCAFE",
        );
        Self {
            ctl,
            wifi,
            broker,
            activation,
            portal,
            clock,
            board,
            storage,
            sink: RecordingSink::new(),
        }
    }

    /// Load the stored identity and boot, as `main` does.
    pub fn boot(&mut self) -> clinicnode::identity::DeviceMode {
        let stored =
            clinicnode::identity::load(&self.storage, self.ctl.config().default_sensor_type).unwrap();
        self.ctl
            .boot(stored, &mut self.board, &mut self.storage, &mut self.sink)
    }

    /// Advance one tick interval, then tick.
    pub fn step(&mut self) {
        self.clock.advance(u64::from(self.ctl.config().tick_interval_ms));
        self.ctl
            .tick(&mut self.board, &mut self.storage, &mut self.sink);
    }

    pub fn run_for(&mut self, ms: u64) {
        let end = self.clock.now() + ms;
        while self.clock.now() < end {
            self.step();
        }
    }
}
