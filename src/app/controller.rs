//! Mode controller: the hexagonal core.
//!
//! [`ModeController`] owns the link manager, the sampler, the reset button
//! and the indicator engine.  All I/O flows through port traits, either
//! owned (links, activation, portal, clock) or injected at call sites
//! (board, storage, event sink), making the whole controller testable with
//! mock adapters.
//!
//! ```text
//!   BoardPort ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                 │        ModeController        │
//! StoragePort ◀──▶│ mode · links · sampler · btn │ ◀──▶ Wifi / Messaging
//!                 └──────────────────────────────┘
//! ```
//!
//! The mode is chosen once in [`boot`](ModeController::boot) and never
//! changes in-process.  Going back to provisioning always goes through
//! [`enter_provisioning_destructive`](ModeController::enter_provisioning_destructive):
//! erase the identity, then restart.

use log::{error, info, warn};

use crate::config::NodeConfig;
use crate::connectivity::{ConnectivityManager, Link, LinkState};
use crate::drivers::button::{ButtonEvent, ResetButton};
use crate::drivers::led_patterns::{IndicatorEngine, PatternId};
use crate::identity::{self, DeviceIdentity, DeviceMode};
use crate::sensors::SensorSampler;

use super::events::{AppEvent, ResetReason, SkipReason};
use super::ports::{
    ActivationPort, BoardPort, EventSink, MessagingPort, ProvisioningSurface, StoragePort,
    TimePort, WifiPort,
};
use super::provisioning::{self, ProvisioningOutcome};

// ───────────────────────────────────────────────────────────────
// ModeController
// ───────────────────────────────────────────────────────────────

pub struct ModeController<W, M, A, P, T> {
    config: NodeConfig,
    mode: DeviceMode,
    identity: Option<DeviceIdentity>,
    links: ConnectivityManager<W, M>,
    activation: A,
    portal: P,
    clock: T,
    sampler: Option<SensorSampler>,
    button: ResetButton,
    indicator: IndicatorEngine,
    /// SSID of the provisioning access point.
    ap_ssid: String,
    /// `{root}/{deviceId}/sensors`, set at operational boot.
    topic: String,
    last_sample_ms: u64,
    /// Provisioning succeeded; restart once uptime reaches this.
    restart_at_ms: Option<u64>,
    /// A restart was requested.  Nothing runs after this.
    halted: bool,
}

impl<W, M, A, P, T> ModeController<W, M, A, P, T>
where
    W: WifiPort,
    M: MessagingPort,
    A: ActivationPort,
    P: ProvisioningSurface,
    T: TimePort,
{
    /// Construct the controller.  Does **not** touch any link: call
    /// [`boot`](Self::boot) next.
    pub fn new(
        config: NodeConfig,
        links: ConnectivityManager<W, M>,
        activation: A,
        portal: P,
        clock: T,
        ap_ssid: &str,
    ) -> Self {
        let button = ResetButton::new(config.reset_hold_ms);
        Self {
            config,
            mode: DeviceMode::Provisioning,
            identity: None,
            links,
            activation,
            portal,
            clock,
            sampler: None,
            button,
            indicator: IndicatorEngine::new(),
            ap_ssid: ap_ssid.into(),
            topic: String::new(),
            last_sample_ms: 0,
            restart_at_ms: None,
            halted: false,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Select the mode from the stored identity and bring it up.
    ///
    /// Operational boot blocks for the wireless join and the first broker
    /// connect.  A failed wireless join here is fatal: the identity is
    /// erased and the node restarts into provisioning.
    pub fn boot(
        &mut self,
        identity: Option<DeviceIdentity>,
        board: &mut impl BoardPort,
        storage: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) -> DeviceMode {
        let now = self.clock.uptime_ms();
        match identity {
            None => {
                self.mode = DeviceMode::Provisioning;
                info!("Boot: no identity, entering provisioning");
                if let Err(e) = self
                    .links
                    .start_access_point(&self.ap_ssid, &self.config.ap_password)
                {
                    error!("Boot: access point failed: {}", e);
                }
                if let Err(e) = self.portal.start() {
                    error!("Boot: provisioning surface failed: {}", e);
                }
                self.indicator.set_mode_pattern(PatternId::SlowBlink, now);
                sink.emit(&AppEvent::Booted(DeviceMode::Provisioning));
            }
            Some(identity) => {
                self.mode = DeviceMode::Operational;
                info!(
                    "Boot: identity {} present, entering operational",
                    identity.device_id
                );
                self.indicator.set_mode_pattern(PatternId::Off, now);

                let wireless = self.links.connect_wireless(&identity, &mut self.clock);
                sink.emit(&AppEvent::LinkChanged {
                    link: Link::Wireless,
                    state: wireless,
                });
                self.identity = Some(identity);
                if wireless != LinkState::Connected {
                    error!("Boot: stored network unreachable, resetting to provisioning");
                    self.enter_provisioning_destructive(
                        ResetReason::BootstrapWifiFailed,
                        board,
                        storage,
                        sink,
                    );
                    return self.mode;
                }

                if let Some(identity) = self.identity.as_ref() {
                    let messaging = self.links.connect_messaging(identity, &mut self.clock);
                    sink.emit(&AppEvent::LinkChanged {
                        link: Link::Messaging,
                        state: messaging,
                    });
                    self.topic = format!(
                        "{}/{}/sensors",
                        self.config.topic_root, identity.device_id
                    );
                    let now = self.clock.uptime_ms();
                    self.sampler = Some(SensorSampler::init(identity.sensor_type, now, &self.config));
                    self.last_sample_ms = now;
                    info!("Boot: publishing to '{}'", self.topic);
                }
                sink.emit(&AppEvent::Booted(DeviceMode::Operational));
            }
        }
        self.mode
    }

    /// Run one control cycle: reset button first, then the mode handler,
    /// then the indicator.
    pub fn tick(
        &mut self,
        board: &mut impl BoardPort,
        storage: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        if self.halted {
            return;
        }

        let now = self.clock.uptime_ms();
        match self.button.tick(board.is_reset_pressed(), now) {
            Some(ButtonEvent::ResetHeld) => {
                self.on_reset_held(board, storage, sink);
                return;
            }
            Some(ButtonEvent::Pressed) => info!("Button: pressed"),
            Some(ButtonEvent::Released { held_ms }) => info!("Button: released after {} ms", held_ms),
            None => {}
        }

        match self.mode {
            DeviceMode::Provisioning => self.provisioning_tick(board, storage, sink),
            DeviceMode::Operational => self.operational_tick(board, sink),
        }

        if !self.halted {
            let now = self.clock.uptime_ms();
            board.set_indicator(self.indicator.tick(now));
        }
    }

    /// Reset button held past the threshold.
    pub fn on_reset_held(
        &mut self,
        board: &mut impl BoardPort,
        storage: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        self.enter_provisioning_destructive(ResetReason::ButtonHeld, board, storage, sink);
    }

    /// Erase the stored identity, then restart.  Irreversible.  The erase is
    /// committed before the restart is requested; an erase failure is logged
    /// and the restart still happens.
    pub fn enter_provisioning_destructive(
        &mut self,
        reason: ResetReason,
        board: &mut impl BoardPort,
        storage: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        warn!("Reset: {:?}, erasing identity", reason);
        sink.emit(&AppEvent::ResetTriggered(reason));
        if let Err(e) = identity::erase(storage) {
            error!("Reset: erase failed: {}", e);
        }
        self.restart(board, sink);
    }

    fn restart(&mut self, board: &mut impl BoardPort, sink: &mut impl EventSink) {
        info!("Restarting");
        sink.emit(&AppEvent::Restarting);
        self.halted = true;
        board.set_indicator(false);
        board.restart();
    }

    // ── Mode handlers ─────────────────────────────────────────

    fn provisioning_tick(
        &mut self,
        board: &mut impl BoardPort,
        storage: &mut impl StoragePort,
        sink: &mut impl EventSink,
    ) {
        if let Some(at) = self.restart_at_ms {
            if self.clock.uptime_ms() >= at {
                self.restart(board, sink);
            }
            return;
        }

        let Some(form) = self.portal.poll_submission() else {
            return;
        };

        match provisioning::submit(
            &form,
            &mut self.links,
            &mut self.activation,
            storage,
            &mut self.clock,
            &self.config,
        ) {
            Ok(identity) => {
                self.portal.report(&ProvisioningOutcome::Activated {
                    device_id: identity.device_id,
                });
                sink.emit(&AppEvent::Provisioned);
                let now = self.clock.uptime_ms();
                self.restart_at_ms = Some(now + u64::from(self.config.restart_grace_ms));
                self.indicator.set_mode_pattern(PatternId::Solid, now);
            }
            Err(e) => {
                warn!("Provisioning: rejected: {}", e);
                self.portal.report(&ProvisioningOutcome::Rejected(e));
                sink.emit(&AppEvent::ProvisioningRejected(e));
            }
        }
    }

    fn operational_tick(&mut self, board: &mut impl BoardPort, sink: &mut impl EventSink) {
        // (a) broker session
        if let Some(identity) = self.identity.as_ref() {
            if !self.links.is_messaging_connected() {
                let state = self.links.connect_messaging(identity, &mut self.clock);
                sink.emit(&AppEvent::LinkChanged {
                    link: Link::Messaging,
                    state,
                });
            }
        }

        // (b) keep-alive
        self.links.service_messaging();

        // (c) sampling
        let now = self.clock.uptime_ms();
        if let Some(sampler) = self.sampler.as_mut() {
            sampler.sample_tick(board, now);
            if sampler.take_ready_signal() {
                sink.emit(&AppEvent::SensorReady);
                self.indicator.pulse_ready(now);
            }
            self.indicator.set_activity(sampler.indicator_on(), now);
        }
        if now.saturating_sub(self.last_sample_ms) >= u64::from(self.config.sample_interval_ms) {
            self.last_sample_ms = now;
            self.sample_and_publish(board, sink);
        }

        // (d) wireless
        if let Some(identity) = self.identity.as_ref() {
            if !self.links.is_wireless_connected() {
                let state = self.links.connect_wireless(identity, &mut self.clock);
                sink.emit(&AppEvent::LinkChanged {
                    link: Link::Wireless,
                    state,
                });
            }
        }
    }

    fn sample_and_publish(&mut self, board: &mut impl BoardPort, sink: &mut impl EventSink) {
        let Some(sampler) = self.sampler.as_mut() else {
            return;
        };
        let Some(payload) = sampler.read_and_format(board, self.clock.unix_secs()) else {
            sink.emit(&AppEvent::SampleSkipped(SkipReason::NoReading));
            return;
        };
        let body = match payload.to_json() {
            Ok(body) => body,
            Err(e) => {
                error!("Publish: encode failed: {}", e);
                sink.emit(&AppEvent::SampleSkipped(SkipReason::Encode));
                return;
            }
        };
        match self.links.publish(&self.topic, &body) {
            Ok(()) => {
                info!("Publish: {} bytes to '{}'", body.len(), self.topic);
                sink.emit(&AppEvent::Published {
                    sensor_type: payload.sensor_type,
                    readings: payload.readings.len(),
                });
            }
            Err(e) => {
                warn!("Publish: failed: {}", e);
                sink.emit(&AppEvent::SampleSkipped(SkipReason::Publish(e)));
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn mode(&self) -> DeviceMode {
        self.mode
    }

    pub fn identity(&self) -> Option<&DeviceIdentity> {
        self.identity.as_ref()
    }

    /// `true` once a restart has been requested.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn restart_pending(&self) -> bool {
        self.restart_at_ms.is_some()
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn links(&self) -> &ConnectivityManager<W, M> {
        &self.links
    }

    pub fn sampler(&self) -> Option<&SensorSampler> {
        self.sampler.as_ref()
    }

    pub fn portal(&self) -> &P {
        &self.portal
    }

    pub fn clock(&self) -> &T {
        &self.clock
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }
}
