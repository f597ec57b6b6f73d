//! PIR motion sampler.
//!
//! A PIR module produces garbage for its first minute or two after power-up,
//! so readings are ignored until a stabilization window has passed.  After
//! that the sampler is armed for the life of the process:
//!
//! - a rising edge latches motion until the next publish reads it,
//! - while the output is high the indicator hold deadline keeps moving out,
//! - the indicator goes dark once `now >= deadline`.
//!
//! `sample_tick` must run every control tick, not only at publish time, or
//! short pulses between publishes are lost.

use log::{debug, info};

/// Stabilization progress is logged at this period.
const PROGRESS_LOG_MS: u64 = 10_000;
/// "Still watching" heartbeat while armed and idle.
const IDLE_HEARTBEAT_MS: u64 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PirPhase {
    Stabilizing,
    Armed,
}

/// Temporal state of the PIR sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PirState {
    pub phase: PirPhase,
    pub init_ms: u64,
    pub motion_latched: bool,
    pub last_motion_ms: Option<u64>,
    pub led_on: bool,
    pub led_off_deadline_ms: u64,
    /// Level seen on the previous armed tick; edges are relative to this.
    last_level: bool,
    /// Set on the Stabilizing → Armed transition, cleared when taken.
    ready_pending: bool,
    last_progress_log_ms: u64,
    /// Last "armed, no motion" log; only advances while nothing is latched.
    pub last_heartbeat_ms: u64,
}

pub struct MotionSampler {
    state: PirState,
    stabilization_ms: u64,
    led_hold_ms: u64,
}

impl MotionSampler {
    pub fn new(now_ms: u64, stabilization_ms: u32, led_hold_ms: u32) -> Self {
        info!(
            "PIR: stabilizing for {} s before trusting motion",
            stabilization_ms / 1000
        );
        Self {
            state: PirState {
                phase: PirPhase::Stabilizing,
                init_ms: now_ms,
                motion_latched: false,
                last_motion_ms: None,
                led_on: false,
                led_off_deadline_ms: 0,
                last_level: false,
                ready_pending: false,
                last_progress_log_ms: now_ms,
                last_heartbeat_ms: now_ms,
            },
            stabilization_ms: u64::from(stabilization_ms),
            led_hold_ms: u64::from(led_hold_ms),
        }
    }

    /// Advance the state machine with the current PIR output `level`.
    pub fn tick(&mut self, level: bool, now_ms: u64) {
        let s = &mut self.state;

        if s.phase == PirPhase::Stabilizing {
            let elapsed = now_ms.saturating_sub(s.init_ms);
            if elapsed < self.stabilization_ms {
                if now_ms.saturating_sub(s.last_progress_log_ms) >= PROGRESS_LOG_MS {
                    s.last_progress_log_ms = now_ms;
                    info!(
                        "PIR: stabilizing, {} s remaining",
                        (self.stabilization_ms - elapsed) / 1000
                    );
                }
                return;
            }
            s.phase = PirPhase::Armed;
            s.ready_pending = true;
            s.last_heartbeat_ms = now_ms;
            info!("PIR: armed after {} ms", elapsed);
        }

        if level && !s.last_level {
            s.motion_latched = true;
            s.last_motion_ms = Some(now_ms);
            info!("PIR: motion detected");
        }

        if level {
            s.led_on = true;
            s.led_off_deadline_ms = now_ms + self.led_hold_ms;
        }

        if s.led_on && now_ms >= s.led_off_deadline_ms {
            s.led_on = false;
            debug!("PIR: indicator hold expired");
        }

        if !s.motion_latched && now_ms.saturating_sub(s.last_heartbeat_ms) >= IDLE_HEARTBEAT_MS {
            s.last_heartbeat_ms = now_ms;
            info!("PIR: armed, no motion");
        }

        s.last_level = level;
    }

    pub fn is_ready(&self) -> bool {
        self.state.phase == PirPhase::Armed
    }

    /// One-shot: `true` exactly once after arming.
    pub fn take_ready_signal(&mut self) -> bool {
        core::mem::take(&mut self.state.ready_pending)
    }

    /// Read and clear the motion latch.  `None` while stabilizing.
    pub fn take_motion(&mut self) -> Option<bool> {
        if !self.is_ready() {
            return None;
        }
        Some(core::mem::take(&mut self.state.motion_latched))
    }

    /// Whether the motion indicator hold is active.
    pub fn indicator_on(&self) -> bool {
        self.state.led_on
    }

    pub fn state(&self) -> &PirState {
        &self.state
    }
}
