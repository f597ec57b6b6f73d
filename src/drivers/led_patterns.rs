//! Indicator pattern engine with priority-based layer selection.
//!
//! Generates the on/off state of the single status LED.  The controller
//! calls `tick()` each control cycle and feeds the result to
//! [`IndicatorPort::set_indicator`](crate::app::ports::IndicatorPort).
//!
//! ## Priority hierarchy (highest first)
//!
//! 1. **Attention**: finite sequences (PIR ready: three 200 ms blinks)
//! 2. **Activity**: solid while the PIR motion hold is active
//! 3. **Mode**: slow blink while provisioning, off when operational
//!
//! ## Pattern types
//!
//! | Pattern      | Description                      | Rate    |
//! |-------------|----------------------------------|---------|
//! | Solid        | Constant on                      | -       |
//! | SlowBlink    | 500 ms on / 500 ms off           | 1 Hz    |
//! | TripleBlink  | Three 200 ms flashes, then done  | one-shot|
//! | Off          | Constant off                     | -       |

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternId {
    Solid,
    SlowBlink,
    TripleBlink,
    Off,
}

/// Length of one TripleBlink flash and of the gap after it.
pub const READY_BLINK_MS: u64 = 200;
const READY_BLINK_COUNT: u64 = 3;

#[derive(Debug, Clone, Copy)]
struct PatternRequest {
    pattern: PatternId,
    priority: u8,
    started_ms: u64,
}

/// Indicator pattern engine. Stack-allocated, no heap.
pub struct IndicatorEngine {
    active: Option<PatternRequest>,
    attention: Option<PatternRequest>,
    activity: Option<PatternRequest>,
    mode: Option<PatternRequest>,
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatorEngine {
    pub fn new() -> Self {
        Self {
            active: None,
            attention: None,
            activity: None,
            mode: None,
        }
    }

    /// Set the mode-layer pattern (priority 3, lowest).
    pub fn set_mode_pattern(&mut self, pattern: PatternId, now_ms: u64) {
        if self.mode.map(|r| r.pattern) != Some(pattern) {
            self.mode = Some(PatternRequest {
                pattern,
                priority: 3,
                started_ms: now_ms,
            });
        }
    }

    /// Turn the activity layer on or off (priority 2).
    pub fn set_activity(&mut self, on: bool, now_ms: u64) {
        match (on, self.activity.is_some()) {
            (true, false) => {
                self.activity = Some(PatternRequest {
                    pattern: PatternId::Solid,
                    priority: 2,
                    started_ms: now_ms,
                });
            }
            (false, true) => self.activity = None,
            _ => {}
        }
    }

    /// Start the "sensor ready" triple blink (priority 1, highest).
    pub fn pulse_ready(&mut self, now_ms: u64) {
        self.attention = Some(PatternRequest {
            pattern: PatternId::TripleBlink,
            priority: 1,
            started_ms: now_ms,
        });
    }

    /// Evaluate the winning layer at `now_ms`.
    pub fn tick(&mut self, now_ms: u64) -> bool {
        if let Some(req) = self.attention {
            if Self::expired(req, now_ms) {
                self.attention = None;
            }
        }

        self.active = self.attention.or(self.activity).or(self.mode);

        match self.active {
            Some(req) => Self::generate(req.pattern, now_ms.saturating_sub(req.started_ms)),
            None => false,
        }
    }

    /// Priority of the layer that won the last `tick`, if any.
    pub fn active_priority(&self) -> Option<u8> {
        self.active.map(|r| r.priority)
    }

    fn expired(req: PatternRequest, now_ms: u64) -> bool {
        req.pattern == PatternId::TripleBlink
            && now_ms.saturating_sub(req.started_ms) >= 2 * READY_BLINK_MS * READY_BLINK_COUNT
    }

    fn generate(pattern: PatternId, phase_ms: u64) -> bool {
        match pattern {
            PatternId::Solid => true,
            PatternId::Off => false,
            PatternId::SlowBlink => (phase_ms % 1000) < 500,
            PatternId::TripleBlink => (phase_ms % (2 * READY_BLINK_MS)) < READY_BLINK_MS,
        }
    }
}
