//! Reset button hold detector.
//!
//! ## Hardware
//!
//! Active-low momentary switch (the BOOT button) with pull-up.  The level is
//! sampled once per control tick; there is no ISR.  A tick period of 100 ms
//! is far longer than contact bounce, so no extra debounce is applied.
//!
//! ## Behaviour
//!
//! | Input                       | Event        |
//! |-----------------------------|--------------|
//! | released → pressed          | `Pressed`    |
//! | held for `>= hold_ms`       | `ResetHeld` (once per hold) |
//! | pressed → released          | `Released`   |

/// Raw press tracking.  Cleared on release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonPressState {
    pub pressed: bool,
    pub press_start_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Pressed,
    /// Released after `held_ms`.
    Released { held_ms: u64 },
    /// Hold threshold crossed.  Fires at most once per press.
    ResetHeld,
}

pub struct ResetButton {
    state: ButtonPressState,
    hold_ms: u64,
    fired: bool,
}

impl ResetButton {
    pub fn new(hold_ms: u32) -> Self {
        Self {
            state: ButtonPressState::default(),
            hold_ms: u64::from(hold_ms),
            fired: false,
        }
    }

    /// Feed the current level.  Call once per control tick.
    pub fn tick(&mut self, pressed: bool, now_ms: u64) -> Option<ButtonEvent> {
        match (self.state.pressed, pressed) {
            (false, true) => {
                self.state = ButtonPressState {
                    pressed: true,
                    press_start_ms: now_ms,
                };
                self.fired = false;
                Some(ButtonEvent::Pressed)
            }
            (true, true) => {
                let held = now_ms.saturating_sub(self.state.press_start_ms);
                if !self.fired && held >= self.hold_ms {
                    self.fired = true;
                    Some(ButtonEvent::ResetHeld)
                } else {
                    None
                }
            }
            (true, false) => {
                let held_ms = now_ms.saturating_sub(self.state.press_start_ms);
                self.state = ButtonPressState::default();
                self.fired = false;
                Some(ButtonEvent::Released { held_ms })
            }
            (false, false) => None,
        }
    }

    pub fn state(&self) -> ButtonPressState {
        self.state
    }
}
