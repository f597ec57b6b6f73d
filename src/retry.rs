//! Bounded "attempt until condition or deadline" helper.
//!
//! This is the only place the firmware blocks.  While [`poll_until`] runs,
//! nothing else on the tick loop executes: no button sampling, no PIR
//! debounce, no sampling.  Callers choose the bound accordingly.

use crate::app::ports::TimePort;

/// Evaluate `condition` until it returns `true` or `timeout_ms` elapses,
/// sleeping `interval_ms` between evaluations.
///
/// The condition is always evaluated at least once.  Returns `true` if it
/// was met.  The call returns within `timeout_ms + interval_ms` of clock time.
pub fn poll_until<C, F>(clock: &mut C, timeout_ms: u32, interval_ms: u32, mut condition: F) -> bool
where
    C: TimePort + ?Sized,
    F: FnMut() -> bool,
{
    let start = clock.uptime_ms();
    loop {
        if condition() {
            return true;
        }
        if clock.uptime_ms().saturating_sub(start) >= u64::from(timeout_ms) {
            return false;
        }
        clock.delay_ms(interval_ms.max(1));
    }
}
