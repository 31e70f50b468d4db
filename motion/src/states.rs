// State enums for the motion controller.

use std::time::{Duration, Instant};

/// Endstop debounce lock.
///
/// - Unlocked: reaching the endstop recalibrates the position
/// - Locked: a target was set while resting on the endstop, recalibration is suppressed
/// - ReleasePending: the switch let go, the lock clears once `deadline` passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Debounce {
    #[default]
    Unlocked,
    Locked,
    ReleasePending { deadline: Instant },
}

impl Debounce {
    pub fn is_locked(&self) -> bool {
        !matches!(self, Debounce::Unlocked)
    }

    /// Capture the endstop when a new target is applied.
    ///
    /// Setting a target on the endstop (re)locks. Off the endstop, a held lock
    /// starts its settle window and a running window is left alone.
    pub fn on_target_set(self, endstop_triggered: bool, now: Instant, settle: Duration) -> Self {
        match (self, endstop_triggered) {
            (_, true) => Debounce::Locked,
            (Debounce::Locked, false) => Debounce::ReleasePending {
                deadline: now + settle,
            },
            (state, false) => state,
        }
    }

    /// Advance once per tick.
    ///
    /// The release deadline is not re-sampled: it clears the lock even if the
    /// switch is pressed again by then.
    pub fn on_tick(self, endstop_triggered: bool, now: Instant, settle: Duration) -> Self {
        match self {
            Debounce::ReleasePending { deadline } if now >= deadline => Debounce::Unlocked,
            Debounce::Locked if !endstop_triggered => Debounce::ReleasePending {
                deadline: now + settle,
            },
            state => state,
        }
    }
}

/// Direction of travel as the coordinator sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Increasing,
    Decreasing,
    Stopped,
}

impl Movement {
    pub fn between(current_steps: u32, target_steps: u32) -> Self {
        if target_steps > current_steps {
            Movement::Increasing
        } else if target_steps < current_steps {
            Movement::Decreasing
        } else {
            Movement::Stopped
        }
    }
}
