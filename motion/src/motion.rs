use embedded_hal::digital::{InputPin, OutputPin, PinState};
use protocol::{from_percentage, to_percentage, WireReport};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::config::ActuatorConfig;
use crate::driver::StepOutput;
use crate::states::{Debounce, Movement};

/// Point-in-time view of the controller, taken under the lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub current_steps: u32,
    pub target_steps: u32,
    pub max_steps: u32,
    pub engaged: bool,
    pub debounce: Debounce,
    pub movement: Movement,
}

impl Snapshot {
    pub fn current_pct(&self) -> u8 {
        to_percentage(self.current_steps, self.max_steps)
    }

    pub fn target_pct(&self) -> u8 {
        to_percentage(self.target_steps, self.max_steps)
    }

    pub fn report(&self) -> WireReport {
        WireReport {
            current_pct: self.current_pct(),
            target_pct: self.target_pct(),
        }
    }
}

/// Single-axis step/direction/enable controller with an endstop reference.
///
/// `tick` is meant to run at `step_rate` and moves at most one step per call.
pub struct Motion<S, D, E, N> {
    max_steps: u32,
    reverse_direction: bool,
    enable_active_low: bool,
    endstop_active_low: bool,
    settle: Duration,
    current_steps: u32,
    target_steps: u32,
    debounce: Debounce,
    engaged: bool,
    step: S,
    direction: D,
    enable: E,
    endstop: N,
}

impl<S, D, E, N> Motion<S, D, E, N>
where
    S: StepOutput,
    D: OutputPin,
    E: OutputPin,
    N: InputPin,
{
    /// Take ownership of the driver lines and seed the position estimate.
    ///
    /// Off the endstop the position is unknown, so it is assumed fully
    /// extended. The target starts at 0, which homes the blind until the
    /// first command arrives.
    pub fn new(config: &ActuatorConfig, step: S, direction: D, enable: E, endstop: N) -> Self {
        let mut motion = Motion {
            max_steps: config.max_steps(),
            reverse_direction: config.reverse_direction,
            enable_active_low: config.enable_active_low,
            endstop_active_low: config.endstop_active_low,
            settle: config.endstop_settle(),
            current_steps: 0,
            target_steps: 0,
            debounce: Debounce::Unlocked,
            engaged: true,
            step,
            direction,
            enable,
            endstop,
        };

        if !motion.endstop_triggered() {
            motion.current_steps = motion.max_steps;
        }
        motion.engage(false);

        log::info!(
            "Motion ready: {} steps of travel, starting at {} (endstop {})",
            motion.max_steps,
            motion.current_steps,
            if motion.current_steps == 0 { "pressed" } else { "open" }
        );
        motion
    }

    /// Endstop state after applying the configured polarity. Read errors
    /// count as not triggered.
    pub fn endstop_triggered(&mut self) -> bool {
        let level = if self.endstop_active_low {
            self.endstop.is_low()
        } else {
            self.endstop.is_high()
        };
        level.unwrap_or(false)
    }

    pub fn set_target(&mut self, pct: i32) {
        self.set_target_at(pct, Instant::now());
    }

    /// Clamp and convert `pct`, then capture the endstop into the debounce lock.
    pub fn set_target_at(&mut self, pct: i32, now: Instant) {
        self.target_steps = from_percentage(pct, self.max_steps);
        let triggered = self.endstop_triggered();
        self.debounce = self.debounce.on_target_set(triggered, now, self.settle);
    }

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    /// One control period: debounce, recalibrate, then step toward the target.
    pub fn tick_at(&mut self, now: Instant) {
        let triggered = self.endstop_triggered();
        self.debounce = self.debounce.on_tick(triggered, now, self.settle);

        if triggered && !self.debounce.is_locked() {
            self.current_steps = self.target_steps;
        }

        if self.current_steps > self.target_steps {
            self.current_steps -= 1;
            self.set_direction(false);
        } else if self.current_steps < self.target_steps {
            self.current_steps += 1;
            self.set_direction(true);
        } else {
            self.engage(false);
            return;
        }

        self.engage(true);
        self.step.pulse();
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            current_steps: self.current_steps,
            target_steps: self.target_steps,
            max_steps: self.max_steps,
            engaged: self.engaged,
            debounce: self.debounce,
            movement: Movement::between(self.current_steps, self.target_steps),
        }
    }

    pub fn current_steps(&self) -> u32 {
        self.current_steps
    }

    pub fn target_steps(&self) -> u32 {
        self.target_steps
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged
    }

    pub fn debounce(&self) -> Debounce {
        self.debounce
    }

    fn set_direction(&mut self, extend: bool) {
        self.direction
            .set_state(PinState::from(extend != self.reverse_direction))
            .unwrap_or_default();
    }

    fn engage(&mut self, on: bool) {
        if self.engaged == on {
            return;
        }
        self.enable
            .set_state(PinState::from(on != self.enable_active_low))
            .unwrap_or_default();
        self.engaged = on;
    }
}

/// Shared handle to a [`Motion`], cloned into the tick task and the sync loop.
pub struct MotionHandle<S, D, E, N> {
    inner: Arc<Mutex<Motion<S, D, E, N>>>,
}

impl<S, D, E, N> Clone for MotionHandle<S, D, E, N> {
    fn clone(&self) -> Self {
        MotionHandle {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, D, E, N> MotionHandle<S, D, E, N>
where
    S: StepOutput,
    D: OutputPin,
    E: OutputPin,
    N: InputPin,
{
    pub fn new(motion: Motion<S, D, E, N>) -> Self {
        MotionHandle {
            inner: Arc::new(Mutex::new(motion)),
        }
    }

    // A panic while holding the lock leaves plain integers behind, so the
    // state is still usable.
    fn lock(&self) -> MutexGuard<'_, Motion<S, D, E, N>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn tick(&self) {
        self.lock().tick();
    }

    pub fn set_target(&self, pct: i32) {
        self.lock().set_target(pct);
    }

    pub fn snapshot(&self) -> Snapshot {
        self.lock().snapshot()
    }
}
