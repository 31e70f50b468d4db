use embedded_hal::digital::{InputPin, OutputPin};
use log::*;
use motion::{MotionHandle, Snapshot, StepOutput};
use protocol::{WireCommand, WireReport};
use serde::Deserialize;
use std::net::IpAddr;
use std::thread;
use std::time::Duration;

use crate::error::SyncError;

/// Link to the coordinator. `send_receive` must enforce its own timeout.
pub trait Transport {
    fn connect(&mut self) -> Result<IpAddr, SyncError>;
    fn disconnect(&mut self) -> Result<(), SyncError>;
    fn send_receive(&mut self, report: &WireReport) -> Result<WireCommand, SyncError>;
}

/// The side of the motion controller the sync loop is allowed to touch.
pub trait Actuator {
    fn snapshot(&self) -> Snapshot;
    fn set_target(&self, pct: i32);
}

impl<S, D, E, N> Actuator for MotionHandle<S, D, E, N>
where
    S: StepOutput,
    D: OutputPin,
    E: OutputPin,
    N: InputPin,
{
    fn snapshot(&self) -> Snapshot {
        MotionHandle::snapshot(self)
    }

    fn set_target(&self, pct: i32) {
        MotionHandle::set_target(self, pct)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_success_delay")]
    pub success_delay_ms: u64,
    #[serde(default = "default_failure_delay")]
    pub failure_delay_ms: u64,
    /// Reset the network once this many cycles in a row have failed
    #[serde(default = "default_max_failures")]
    pub max_consecutive_failures: u32,
}

fn default_success_delay() -> u64 {
    200
}

fn default_failure_delay() -> u64 {
    1000
}

fn default_max_failures() -> u32 {
    10
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            success_delay_ms: default_success_delay(),
            failure_delay_ms: default_failure_delay(),
            max_consecutive_failures: default_max_failures(),
        }
    }
}

#[derive(Debug)]
pub enum CycleOutcome {
    Synced(WireCommand),
    Failed(SyncError),
    /// The failure that pushed the count over the threshold, after which the
    /// transport was torn down and brought back up.
    Reconnected(SyncError),
}

/// Report/poll loop between the actuator and the coordinator.
pub struct SyncLoop<A, T> {
    actuator: A,
    transport: T,
    config: SyncConfig,
    consecutive_failures: u32,
}

impl<A: Actuator, T: Transport> SyncLoop<A, T> {
    pub fn new(actuator: A, transport: T, config: SyncConfig) -> Self {
        SyncLoop {
            actuator,
            transport,
            config,
            consecutive_failures: 0,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Connect, then cycle forever.
    pub fn run(&mut self) -> ! {
        self.connect();
        loop {
            let outcome = self.cycle();
            thread::sleep(self.delay_after(&outcome));
        }
    }

    /// One report/poll round trip. Never fails; errors are counted instead.
    pub fn cycle(&mut self) -> CycleOutcome {
        let before = self.actuator.snapshot();
        let report = before.report();

        match self.transport.send_receive(&report) {
            Ok(command) => {
                self.actuator.set_target(command.target_pct);
                if self.consecutive_failures > 0 {
                    info!(
                        "Coordinator reachable again after {} failed cycles",
                        self.consecutive_failures
                    );
                }
                self.consecutive_failures = 0;

                let after = self.actuator.snapshot();
                if after.target_steps != before.target_steps {
                    info!(
                        "New target {}% (at {}%, {:?})",
                        after.target_pct(),
                        after.current_pct(),
                        after.movement
                    );
                }
                CycleOutcome::Synced(command)
            }
            Err(e) => {
                self.consecutive_failures += 1;
                warn!(
                    "Failed to sync with coordinator ({} in a row): {}",
                    self.consecutive_failures, e
                );
                if self.consecutive_failures > self.config.max_consecutive_failures {
                    self.reconnect();
                    CycleOutcome::Reconnected(e)
                } else {
                    CycleOutcome::Failed(e)
                }
            }
        }
    }

    pub fn delay_after(&self, outcome: &CycleOutcome) -> Duration {
        match outcome {
            CycleOutcome::Synced(_) => Duration::from_millis(self.config.success_delay_ms),
            CycleOutcome::Failed(_) | CycleOutcome::Reconnected(_) => {
                Duration::from_millis(self.config.failure_delay_ms)
            }
        }
    }

    fn connect(&mut self) {
        match self.transport.connect() {
            Ok(ip) => info!("Network connected; ip = {}", ip),
            // Not fatal: failed cycles will bring us back here
            Err(e) => error!("Network connection failed: {}", e),
        }
    }

    fn reconnect(&mut self) {
        warn!("Reinitializing network...");
        if let Err(e) = self.transport.disconnect() {
            warn!("Network teardown failed: {}", e);
        }
        self.connect();
        self.consecutive_failures = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use motion::{Debounce, Movement};
    use protocol::from_percentage;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::net::Ipv4Addr;

    const MAX_STEPS: u32 = 6900;

    #[derive(Default)]
    struct FakeBlind {
        current_steps: RefCell<u32>,
        target_steps: RefCell<u32>,
        applied: RefCell<Vec<i32>>,
    }

    impl Actuator for &FakeBlind {
        fn snapshot(&self) -> Snapshot {
            let current_steps = *self.current_steps.borrow();
            let target_steps = *self.target_steps.borrow();
            Snapshot {
                current_steps,
                target_steps,
                max_steps: MAX_STEPS,
                engaged: current_steps != target_steps,
                debounce: Debounce::Unlocked,
                movement: Movement::between(current_steps, target_steps),
            }
        }

        fn set_target(&self, pct: i32) {
            self.applied.borrow_mut().push(pct);
            *self.target_steps.borrow_mut() = from_percentage(pct, MAX_STEPS);
        }
    }

    #[derive(Default)]
    struct FakeLink {
        replies: VecDeque<Result<WireCommand, SyncError>>,
        sent: Vec<WireReport>,
        connects: u32,
        disconnects: u32,
        connect_fails: bool,
    }

    impl FakeLink {
        fn replying(replies: impl IntoIterator<Item = Result<WireCommand, SyncError>>) -> Self {
            FakeLink {
                replies: replies.into_iter().collect(),
                ..Default::default()
            }
        }
    }

    impl Transport for FakeLink {
        fn connect(&mut self) -> Result<IpAddr, SyncError> {
            self.connects += 1;
            if self.connect_fails {
                Err(SyncError::Connection("no access point".into()))
            } else {
                Ok(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 50)))
            }
        }

        fn disconnect(&mut self) -> Result<(), SyncError> {
            self.disconnects += 1;
            Ok(())
        }

        fn send_receive(&mut self, report: &WireReport) -> Result<WireCommand, SyncError> {
            self.sent.push(*report);
            self.replies
                .pop_front()
                .unwrap_or_else(|| Err(SyncError::Timeout(Duration::from_secs(5))))
        }
    }

    fn timeout() -> Result<WireCommand, SyncError> {
        Err(SyncError::Timeout(Duration::from_secs(5)))
    }

    fn target(pct: i32) -> Result<WireCommand, SyncError> {
        Ok(WireCommand { target_pct: pct })
    }

    #[test]
    fn test_success_applies_target() {
        let blind = FakeBlind::default();
        *blind.current_steps.borrow_mut() = MAX_STEPS;
        let mut sync = SyncLoop::new(&blind, FakeLink::replying([target(50)]), SyncConfig::default());

        let outcome = sync.cycle();
        assert!(matches!(outcome, CycleOutcome::Synced(WireCommand { target_pct: 50 })));
        assert_eq!(sync.delay_after(&outcome), Duration::from_millis(200));
        assert_eq!(sync.consecutive_failures(), 0);
        assert_eq!(*blind.target_steps.borrow(), 3450);
        assert_eq!(
            sync.transport().sent,
            vec![WireReport {
                current_pct: 100,
                target_pct: 0
            }]
        );
    }

    #[test]
    fn test_out_of_range_target_is_passed_for_clamping() {
        let blind = FakeBlind::default();
        let mut sync = SyncLoop::new(&blind, FakeLink::replying([target(150)]), SyncConfig::default());
        sync.cycle();
        assert_eq!(*blind.applied.borrow(), vec![150]);
        assert_eq!(*blind.target_steps.borrow(), MAX_STEPS);
    }

    #[test]
    fn test_three_failures_back_off_without_reconnect() {
        let blind = FakeBlind::default();
        let link = FakeLink::replying([
            timeout(),
            Err(SyncError::Status(500)),
            Err(SyncError::Connection("refused".into())),
        ]);
        let mut sync = SyncLoop::new(&blind, link, SyncConfig::default());

        for _ in 0..3 {
            let outcome = sync.cycle();
            assert!(matches!(outcome, CycleOutcome::Failed(_)));
            assert_eq!(sync.delay_after(&outcome), Duration::from_millis(1000));
        }
        assert_eq!(sync.consecutive_failures(), 3);
        assert_eq!(sync.transport().connects, 0);
        assert_eq!(sync.transport().disconnects, 0);
        assert!(blind.applied.borrow().is_empty());
    }

    #[test]
    fn test_eleventh_failure_reconnects() {
        let blind = FakeBlind::default();
        let mut sync = SyncLoop::new(&blind, FakeLink::default(), SyncConfig::default());

        for _ in 0..10 {
            assert!(matches!(sync.cycle(), CycleOutcome::Failed(_)));
        }
        assert_eq!(sync.consecutive_failures(), 10);
        assert_eq!(sync.transport().connects, 0);

        let outcome = sync.cycle();
        assert!(matches!(outcome, CycleOutcome::Reconnected(SyncError::Timeout(_))));
        assert_eq!(sync.delay_after(&outcome), Duration::from_millis(1000));
        assert_eq!(sync.consecutive_failures(), 0);
        assert_eq!(sync.transport().disconnects, 1);
        assert_eq!(sync.transport().connects, 1);
    }

    #[test]
    fn test_success_resets_failure_count() {
        let blind = FakeBlind::default();
        let link = FakeLink::replying([timeout(), timeout(), target(20), timeout()]);
        let mut sync = SyncLoop::new(&blind, link, SyncConfig::default());

        sync.cycle();
        sync.cycle();
        assert_eq!(sync.consecutive_failures(), 2);
        sync.cycle();
        assert_eq!(sync.consecutive_failures(), 0);
        sync.cycle();
        assert_eq!(sync.consecutive_failures(), 1);
    }

    #[test]
    fn test_failed_reconnect_keeps_cycling() {
        let blind = FakeBlind::default();
        let link = FakeLink {
            connect_fails: true,
            ..Default::default()
        };
        let config = SyncConfig {
            max_consecutive_failures: 2,
            ..Default::default()
        };
        let mut sync = SyncLoop::new(&blind, link, config);

        for _ in 0..2 {
            sync.cycle();
        }
        assert!(matches!(sync.cycle(), CycleOutcome::Reconnected(_)));
        assert_eq!(sync.consecutive_failures(), 0);

        for _ in 0..3 {
            sync.cycle();
        }
        assert_eq!(sync.transport().connects, 2);
        assert_eq!(sync.transport().disconnects, 2);
    }

    #[test]
    fn test_config_defaults() {
        let config: SyncConfig = toml::from_str("failure_delay_ms = 2500").unwrap();
        assert_eq!(config.failure_delay_ms, 2500);
        assert_eq!(config.success_delay_ms, 200);
        assert_eq!(config.max_consecutive_failures, 10);
    }
}
