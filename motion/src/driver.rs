use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;

/// Something that advances the motor by one step per call.
///
/// Called from the tick with the enable and direction lines already set, so
/// implementations must be bounded and must not allocate.
pub trait StepOutput {
    fn pulse(&mut self);
}

/// A PWM channel left running at the step rate.
///
/// The motor advances one phase per period while enabled, so `pulse` has
/// nothing to do; the tick only gates the enable and direction lines.
#[derive(Debug)]
pub struct FreeRunning<W> {
    // Owned so the channel keeps running
    _pwm: W,
}

impl<W: SetDutyCycle> FreeRunning<W> {
    /// Start the waveform at 50% duty.
    pub fn start(mut pwm: W) -> Result<Self, W::Error> {
        pwm.set_duty_cycle_percent(50)?;
        Ok(FreeRunning { _pwm: pwm })
    }
}

impl<W> StepOutput for FreeRunning<W> {
    #[inline]
    fn pulse(&mut self) {}
}

/// A plain output toggled high then low with a half-period busy wait.
///
/// Pulse width depends on the tick being serviced on time.
#[derive(Debug)]
pub struct Toggled<P, D> {
    pin: P,
    delay: D,
    half_period_ns: u32,
}

impl<P: OutputPin, D: DelayNs> Toggled<P, D> {
    pub fn new(mut pin: P, delay: D, step_rate: u32) -> Self {
        pin.set_low().unwrap_or_default();
        Toggled {
            pin,
            delay,
            half_period_ns: 500_000_000 / step_rate.max(1),
        }
    }

    pub fn half_period_ns(&self) -> u32 {
        self.half_period_ns
    }
}

impl<P: OutputPin, D: DelayNs> StepOutput for Toggled<P, D> {
    fn pulse(&mut self) {
        self.pin.set_high().unwrap_or_default();
        self.delay.delay_ns(self.half_period_ns);
        self.pin.set_low().unwrap_or_default();
    }
}

/// Either step strategy, picked at startup from the configured `StepMode`.
#[derive(Debug)]
pub enum StepGenerator<W, P, D> {
    FreeRunning(FreeRunning<W>),
    Toggled(Toggled<P, D>),
}

impl<W, P: OutputPin, D: DelayNs> StepOutput for StepGenerator<W, P, D> {
    #[inline]
    fn pulse(&mut self) {
        match self {
            StepGenerator::FreeRunning(pwm) => pwm.pulse(),
            StepGenerator::Toggled(pin) => pin.pulse(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Trace(Arc<Mutex<Vec<String>>>);

    impl Trace {
        fn push(&self, event: String) {
            self.0.lock().unwrap().push(event);
        }

        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }

    struct Pin(Trace);

    impl embedded_hal::digital::ErrorType for Pin {
        type Error = Infallible;
    }

    impl OutputPin for Pin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.push("low".into());
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0.push("high".into());
            Ok(())
        }
    }

    struct Delay(Trace);

    impl DelayNs for Delay {
        fn delay_ns(&mut self, ns: u32) {
            self.0.push(format!("wait {ns}"));
        }
    }

    struct Pwm(Trace);

    impl embedded_hal::pwm::ErrorType for Pwm {
        type Error = Infallible;
    }

    impl SetDutyCycle for Pwm {
        fn max_duty_cycle(&self) -> u16 {
            255
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
            self.0.push(format!("duty {duty}"));
            Ok(())
        }
    }

    #[test]
    fn test_toggled_pulse() {
        let trace = Trace::default();
        let mut step = Toggled::new(Pin(trace.clone()), Delay(trace.clone()), 1000);
        assert_eq!(step.half_period_ns(), 500_000);
        assert_eq!(trace.take(), vec!["low"]);

        step.pulse();
        assert_eq!(trace.take(), vec!["high", "wait 500000", "low"]);
    }

    #[test]
    fn test_free_running_starts_at_half_duty() {
        let trace = Trace::default();
        let mut step = FreeRunning::start(Pwm(trace.clone())).unwrap();
        assert_eq!(trace.take(), vec!["duty 127"]);

        // Per-tick pulses never touch the waveform
        step.pulse();
        step.pulse();
        assert!(trace.take().is_empty());
    }

    #[test]
    fn test_generator_dispatch() {
        let trace = Trace::default();
        let mut step: StepGenerator<Pwm, Pin, Delay> =
            StepGenerator::Toggled(Toggled::new(Pin(trace.clone()), Delay(trace.clone()), 2000));
        trace.take();
        step.pulse();
        assert_eq!(trace.take(), vec!["high", "wait 250000", "low"]);

        let mut step: StepGenerator<Pwm, Pin, Delay> =
            StepGenerator::FreeRunning(FreeRunning::start(Pwm(trace.clone())).unwrap());
        trace.take();
        step.pulse();
        assert!(trace.take().is_empty());
    }
}
