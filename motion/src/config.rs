use serde::Deserialize;
use std::time::Duration;

/// How step pulses reach the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepMode {
    /// Free-running PWM at `step_rate`, gated by the enable line.
    #[default]
    Pwm,
    /// Step line toggled from the tick with a half-period busy delay.
    Toggle,
}

/// Calibration of a single actuator. Fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ActuatorConfig {
    pub steps_per_unit_length: f64,
    pub travel_length: f64,
    #[serde(default)]
    pub reverse_direction: bool,
    /// Ticks (and therefore steps) per second
    #[serde(default = "default_step_rate")]
    pub step_rate: u32,
    #[serde(default = "default_settle_ms")]
    pub endstop_settle_ms: u64,
    #[serde(default)]
    pub step_mode: StepMode,
    #[serde(default = "active_low")]
    pub enable_active_low: bool,
    #[serde(default = "active_low")]
    pub endstop_active_low: bool,
}

fn default_step_rate() -> u32 {
    1000
}

fn default_settle_ms() -> u64 {
    500
}

fn active_low() -> bool {
    true
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        ActuatorConfig {
            steps_per_unit_length: 6.9,
            travel_length: 1050.0,
            reverse_direction: false,
            step_rate: default_step_rate(),
            endstop_settle_ms: default_settle_ms(),
            step_mode: StepMode::default(),
            enable_active_low: true,
            endstop_active_low: true,
        }
    }
}

impl ActuatorConfig {
    /// Total travel in steps. Negative or NaN products saturate to 0.
    pub fn max_steps(&self) -> u32 {
        (self.steps_per_unit_length * self.travel_length).round() as u32
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.step_rate.max(1)))
    }

    pub fn endstop_settle(&self) -> Duration {
        Duration::from_millis(self.endstop_settle_ms)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_steps() == 0 {
            anyhow::bail!(
                "actuator travel is zero steps ({} steps/unit x {} units)",
                self.steps_per_unit_length,
                self.travel_length
            );
        }
        if self.step_rate == 0 || self.step_rate > 1_000_000 {
            anyhow::bail!("step_rate must be within 1..=1000000 Hz, got {}", self.step_rate);
        }
        Ok(())
    }
}
