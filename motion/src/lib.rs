pub mod config;
pub mod driver;
pub mod motion;
pub mod states;

pub use config::{ActuatorConfig, StepMode};
pub use driver::{FreeRunning, StepGenerator, StepOutput, Toggled};
pub use motion::{Motion, MotionHandle, Snapshot};
pub use states::{Debounce, Movement};
