pub mod error;
#[cfg(feature = "esp")]
pub mod http;
pub mod sync;

pub use error::SyncError;
#[cfg(feature = "esp")]
pub use http::HttpTransport;
pub use sync::{Actuator, CycleOutcome, SyncConfig, SyncLoop, Transport};
