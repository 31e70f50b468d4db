pub mod codec;
pub mod wire;

pub use codec::{from_percentage, to_percentage};
pub use wire::{device_url, WireCommand, WireReport};
