// Device registry API: one authenticated read of the fleet's
// connectivity state.

mod client;
mod types;

pub use client::{DEFAULT_REGISTRY_URL, RegistryClient};
pub use types::DeviceRecord;
