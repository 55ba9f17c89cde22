// devmon-api: Async HTTP clients for the device registry and the
// error reporting service.

pub mod error;
pub mod registry;
pub mod reporting;
pub mod transport;

pub use error::Error;
pub use registry::{DEFAULT_REGISTRY_URL, DeviceRecord, RegistryClient};
pub use reporting::{DEFAULT_REPORTING_ENDPOINT, ErrorReportingClient, ServiceContext};
pub use transport::{TlsMode, TransportConfig};
