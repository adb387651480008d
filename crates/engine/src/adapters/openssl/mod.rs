// OpenSSL-backed adapters: platform path validation and the TLS probe.

mod system;
#[cfg(feature = "net")]
mod probe;

pub use system::*;
#[cfg(feature = "net")]
pub use probe::*;
