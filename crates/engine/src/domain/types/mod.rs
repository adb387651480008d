// Re-export all types so callers can use `domain::types::*`.

pub use self::core::*;
pub use certificate::*;
pub use host::*;
pub use trust::*;
pub use config::*;

// Module declarations
mod core;
mod certificate;
mod host;
mod trust;
mod config;
