// Adapters binding the trust engine to concrete TLS machinery.

pub mod openssl;
#[cfg(feature = "net")]
pub mod dispatch;
