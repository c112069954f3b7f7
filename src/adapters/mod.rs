/// Adapters - concrete implementations of the ports
///
/// Hosted services, SQLite persistence and the in-memory session cache.
pub mod services;
pub mod session;
pub mod storage;
