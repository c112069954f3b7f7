//! Knowledge lookup adapters
//!
//! Implementations of the KnowledgePort:
//! - Snowflake (SQL API v2)
//!
//! The SQLite storage adapter also answers term lookups from a local table.

pub mod snowflake;

pub use snowflake::SnowflakeService;
