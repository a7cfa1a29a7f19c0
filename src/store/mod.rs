//! Persistence layer for email records.

pub mod libsql_backend;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use traits::EmailStore;
