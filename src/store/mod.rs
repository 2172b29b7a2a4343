//! Persistence layer — libSQL-backed storage for email records.

pub mod libsql_store;
pub mod migrations;
pub mod traits;

pub use libsql_store::LibSqlStore;
pub use traits::{EmailRecord, NewEmailRecord, RecordStore};
