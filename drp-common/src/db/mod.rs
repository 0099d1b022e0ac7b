//! Database layer: SQLite initialization for the shared cache table

mod init;

pub use init::{init_database, init_schema};
