//! SeaORM storage facade
//!
//! Supports SQLite, MySQL/MariaDB, and PostgreSQL behind one connection
//! handle; retry policy for transient database errors lives in
//! [`backend::retry`].

pub mod backend;

pub use backend::{SeaOrmStorage, connect_generic, connect_sqlite, run_migrations};
