//! Embedded-SQL migration framework: checksummed, idempotent application
//! against Postgres.

mod checksums;
mod embedded;
mod runner;

pub use runner::apply_migrations;
