//! Error helpers for `gold-store`.
//!
//! `gold_errors::GoldError` already has a blanket `From<sqlx::Error>`
//! mapping (pool/connection failures -> `Transient`, `RowNotFound` ->
//! `NotFound`, everything else -> `Internal`); this module only adds the
//! store-specific helpers that need more context than that mapping alone
//! can carry.

pub use gold_errors::GoldError;

/// Result type alias using `GoldError`, matching the rest of the workspace.
pub type Result<T> = std::result::Result<T, GoldError>;

/// A migration failed to apply.
pub fn migration_error(migration_id: &str, reason: impl std::fmt::Display) -> GoldError {
    GoldError::internal(format!("migration {migration_id} failed: {reason}")).with_op("migration")
}

/// A previously-applied migration's checksum no longer matches its embedded
/// SQL — the migration file was edited after being applied to this
/// database.
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> GoldError {
    GoldError::internal(format!(
        "checksum mismatch for migration {migration_id}: expected {expected}, got {actual}"
    ))
    .with_op("migration_checksum")
}
