//! PostgreSQL adapters for the folio publication engine.
//!
//! - `PgContentRepository`: workflow state per content entity, written with
//!   a conditional `UPDATE` so racing transitions cannot both commit
//! - `PgAuditLog`: append-only `transition_records` table
//!
//! Call `migrate` once at startup to create the tables.

pub mod audit;
pub mod content;

pub use audit::PgAuditLog;
pub use content::PgContentRepository;

use sqlx::PgPool;

/// Applies the embedded migrations.
///
/// # Errors
///
/// Returns an error if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
