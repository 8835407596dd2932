//! Database migrations for the access-control tables.
//!
//! # Example
//!
//! ```rust,ignore
//! use tenantry::postgres::migrations;
//! use sqlx::PgPool;
//!
//! async fn setup_database(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
//!     migrations::run_all(pool).await
//! }
//! ```

use sqlx::PgPool;

/// Runs the access-control migrations.
///
/// This includes tables for:
/// - `users`
/// - `organizations`, `organization_members`
/// - `teams`, `team_members`
/// - `ideas`, `sprints`, `sprint_participants`
/// - `team_invites`, `organization_invites`
///
/// The resource tables only hold the columns the guards read; host
/// applications add their own.
pub async fn run_access(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations/access").run(pool).await
}

/// Runs all migrations, in order.
pub async fn run_all(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    run_access(pool).await
}
