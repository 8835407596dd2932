//! `PostgreSQL` adapters for every repository trait.
//!
//! Enable with the `sqlx_postgres` feature and run [`migrations::run_all`]
//! before first use. Multi-row writes (creation with an admin, guarded role
//! changes, invite redemption) run in a single transaction and lock the rows
//! they count with `SELECT ... FOR UPDATE`.

mod invite;
pub mod migrations;
mod organization;
mod resource;
mod team;
mod user;

pub use invite::PostgresInviteRepository;
pub use organization::{PostgresOrgMemberRepository, PostgresOrganizationRepository};
pub use resource::PostgresResourceRepository;
pub use team::{PostgresTeamMemberRepository, PostgresTeamRepository};
pub use user::PostgresUserRepository;

use sqlx::PgPool;

use crate::AccessError;

/// One instance of every Postgres repository, sharing a pool.
#[derive(Clone)]
pub struct PostgresRepositories {
    pub users: PostgresUserRepository,
    pub organizations: PostgresOrganizationRepository,
    pub org_members: PostgresOrgMemberRepository,
    pub teams: PostgresTeamRepository,
    pub team_members: PostgresTeamMemberRepository,
    pub resources: PostgresResourceRepository,
    pub invites: PostgresInviteRepository,
}

/// Creates all Postgres repository instances from a connection pool.
pub fn create_repositories(pool: PgPool) -> PostgresRepositories {
    PostgresRepositories {
        users: PostgresUserRepository::new(pool.clone()),
        organizations: PostgresOrganizationRepository::new(pool.clone()),
        org_members: PostgresOrgMemberRepository::new(pool.clone()),
        teams: PostgresTeamRepository::new(pool.clone()),
        team_members: PostgresTeamMemberRepository::new(pool.clone()),
        resources: PostgresResourceRepository::new(pool.clone()),
        invites: PostgresInviteRepository::new(pool),
    }
}

/// Logs a failed query and converts it into `AccessError::DatabaseError`.
pub(crate) fn db_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> AccessError {
    move |e| {
        log::error!(target: "tenantry", "msg=\"database error\", operation=\"{operation}\", error=\"{e}\"");
        AccessError::DatabaseError(e.to_string())
    }
}

pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error().is_some_and(|d| d.is_unique_violation())
}

/// Parses a stored role string, treating unknown values as corrupt data.
pub(crate) fn parse_stored<R: crate::repository::Role>(value: &str) -> Result<R, AccessError> {
    R::from_str(value).ok_or_else(|| AccessError::Internal(format!("unknown stored role {value}")))
}
