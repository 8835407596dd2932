use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use super::{db_error, parse_stored};
use crate::invites::{Invite, InviteScope, ScopeKind};
use crate::repository::{CreateInvite, InviteRepository, Role};
use crate::AccessError;

/// Invite storage for both scopes.
///
/// Team and organization invites live in separate tables; the scope type
/// parameter picks which one a call reads or writes.
#[derive(Clone)]
pub struct PostgresInviteRepository {
    pool: PgPool,
}

impl PostgresInviteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Table layout behind one scope.
struct ScopeTables {
    invites: &'static str,
    scope_column: &'static str,
    members: &'static str,
    /// Conflict target that makes a second membership a no-op.
    member_conflict: &'static str,
}

const fn tables(kind: ScopeKind) -> ScopeTables {
    match kind {
        ScopeKind::Team => ScopeTables {
            invites: "team_invites",
            scope_column: "team_id",
            members: "team_members",
            member_conflict: "(team_id, user_id)",
        },
        ScopeKind::Organization => ScopeTables {
            invites: "organization_invites",
            scope_column: "org_id",
            members: "organization_members",
            member_conflict: "(user_id)",
        },
    }
}

fn select_columns(t: &ScopeTables) -> String {
    format!(
        "id, {} AS scope_id, email, role, code, created_by, expires_at, used, created_at",
        t.scope_column
    )
}

#[derive(FromRow)]
struct InviteRecord {
    id: i64,
    scope_id: i64,
    email: Option<String>,
    role: String,
    code: String,
    created_by: i64,
    expires_at: DateTime<Utc>,
    used: bool,
    created_at: DateTime<Utc>,
}

impl InviteRecord {
    fn into_invite<S: InviteScope>(self) -> Result<Invite<S>, AccessError> {
        Ok(Invite {
            id: self.id,
            scope: S::default(),
            scope_id: self.scope_id,
            email: self.email,
            role: parse_stored(&self.role)?,
            code: self.code,
            created_by: self.created_by,
            expires_at: self.expires_at,
            used: self.used,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl<S: InviteScope> InviteRepository<S> for PostgresInviteRepository {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, err))]
    async fn create(&self, data: CreateInvite<S>) -> Result<Invite<S>, AccessError> {
        let t = tables(S::KIND);
        let row: InviteRecord = sqlx::query_as(&format!(
            r"
            INSERT INTO {} ({}, email, role, code, created_by, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            ",
            t.invites,
            t.scope_column,
            select_columns(&t)
        ))
        .bind(data.scope_id)
        .bind(&data.email)
        .bind(data.role.as_str())
        .bind(&data.code)
        .bind(data.created_by)
        .bind(data.expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create_invite"))?;

        row.into_invite()
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_by_id(&self, id: i64) -> Result<Option<Invite<S>>, AccessError> {
        let t = tables(S::KIND);
        let row: Option<InviteRecord> = sqlx::query_as(&format!(
            "SELECT {} FROM {} WHERE id = $1",
            select_columns(&t),
            t.invites
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("find_invite_by_id"))?;

        row.map(InviteRecord::into_invite).transpose()
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, err))]
    async fn find_by_code(&self, code: &str) -> Result<Option<Invite<S>>, AccessError> {
        let t = tables(S::KIND);
        let row: Option<InviteRecord> = sqlx::query_as(&format!(
            "SELECT {} FROM {} WHERE code = $1",
            select_columns(&t),
            t.invites
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("find_invite_by_code"))?;

        row.map(InviteRecord::into_invite).transpose()
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_active_by_scope(&self, scope_id: i64, now: DateTime<Utc>) -> Result<Vec<Invite<S>>, AccessError> {
        let t = tables(S::KIND);
        let rows: Vec<InviteRecord> = sqlx::query_as(&format!(
            r"
            SELECT {} FROM {}
            WHERE {} = $1 AND used = FALSE AND expires_at > $2
            ORDER BY created_at
            ",
            select_columns(&t),
            t.invites,
            t.scope_column
        ))
        .bind(scope_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("find_active_invites"))?;

        rows.into_iter().map(InviteRecord::into_invite).collect()
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn redeem(&self, invite_id: i64, user_id: i64, now: DateTime<Utc>) -> Result<bool, AccessError> {
        let t = tables(S::KIND);
        let mut tx = self.pool.begin().await.map_err(db_error("redeem_invite"))?;

        // The conditional update is the single point where a code gets spent.
        let claimed: Option<(i64, String)> = sqlx::query_as(&format!(
            r"
            UPDATE {} SET used = TRUE
            WHERE id = $1 AND used = FALSE AND expires_at > $2
            RETURNING {}, role
            ",
            t.invites,
            t.scope_column
        ))
        .bind(invite_id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error("redeem_invite"))?;

        let Some((scope_id, role)) = claimed else {
            return Ok(false);
        };

        let inserted = sqlx::query(&format!(
            r"
            INSERT INTO {} ({}, user_id, role) VALUES ($1, $2, $3)
            ON CONFLICT {} DO NOTHING
            ",
            t.members,
            t.scope_column,
            t.member_conflict
        ))
        .bind(scope_id)
        .bind(user_id)
        .bind(&role)
        .execute(&mut *tx)
        .await
        .map_err(db_error("redeem_invite"))?;

        if inserted.rows_affected() == 0 {
            // Dropping the transaction rolls back the claim.
            return Ok(false);
        }

        tx.commit().await.map_err(db_error("redeem_invite"))?;
        Ok(true)
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn delete(&self, id: i64) -> Result<(), AccessError> {
        let t = tables(S::KIND);
        sqlx::query(&format!("DELETE FROM {} WHERE id = $1", t.invites))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete_invite"))?;

        Ok(())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AccessError> {
        let t = tables(S::KIND);
        let result = sqlx::query(&format!("DELETE FROM {} WHERE expires_at <= $1", t.invites))
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete_expired_invites"))?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_tables_are_distinct() {
        let team = tables(ScopeKind::Team);
        let org = tables(ScopeKind::Organization);
        assert_ne!(team.invites, org.invites);
        assert_eq!(team.members, "team_members");
        assert_eq!(org.member_conflict, "(user_id)");
        assert!(select_columns(&org).contains("org_id AS scope_id"));
    }
}
