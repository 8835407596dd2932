use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use super::db_error;
use crate::repository::{
    CreateTeam, GuardedWrite, Role, Team, TeamMember, TeamMemberRepository, TeamRepository, TeamRole,
};
use crate::AccessError;

const TEAM_COLUMNS: &str = "id, name, org_id, created_at, updated_at";
const MEMBER_COLUMNS: &str = "id, team_id, user_id, role, created_at, updated_at";

#[derive(Clone)]
pub struct PostgresTeamRepository {
    pool: PgPool,
}

impl PostgresTeamRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Clone)]
pub struct PostgresTeamMemberRepository {
    pool: PgPool,
}

impl PostgresTeamMemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct TeamRecord {
    id: i64,
    name: String,
    org_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TeamRecord> for Team {
    fn from(row: TeamRecord) -> Self {
        Team {
            id: row.id,
            name: row.name,
            org_id: row.org_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct TeamMemberRecord {
    id: i64,
    team_id: i64,
    user_id: i64,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TeamMemberRecord {
    fn is_admin(&self) -> bool {
        self.role == TeamRole::Admin.as_str()
    }
}

impl From<TeamMemberRecord> for TeamMember {
    fn from(row: TeamMemberRecord) -> Self {
        TeamMember {
            id: row.id,
            team_id: row.team_id,
            user_id: row.user_id,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl TeamRepository for PostgresTeamRepository {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn create_with_admin(&self, data: CreateTeam) -> Result<(Team, TeamMember), AccessError> {
        let mut tx = self.pool.begin().await.map_err(db_error("create_team"))?;

        let team: TeamRecord = sqlx::query_as(&format!(
            "INSERT INTO teams (name, org_id) VALUES ($1, $2) RETURNING {TEAM_COLUMNS}"
        ))
        .bind(&data.name)
        .bind(data.org_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("create_team"))?;

        let member: TeamMemberRecord = sqlx::query_as(&format!(
            "INSERT INTO team_members (team_id, user_id, role) VALUES ($1, $2, $3) RETURNING {MEMBER_COLUMNS}"
        ))
        .bind(team.id)
        .bind(data.creator_id)
        .bind(TeamRole::Admin.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("create_team"))?;

        tx.commit().await.map_err(db_error("create_team"))?;

        Ok((team.into(), member.into()))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_by_id(&self, id: i64) -> Result<Option<Team>, AccessError> {
        let row: Option<TeamRecord> = sqlx::query_as(&format!("SELECT {TEAM_COLUMNS} FROM teams WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("find_team_by_id"))?;

        Ok(row.map(Into::into))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_by_org(&self, org_id: i64) -> Result<Vec<Team>, AccessError> {
        let rows: Vec<TeamRecord> =
            sqlx::query_as(&format!("SELECT {TEAM_COLUMNS} FROM teams WHERE org_id = $1 ORDER BY id"))
                .bind(org_id)
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("find_teams_by_org"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl TeamMemberRepository for PostgresTeamMemberRepository {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_by_team_and_user(&self, team_id: i64, user_id: i64) -> Result<Option<TeamMember>, AccessError> {
        let row: Option<TeamMemberRecord> = sqlx::query_as(&format!(
            "SELECT {MEMBER_COLUMNS} FROM team_members WHERE team_id = $1 AND user_id = $2"
        ))
        .bind(team_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("find_team_member"))?;

        Ok(row.map(Into::into))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_by_team(&self, team_id: i64) -> Result<Vec<TeamMember>, AccessError> {
        let rows: Vec<TeamMemberRecord> =
            sqlx::query_as(&format!("SELECT {MEMBER_COLUMNS} FROM team_members WHERE team_id = $1 ORDER BY id"))
                .bind(team_id)
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("find_team_members"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_by_user(&self, user_id: i64) -> Result<Vec<TeamMember>, AccessError> {
        let rows: Vec<TeamMemberRecord> =
            sqlx::query_as(&format!("SELECT {MEMBER_COLUMNS} FROM team_members WHERE user_id = $1 ORDER BY team_id"))
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
                .map_err(db_error("find_team_memberships"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn update_role_keeping_admin(
        &self,
        team_id: i64,
        user_id: i64,
        role: TeamRole,
    ) -> Result<GuardedWrite<TeamMember>, AccessError> {
        let mut tx = self.pool.begin().await.map_err(db_error("update_team_member_role"))?;

        let members: Vec<TeamMemberRecord> = sqlx::query_as(&format!(
            "SELECT {MEMBER_COLUMNS} FROM team_members WHERE team_id = $1 FOR UPDATE"
        ))
        .bind(team_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_error("update_team_member_role"))?;

        let Some(target) = members.iter().find(|m| m.user_id == user_id) else {
            return Ok(GuardedWrite::Missing);
        };

        let admins = members.iter().filter(|m| m.is_admin()).count();
        if target.is_admin() && role != TeamRole::Admin && admins <= 1 {
            return Ok(GuardedWrite::LastAdmin);
        }

        let row: TeamMemberRecord = sqlx::query_as(&format!(
            "UPDATE team_members SET role = $1, updated_at = NOW() WHERE id = $2 RETURNING {MEMBER_COLUMNS}"
        ))
        .bind(role.as_str())
        .bind(target.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("update_team_member_role"))?;

        tx.commit().await.map_err(db_error("update_team_member_role"))?;

        Ok(GuardedWrite::Applied(row.into()))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn delete_keeping_admin(&self, team_id: i64, user_id: i64) -> Result<GuardedWrite<()>, AccessError> {
        let mut tx = self.pool.begin().await.map_err(db_error("delete_team_member"))?;

        let members: Vec<TeamMemberRecord> = sqlx::query_as(&format!(
            "SELECT {MEMBER_COLUMNS} FROM team_members WHERE team_id = $1 FOR UPDATE"
        ))
        .bind(team_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_error("delete_team_member"))?;

        let Some(target) = members.iter().find(|m| m.user_id == user_id) else {
            return Ok(GuardedWrite::Missing);
        };

        let admins = members.iter().filter(|m| m.is_admin()).count();
        if target.is_admin() && admins <= 1 {
            return Ok(GuardedWrite::LastAdmin);
        }

        sqlx::query("DELETE FROM team_members WHERE id = $1")
            .bind(target.id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("delete_team_member"))?;

        tx.commit().await.map_err(db_error("delete_team_member"))?;

        Ok(GuardedWrite::Applied(()))
    }
}
