use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{GuardedWrite, Role, TeamRole};
use crate::AccessError;

/// A team, either personal (`org_id = None`) or inside an organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub org_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Links a user to a team with a role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: i64,
    pub team_id: i64,
    pub user_id: i64,
    /// The role as a string (parsed via `Role::from_str`).
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TeamMember {
    pub fn parse_role(&self) -> Option<TeamRole> {
        TeamRole::from_str(&self.role)
    }

    pub fn is_admin(&self) -> bool {
        self.parse_role() == Some(TeamRole::Admin)
    }
}

#[derive(Debug, Clone)]
pub struct CreateTeam {
    pub name: String,
    pub org_id: Option<i64>,
    /// Becomes the team's first admin.
    pub creator_id: i64,
}

#[async_trait]
pub trait TeamRepository: Send + Sync {
    /// Inserts the team and its creator's admin membership in one step, so a
    /// team is never observable without an admin.
    async fn create_with_admin(&self, data: CreateTeam) -> Result<(Team, TeamMember), AccessError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Team>, AccessError>;

    async fn find_by_org(&self, org_id: i64) -> Result<Vec<Team>, AccessError>;
}

#[async_trait]
pub trait TeamMemberRepository: Send + Sync {
    async fn find_by_team_and_user(
        &self,
        team_id: i64,
        user_id: i64,
    ) -> Result<Option<TeamMember>, AccessError>;

    async fn find_by_team(&self, team_id: i64) -> Result<Vec<TeamMember>, AccessError>;

    async fn find_by_user(&self, user_id: i64) -> Result<Vec<TeamMember>, AccessError>;

    /// Changes a role unless it would leave the team without an admin.
    async fn update_role_keeping_admin(
        &self,
        team_id: i64,
        user_id: i64,
        role: TeamRole,
    ) -> Result<GuardedWrite<TeamMember>, AccessError>;

    /// Removes a member unless it is the team's last admin.
    async fn delete_keeping_admin(
        &self,
        team_id: i64,
        user_id: i64,
    ) -> Result<GuardedWrite<()>, AccessError>;
}
