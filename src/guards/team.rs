use serde::Serialize;

use crate::repository::{TeamMemberRepository, TeamRole};
use crate::session::Session;
use crate::{AccessError, PrincipalId};

/// Passed team guard: who is calling and the role they hold in the team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TeamAccess {
    pub principal: PrincipalId,
    pub team_id: i64,
    pub role: TeamRole,
}

impl TeamAccess {
    pub fn is_admin(&self) -> bool {
        self.role == TeamRole::Admin
    }
}

/// Team membership checks against persisted membership rows.
#[derive(Clone)]
pub struct TeamGuard<T: TeamMemberRepository> {
    members: T,
}

impl<T: TeamMemberRepository> TeamGuard<T> {
    pub fn new(members: T) -> Self {
        Self { members }
    }

    /// Role of `user_id` in the team, without any session check.
    pub(crate) async fn role_of(&self, team_id: i64, user_id: PrincipalId) -> Result<Option<TeamRole>, AccessError> {
        let Some(member) = self.members.find_by_team_and_user(team_id, user_id).await? else {
            return Ok(None);
        };
        member
            .parse_role()
            .map(Some)
            .ok_or_else(|| AccessError::Internal(format!("unknown team role {}", member.role)))
    }

    pub async fn require_member(&self, session: &Session, team_id: i64) -> Result<TeamAccess, AccessError> {
        let principal = session.require()?;

        let Some(role) = self.role_of(team_id, principal).await? else {
            log::debug!(
                target: "tenantry",
                "msg=\"access denied\", guard=\"team_member\", user_id={principal}, team_id={team_id}"
            );
            return Err(AccessError::Forbidden);
        };

        Ok(TeamAccess {
            principal,
            team_id,
            role,
        })
    }

    pub async fn require_admin(&self, session: &Session, team_id: i64) -> Result<TeamAccess, AccessError> {
        let access = self.require_member(session, team_id).await?;

        if !access.is_admin() {
            log::debug!(
                target: "tenantry",
                "msg=\"access denied\", guard=\"team_admin\", user_id={}, team_id={team_id}",
                access.principal
            );
            return Err(AccessError::Forbidden);
        }

        Ok(access)
    }
}
