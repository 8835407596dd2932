use serde::Serialize;

use super::TeamGuard;
use crate::repository::{IdeaRepository, SprintRepository, TeamMemberRepository};
use crate::session::Session;
use crate::{AccessError, PrincipalId};

/// Passed idea or sprint guard.
///
/// Checks short-circuit in order owner, team member, participant; a flag
/// after the first `true` one is reported as `false` without being looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResourceAccess {
    pub principal: PrincipalId,
    pub is_owner: bool,
    pub is_team_member: bool,
    /// Only ever set by sprint guards.
    pub is_participant: bool,
}

impl ResourceAccess {
    fn owner(principal: PrincipalId) -> Self {
        Self {
            principal,
            is_owner: true,
            is_team_member: false,
            is_participant: false,
        }
    }

    fn team_member(principal: PrincipalId) -> Self {
        Self {
            principal,
            is_owner: false,
            is_team_member: true,
            is_participant: false,
        }
    }

    fn participant(principal: PrincipalId) -> Self {
        Self {
            principal,
            is_owner: false,
            is_team_member: false,
            is_participant: true,
        }
    }
}

/// Ownership and team-membership checks for ideas and sprints.
///
/// Organization membership alone never grants access to team-scoped work.
#[derive(Clone)]
pub struct ResourceGuard<T, I, S>
where
    T: TeamMemberRepository,
    I: IdeaRepository,
    S: SprintRepository,
{
    teams: TeamGuard<T>,
    ideas: I,
    sprints: S,
}

impl<T, I, S> ResourceGuard<T, I, S>
where
    T: TeamMemberRepository,
    I: IdeaRepository,
    S: SprintRepository,
{
    pub fn new(team_members: T, ideas: I, sprints: S) -> Self {
        Self {
            teams: TeamGuard::new(team_members),
            ideas,
            sprints,
        }
    }

    async fn is_team_member(&self, team_id: Option<i64>, principal: PrincipalId) -> Result<bool, AccessError> {
        match team_id {
            Some(team_id) => Ok(self.teams.role_of(team_id, principal).await?.is_some()),
            None => Ok(false),
        }
    }

    fn deny(guard: &str, principal: PrincipalId, resource_id: i64) -> AccessError {
        log::debug!(
            target: "tenantry",
            "msg=\"access denied\", guard=\"{guard}\", user_id={principal}, resource_id={resource_id}"
        );
        AccessError::Forbidden
    }

    pub async fn require_idea_access(&self, session: &Session, idea_id: i64) -> Result<ResourceAccess, AccessError> {
        let principal = session.require()?;
        let idea = self.ideas.find_idea(idea_id).await?.ok_or(AccessError::NotFound)?;

        if idea.owner_id == principal {
            return Ok(ResourceAccess::owner(principal));
        }
        if self.is_team_member(idea.team_id, principal).await? {
            return Ok(ResourceAccess::team_member(principal));
        }

        Err(Self::deny("idea_access", principal, idea_id))
    }

    pub async fn require_idea_owner(&self, session: &Session, idea_id: i64) -> Result<ResourceAccess, AccessError> {
        let principal = session.require()?;
        let idea = self.ideas.find_idea(idea_id).await?.ok_or(AccessError::NotFound)?;

        if idea.owner_id != principal {
            return Err(Self::deny("idea_owner", principal, idea_id));
        }

        Ok(ResourceAccess::owner(principal))
    }

    pub async fn require_sprint_access(
        &self,
        session: &Session,
        sprint_id: i64,
    ) -> Result<ResourceAccess, AccessError> {
        let principal = session.require()?;
        let sprint = self
            .sprints
            .find_sprint(sprint_id)
            .await?
            .ok_or(AccessError::NotFound)?;

        if sprint.owner_id == principal {
            return Ok(ResourceAccess::owner(principal));
        }
        if self.is_team_member(sprint.team_id, principal).await? {
            return Ok(ResourceAccess::team_member(principal));
        }
        if self.sprints.is_participant(sprint_id, principal).await? {
            return Ok(ResourceAccess::participant(principal));
        }

        Err(Self::deny("sprint_access", principal, sprint_id))
    }

    pub async fn require_sprint_owner(
        &self,
        session: &Session,
        sprint_id: i64,
    ) -> Result<ResourceAccess, AccessError> {
        let principal = session.require()?;
        let sprint = self
            .sprints
            .find_sprint(sprint_id)
            .await?
            .ok_or(AccessError::NotFound)?;

        if sprint.owner_id != principal {
            return Err(Self::deny("sprint_owner", principal, sprint_id));
        }

        Ok(ResourceAccess::owner(principal))
    }
}
