use std::sync::Arc;

use mockable::{Clock, DefaultClock};

use crate::events::{AccessEvent, dispatch};
use crate::guards::{OrgGuard, TeamGuard, require_self};
use crate::invites::ScopeKind;
use crate::repository::{
    CreateTeam, GuardedWrite, OrgMemberRepository, OrgRole, Role, Team, TeamMember,
    TeamMemberRepository, TeamRepository, TeamRole,
};
use crate::session::{RoleFactCache, Session};
use crate::validators::validate_name;
use crate::AccessError;

/// Team creation and membership changes.
///
/// Every mutation invalidates the affected principal's cached role facts
/// before returning, and no mutation may leave a team without an admin.
pub struct TeamMembershipService<T, M, O>
where
    T: TeamRepository,
    M: TeamMemberRepository + Clone,
    O: OrgMemberRepository,
{
    teams: T,
    members: M,
    team_guard: TeamGuard<M>,
    org_guard: OrgGuard<O>,
    cache: Arc<RoleFactCache>,
    clock: Arc<dyn Clock>,
}

impl<T, M, O> TeamMembershipService<T, M, O>
where
    T: TeamRepository,
    M: TeamMemberRepository + Clone,
    O: OrgMemberRepository,
{
    pub fn new(teams: T, members: M, org_members: O, cache: Arc<RoleFactCache>) -> Self {
        Self {
            teams,
            team_guard: TeamGuard::new(members.clone()),
            members,
            org_guard: OrgGuard::new(org_members),
            cache,
            clock: Arc::new(DefaultClock),
        }
    }

    /// Replaces the clock that stamps events without a stored timestamp.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Creates a team with the caller as its first admin.
    ///
    /// Teams inside an organization may only be created by its business or
    /// team admins.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "create_team", skip_all, err))]
    pub async fn create_team(&self, session: &Session, name: &str, org_id: Option<i64>) -> Result<Team, AccessError> {
        let principal = session.require()?;
        let name = validate_name(name)?;

        if let Some(org_id) = org_id {
            self.org_guard
                .require_role(session, org_id, &[OrgRole::BusinessAdmin, OrgRole::TeamAdmin])
                .await?;
        }

        let (team, _) = self
            .teams
            .create_with_admin(CreateTeam {
                name,
                org_id,
                creator_id: principal,
            })
            .await?;

        self.cache.invalidate(principal)?;

        log::info!(target: "tenantry", "msg=\"team created\", team_id={}, user_id={principal}", team.id);

        dispatch(AccessEvent::TeamCreated {
            team_id: team.id,
            org_id,
            created_by: principal,
            at: team.created_at,
        })
        .await;

        Ok(team)
    }

    /// Teams `user_id` belongs to. Callers may only list their own teams.
    pub async fn list_teams_for_user(&self, session: &Session, user_id: i64) -> Result<Vec<Team>, AccessError> {
        require_self(session, user_id)?;

        let memberships = self.members.find_by_user(user_id).await?;
        let mut teams = Vec::with_capacity(memberships.len());
        for membership in memberships {
            if let Some(team) = self.teams.find_by_id(membership.team_id).await? {
                teams.push(team);
            }
        }
        teams.sort_by_key(|team| team.id);
        Ok(teams)
    }

    pub async fn list_members(&self, session: &Session, team_id: i64) -> Result<Vec<TeamMember>, AccessError> {
        self.team_guard.require_member(session, team_id).await?;
        let mut members = self.members.find_by_team(team_id).await?;
        members.sort_by_key(|member| member.id);
        Ok(members)
    }

    /// Changes a member's role. Admins only.
    ///
    /// Demoting the team's last admin is `Forbidden`.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "update_team_member_role", skip(self, session), err))]
    pub async fn update_member_role(
        &self,
        session: &Session,
        team_id: i64,
        user_id: i64,
        role: TeamRole,
    ) -> Result<TeamMember, AccessError> {
        let access = self.team_guard.require_admin(session, team_id).await?;

        let member = match self.members.update_role_keeping_admin(team_id, user_id, role).await? {
            GuardedWrite::Applied(member) => member,
            GuardedWrite::Missing => return Err(AccessError::NotFound),
            GuardedWrite::LastAdmin => {
                log::warn!(
                    target: "tenantry",
                    "msg=\"refused to demote last admin\", team_id={team_id}, user_id={user_id}"
                );
                return Err(AccessError::Forbidden);
            }
        };

        self.cache.invalidate(user_id)?;

        log::info!(
            target: "tenantry",
            "msg=\"team role changed\", team_id={team_id}, user_id={user_id}, role=\"{role}\", changed_by={}",
            access.principal
        );

        dispatch(AccessEvent::MemberRoleChanged {
            scope: ScopeKind::Team,
            scope_id: team_id,
            user_id,
            role: role.as_str(),
            changed_by: access.principal,
            at: member.updated_at,
        })
        .await;

        Ok(member)
    }

    /// Removes a member. Admins may remove anyone; members may leave.
    ///
    /// Removing the team's last admin is `Forbidden`, whoever asks.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "remove_team_member", skip(self, session), err))]
    pub async fn remove_member(&self, session: &Session, team_id: i64, user_id: i64) -> Result<(), AccessError> {
        let principal = session.require()?;
        if principal == user_id {
            self.team_guard.require_member(session, team_id).await?;
        } else {
            self.team_guard.require_admin(session, team_id).await?;
        }

        match self.members.delete_keeping_admin(team_id, user_id).await? {
            GuardedWrite::Applied(()) => {}
            GuardedWrite::Missing => return Err(AccessError::NotFound),
            GuardedWrite::LastAdmin => {
                log::warn!(
                    target: "tenantry",
                    "msg=\"refused to remove last admin\", team_id={team_id}, user_id={user_id}"
                );
                return Err(AccessError::Forbidden);
            }
        }

        self.cache.invalidate(user_id)?;

        log::info!(
            target: "tenantry",
            "msg=\"team member removed\", team_id={team_id}, user_id={user_id}, removed_by={principal}"
        );

        dispatch(AccessEvent::MemberRemoved {
            scope: ScopeKind::Team,
            scope_id: team_id,
            user_id,
            removed_by: principal,
            at: self.clock.utc(),
        })
        .await;

        Ok(())
    }
}
