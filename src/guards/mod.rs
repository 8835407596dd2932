//! Access guards.
//!
//! Every guard first requires a principal (`Unauthenticated` otherwise, which
//! is distinct from `Forbidden`), then checks existence before permission.
//! Guards read persisted membership rows, never the role-fact cache, so a
//! stale token can't widen access.
//!
//! # Example
//!
//! ```rust,ignore
//! let guards = AccessGuards::new(team_members, org_members, ideas, sprints);
//!
//! let access = guards.require_idea_access(&session, idea_id).await?;
//! if access.is_owner {
//!     // owner-only affordances
//! }
//! ```

mod org;
mod resource;
mod team;

pub use org::{OrgAccess, OrgGuard};
pub use resource::{ResourceAccess, ResourceGuard};
pub use team::{TeamAccess, TeamGuard};

use crate::repository::{
    IdeaRepository, OrgMemberRepository, OrgRole, SprintRepository, TeamMemberRepository,
};
use crate::session::Session;
use crate::{AccessError, PrincipalId};

/// Requires any authenticated principal.
pub fn require_session(session: &Session) -> Result<PrincipalId, AccessError> {
    session.require()
}

/// Requires that the caller is `requested_user_id`.
pub fn require_self(session: &Session, requested_user_id: PrincipalId) -> Result<PrincipalId, AccessError> {
    let principal = session.require()?;
    if principal != requested_user_id {
        return Err(AccessError::Forbidden);
    }
    Ok(principal)
}

/// All guards behind one value, for handlers that need several of them.
#[derive(Clone)]
pub struct AccessGuards<T, O, I, S>
where
    T: TeamMemberRepository + Clone,
    O: OrgMemberRepository,
    I: IdeaRepository,
    S: SprintRepository,
{
    teams: TeamGuard<T>,
    orgs: OrgGuard<O>,
    resources: ResourceGuard<T, I, S>,
}

impl<T, O, I, S> AccessGuards<T, O, I, S>
where
    T: TeamMemberRepository + Clone,
    O: OrgMemberRepository,
    I: IdeaRepository,
    S: SprintRepository,
{
    pub fn new(team_members: T, org_members: O, ideas: I, sprints: S) -> Self {
        Self {
            teams: TeamGuard::new(team_members.clone()),
            orgs: OrgGuard::new(org_members),
            resources: ResourceGuard::new(team_members, ideas, sprints),
        }
    }

    pub fn require_session(&self, session: &Session) -> Result<PrincipalId, AccessError> {
        require_session(session)
    }

    pub fn require_self(&self, session: &Session, requested_user_id: PrincipalId) -> Result<PrincipalId, AccessError> {
        require_self(session, requested_user_id)
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(name = "require_team_member", skip(self, session), err))]
    pub async fn require_team_member(&self, session: &Session, team_id: i64) -> Result<TeamAccess, AccessError> {
        self.teams.require_member(session, team_id).await
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(name = "require_team_admin", skip(self, session), err))]
    pub async fn require_team_admin(&self, session: &Session, team_id: i64) -> Result<TeamAccess, AccessError> {
        self.teams.require_admin(session, team_id).await
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(name = "require_idea_access", skip(self, session), err))]
    pub async fn require_idea_access(&self, session: &Session, idea_id: i64) -> Result<ResourceAccess, AccessError> {
        self.resources.require_idea_access(session, idea_id).await
    }

    pub async fn require_idea_owner(&self, session: &Session, idea_id: i64) -> Result<ResourceAccess, AccessError> {
        self.resources.require_idea_owner(session, idea_id).await
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(name = "require_sprint_access", skip(self, session), err))]
    pub async fn require_sprint_access(
        &self,
        session: &Session,
        sprint_id: i64,
    ) -> Result<ResourceAccess, AccessError> {
        self.resources.require_sprint_access(session, sprint_id).await
    }

    pub async fn require_sprint_owner(
        &self,
        session: &Session,
        sprint_id: i64,
    ) -> Result<ResourceAccess, AccessError> {
        self.resources.require_sprint_owner(session, sprint_id).await
    }

    pub async fn require_org_member(&self, session: &Session, org_id: i64) -> Result<OrgAccess, AccessError> {
        self.orgs.require_member(session, org_id).await
    }

    pub async fn require_org_role(
        &self,
        session: &Session,
        org_id: i64,
        allowed: &[OrgRole],
    ) -> Result<OrgAccess, AccessError> {
        self.orgs.require_role(session, org_id, allowed).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{MockAccessStore, TeamRole};

    type Guards = AccessGuards<MockAccessStore, MockAccessStore, MockAccessStore, MockAccessStore>;

    fn guards(store: &MockAccessStore) -> Guards {
        AccessGuards::new(store.clone(), store.clone(), store.clone(), store.clone())
    }

    #[tokio::test]
    async fn test_unauthenticated_is_distinct_from_forbidden() {
        let store = MockAccessStore::new();
        let team = store.insert_team("Core", None).unwrap();
        let guards = guards(&store);

        let anonymous = guards.require_team_member(&Session::anonymous(), team.id).await;
        assert_eq!(anonymous, Err(AccessError::Unauthenticated));

        let stranger = guards.require_team_member(&Session::authenticated(99), team.id).await;
        assert_eq!(stranger, Err(AccessError::Forbidden));
    }

    #[tokio::test]
    async fn test_team_admin_guard() {
        let store = MockAccessStore::new();
        let team = store.insert_team("Core", None).unwrap();
        store.add_team_member(team.id, 1, TeamRole::Admin).unwrap();
        store.add_team_member(team.id, 2, TeamRole::Member).unwrap();
        let guards = guards(&store);

        let admin = guards.require_team_admin(&Session::authenticated(1), team.id).await.unwrap();
        assert_eq!(admin.role, TeamRole::Admin);

        let member = guards.require_team_member(&Session::authenticated(2), team.id).await.unwrap();
        assert_eq!(member.role, TeamRole::Member);
        assert_eq!(
            guards.require_team_admin(&Session::authenticated(2), team.id).await,
            Err(AccessError::Forbidden)
        );
    }

    #[tokio::test]
    async fn test_require_self() {
        assert_eq!(require_self(&Session::authenticated(3), 3), Ok(3));
        assert_eq!(require_self(&Session::authenticated(3), 4), Err(AccessError::Forbidden));
        assert_eq!(require_self(&Session::anonymous(), 4), Err(AccessError::Unauthenticated));
    }

    #[tokio::test]
    async fn test_idea_owner_then_team_member() {
        let store = MockAccessStore::new();
        let team = store.insert_team("Core", None).unwrap();
        store.add_team_member(team.id, 2, TeamRole::Member).unwrap();
        let idea = store.insert_idea(1, Some(team.id)).unwrap();
        let guards = guards(&store);

        let owner = guards.require_idea_access(&Session::authenticated(1), idea.id).await.unwrap();
        assert!(owner.is_owner);

        let teammate = guards.require_idea_access(&Session::authenticated(2), idea.id).await.unwrap();
        assert!(!teammate.is_owner);
        assert!(teammate.is_team_member);

        assert_eq!(
            guards.require_idea_owner(&Session::authenticated(2), idea.id).await,
            Err(AccessError::Forbidden)
        );
    }

    #[tokio::test]
    async fn test_personal_idea_only_owner() {
        let store = MockAccessStore::new();
        let idea = store.insert_idea(1, None).unwrap();
        let guards = guards(&store);

        assert_eq!(
            guards.require_idea_access(&Session::authenticated(2), idea.id).await,
            Err(AccessError::Forbidden)
        );
    }

    #[tokio::test]
    async fn test_missing_idea_is_not_found() {
        let store = MockAccessStore::new();
        let guards = guards(&store);

        assert_eq!(
            guards.require_idea_access(&Session::authenticated(1), 12345).await,
            Err(AccessError::NotFound)
        );
        assert_eq!(
            guards.require_idea_access(&Session::anonymous(), 12345).await,
            Err(AccessError::Unauthenticated)
        );
    }

    #[tokio::test]
    async fn test_org_membership_alone_does_not_open_team_idea() {
        let store = MockAccessStore::new();
        let org = store.insert_organization("Acme", "acme-aaaaaa").unwrap();
        let team = store.insert_team("Core", Some(org.id)).unwrap();
        store.add_org_member(org.id, 5, OrgRole::BusinessAdmin).unwrap();
        let idea = store.insert_idea(1, Some(team.id)).unwrap();
        let guards = guards(&store);

        assert_eq!(
            guards.require_idea_access(&Session::authenticated(5), idea.id).await,
            Err(AccessError::Forbidden)
        );
    }

    #[tokio::test]
    async fn test_sprint_participant_fallback() {
        let store = MockAccessStore::new();
        let sprint = store.insert_sprint(1, None).unwrap();
        store.add_sprint_participant(sprint.id, 3).unwrap();
        let guards = guards(&store);

        let access = guards.require_sprint_access(&Session::authenticated(3), sprint.id).await.unwrap();
        assert!(access.is_participant);
        assert!(!access.is_owner);

        assert_eq!(
            guards.require_sprint_owner(&Session::authenticated(3), sprint.id).await,
            Err(AccessError::Forbidden)
        );
        assert_eq!(
            guards.require_sprint_access(&Session::authenticated(4), sprint.id).await,
            Err(AccessError::Forbidden)
        );
        assert_eq!(
            guards.require_sprint_access(&Session::authenticated(4), 999).await,
            Err(AccessError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_org_role_guard() {
        let store = MockAccessStore::new();
        let org = store.insert_organization("Acme", "acme-bbbbbb").unwrap();
        store.add_org_member(org.id, 1, OrgRole::BusinessAdmin).unwrap();
        store.add_org_member(org.id, 2, OrgRole::Member).unwrap();
        let guards = guards(&store);

        let admin = guards
            .require_org_role(&Session::authenticated(1), org.id, &[OrgRole::BusinessAdmin])
            .await
            .unwrap();
        assert_eq!(admin.role, OrgRole::BusinessAdmin);

        assert_eq!(
            guards
                .require_org_role(&Session::authenticated(2), org.id, &[OrgRole::BusinessAdmin])
                .await,
            Err(AccessError::Forbidden)
        );
        assert!(guards.require_org_member(&Session::authenticated(2), org.id).await.is_ok());
        assert_eq!(
            guards.require_org_member(&Session::authenticated(3), org.id).await,
            Err(AccessError::Forbidden)
        );
    }
}
