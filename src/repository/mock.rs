#![allow(clippy::significant_drop_tightening)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    AccountType, CreateInvite, CreateOrganization, CreateTeam, GuardedWrite, Idea, IdeaRepository,
    InviteRepository, OrgMember, OrgMemberRepository, OrgRole, Organization,
    OrganizationRepository, Role, Sprint, SprintRepository, Team, TeamMember,
    TeamMemberRepository, TeamRepository, TeamRole, User, UserRepository,
};
use crate::AccessError;
use crate::invites::{Invite, InviteScope, ScopeKind};
use crate::validators::ValidationError;

/// Invite row with its role kept as the stored string.
#[derive(Debug, Clone)]
struct StoredInvite {
    id: i64,
    kind: ScopeKind,
    scope_id: i64,
    email: Option<String>,
    role: String,
    code: String,
    created_by: i64,
    expires_at: DateTime<Utc>,
    used: bool,
    created_at: DateTime<Utc>,
}

impl StoredInvite {
    fn to_invite<S: InviteScope>(&self) -> Result<Invite<S>, AccessError> {
        let role = S::Role::from_str(&self.role)
            .ok_or_else(|| AccessError::Internal(format!("unknown invite role {}", self.role)))?;
        Ok(Invite {
            id: self.id,
            scope: S::default(),
            scope_id: self.scope_id,
            email: self.email.clone(),
            role,
            code: self.code.clone(),
            created_by: self.created_by,
            expires_at: self.expires_at,
            used: self.used,
            created_at: self.created_at,
        })
    }
}

#[derive(Default)]
struct Tables {
    users: HashMap<i64, User>,
    organizations: HashMap<i64, Organization>,
    org_members: HashMap<i64, OrgMember>,
    teams: HashMap<i64, Team>,
    team_members: HashMap<i64, TeamMember>,
    ideas: HashMap<i64, Idea>,
    sprints: HashMap<i64, Sprint>,
    sprint_participants: HashSet<(i64, i64)>,
    invites: HashMap<i64, StoredInvite>,
}

impl Tables {
    fn team_member(&self, team_id: i64, user_id: i64) -> Option<&TeamMember> {
        self.team_members
            .values()
            .find(|m| m.team_id == team_id && m.user_id == user_id)
    }

    fn org_member_of_user(&self, user_id: i64) -> Option<&OrgMember> {
        self.org_members.values().find(|m| m.user_id == user_id)
    }

    fn team_admin_count(&self, team_id: i64) -> usize {
        self.team_members
            .values()
            .filter(|m| m.team_id == team_id && m.is_admin())
            .count()
    }

    fn org_admin_count(&self, org_id: i64) -> usize {
        self.org_members
            .values()
            .filter(|m| m.org_id == org_id && m.parse_role() == Some(OrgRole::BusinessAdmin))
            .count()
    }
}

/// In-memory store implementing every repository trait of the crate.
///
/// All tables sit behind one lock, so multi-row writes such as invite
/// redemption and guarded admin demotion are atomic. Clones share state.
#[derive(Clone)]
pub struct MockAccessStore {
    tables: Arc<RwLock<Tables>>,
    next_id: Arc<AtomicI64>,
}

impl MockAccessStore {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
            next_id: Arc::new(AtomicI64::new(1)),
        }
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, AccessError> {
        self.tables
            .read()
            .map_err(|_| AccessError::Internal("lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, AccessError> {
        self.tables
            .write()
            .map_err(|_| AccessError::Internal("lock poisoned".into()))
    }

    fn new_user(&self, email: &str, auth_subject: Option<&str>) -> User {
        let now = Utc::now();
        User {
            id: self.next_id(),
            email: email.to_owned(),
            auth_subject: auth_subject.map(ToOwned::to_owned),
            onboarding_complete: false,
            account_type: AccountType::Individual,
            created_at: now,
            updated_at: now,
        }
    }

    // Seeding helpers for tests. They bypass the invariants the services enforce.

    /// Inserts a user with onboarding already completed.
    pub fn insert_user(&self, email: &str) -> Result<User, AccessError> {
        let mut user = self.new_user(email, None);
        user.onboarding_complete = true;
        self.write()?.users.insert(user.id, user.clone());
        Ok(user)
    }

    /// Inserts a team with no members.
    pub fn insert_team(&self, name: &str, org_id: Option<i64>) -> Result<Team, AccessError> {
        let now = Utc::now();
        let team = Team {
            id: self.next_id(),
            name: name.to_owned(),
            org_id,
            created_at: now,
            updated_at: now,
        };
        self.write()?.teams.insert(team.id, team.clone());
        Ok(team)
    }

    /// Inserts an organization with no members.
    pub fn insert_organization(&self, name: &str, slug: &str) -> Result<Organization, AccessError> {
        let now = Utc::now();
        let org = Organization {
            id: self.next_id(),
            name: name.to_owned(),
            slug: slug.to_owned(),
            email_domain: None,
            created_at: now,
            updated_at: now,
        };
        self.write()?.organizations.insert(org.id, org.clone());
        Ok(org)
    }

    pub fn add_team_member(
        &self,
        team_id: i64,
        user_id: i64,
        role: TeamRole,
    ) -> Result<TeamMember, AccessError> {
        let now = Utc::now();
        let member = TeamMember {
            id: self.next_id(),
            team_id,
            user_id,
            role: role.as_str().to_owned(),
            created_at: now,
            updated_at: now,
        };
        self.write()?.team_members.insert(member.id, member.clone());
        Ok(member)
    }

    pub fn add_org_member(
        &self,
        org_id: i64,
        user_id: i64,
        role: OrgRole,
    ) -> Result<OrgMember, AccessError> {
        let now = Utc::now();
        let member = OrgMember {
            id: self.next_id(),
            org_id,
            user_id,
            role: role.as_str().to_owned(),
            created_at: now,
            updated_at: now,
        };
        self.write()?.org_members.insert(member.id, member.clone());
        Ok(member)
    }

    pub fn insert_idea(&self, owner_id: i64, team_id: Option<i64>) -> Result<Idea, AccessError> {
        let idea = Idea {
            id: self.next_id(),
            owner_id,
            team_id,
        };
        self.write()?.ideas.insert(idea.id, idea);
        Ok(idea)
    }

    pub fn insert_sprint(&self, owner_id: i64, team_id: Option<i64>) -> Result<Sprint, AccessError> {
        let sprint = Sprint {
            id: self.next_id(),
            owner_id,
            team_id,
        };
        self.write()?.sprints.insert(sprint.id, sprint);
        Ok(sprint)
    }

    pub fn add_sprint_participant(&self, sprint_id: i64, user_id: i64) -> Result<(), AccessError> {
        self.write()?.sprint_participants.insert((sprint_id, user_id));
        Ok(())
    }

    /// Number of invites stored for any scope, expired ones included.
    pub fn invite_count(&self) -> Result<usize, AccessError> {
        Ok(self.read()?.invites.len())
    }
}

impl Default for MockAccessStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for MockAccessStore {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, AccessError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AccessError> {
        Ok(self.read()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_subject(&self, subject: &str) -> Result<Option<User>, AccessError> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.auth_subject.as_deref() == Some(subject))
            .cloned())
    }

    async fn provision_by_email(&self, email: &str) -> Result<User, AccessError> {
        let mut tables = self.write()?;
        if let Some(user) = tables.users.values().find(|u| u.email == email) {
            return Ok(user.clone());
        }
        let user = self.new_user(email, None);
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn provision_by_subject(&self, subject: &str, email: &str) -> Result<User, AccessError> {
        let mut tables = self.write()?;
        if let Some(user) = tables
            .users
            .values()
            .find(|u| u.auth_subject.as_deref() == Some(subject))
        {
            return Ok(user.clone());
        }
        if let Some(user) = tables
            .users
            .values_mut()
            .find(|u| u.email == email && u.auth_subject.is_none())
        {
            user.auth_subject = Some(subject.to_owned());
            user.updated_at = Utc::now();
            return Ok(user.clone());
        }
        let user = self.new_user(email, Some(subject));
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn complete_onboarding(
        &self,
        user_id: i64,
        account_type: AccountType,
    ) -> Result<User, AccessError> {
        let mut tables = self.write()?;
        let user = tables.users.get_mut(&user_id).ok_or(AccessError::NotFound)?;
        user.onboarding_complete = true;
        user.account_type = account_type;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }
}

#[async_trait]
impl OrganizationRepository for MockAccessStore {
    async fn create_with_admin(
        &self,
        data: CreateOrganization,
    ) -> Result<(Organization, OrgMember), AccessError> {
        let mut tables = self.write()?;
        if tables.org_member_of_user(data.creator_id).is_some() {
            return Err(AccessError::AlreadyInOrganization);
        }
        if tables.organizations.values().any(|o| o.slug == data.slug) {
            return Err(AccessError::DatabaseError("duplicate organization slug".into()));
        }
        if let Some(domain) = &data.email_domain {
            let taken = tables
                .organizations
                .values()
                .filter_map(|o| o.email_domain.as_deref())
                .any(|existing| existing.eq_ignore_ascii_case(domain));
            if taken {
                return Err(ValidationError::DomainTaken.into());
            }
        }

        let now = Utc::now();
        let org = Organization {
            id: self.next_id(),
            name: data.name,
            slug: data.slug,
            email_domain: data.email_domain,
            created_at: now,
            updated_at: now,
        };
        let member = OrgMember {
            id: self.next_id(),
            org_id: org.id,
            user_id: data.creator_id,
            role: OrgRole::BusinessAdmin.as_str().to_owned(),
            created_at: now,
            updated_at: now,
        };
        tables.organizations.insert(org.id, org.clone());
        tables.org_members.insert(member.id, member.clone());
        Ok((org, member))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Organization>, AccessError> {
        Ok(self.read()?.organizations.get(&id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Organization>, AccessError> {
        Ok(self
            .read()?
            .organizations
            .values()
            .find(|o| o.slug == slug)
            .cloned())
    }
}

#[async_trait]
impl OrgMemberRepository for MockAccessStore {
    async fn find_by_org_and_user(
        &self,
        org_id: i64,
        user_id: i64,
    ) -> Result<Option<OrgMember>, AccessError> {
        Ok(self
            .read()?
            .org_members
            .values()
            .find(|m| m.org_id == org_id && m.user_id == user_id)
            .cloned())
    }

    async fn find_by_user(&self, user_id: i64) -> Result<Option<OrgMember>, AccessError> {
        Ok(self.read()?.org_member_of_user(user_id).cloned())
    }

    async fn find_by_org(&self, org_id: i64) -> Result<Vec<OrgMember>, AccessError> {
        Ok(self
            .read()?
            .org_members
            .values()
            .filter(|m| m.org_id == org_id)
            .cloned()
            .collect())
    }

    async fn update_role_keeping_admin(
        &self,
        org_id: i64,
        user_id: i64,
        role: OrgRole,
    ) -> Result<GuardedWrite<OrgMember>, AccessError> {
        let mut tables = self.write()?;
        let admins = tables.org_admin_count(org_id);
        let Some(member) = tables
            .org_members
            .values_mut()
            .find(|m| m.org_id == org_id && m.user_id == user_id)
        else {
            return Ok(GuardedWrite::Missing);
        };

        let demotes_admin =
            member.parse_role() == Some(OrgRole::BusinessAdmin) && role != OrgRole::BusinessAdmin;
        if demotes_admin && admins <= 1 {
            return Ok(GuardedWrite::LastAdmin);
        }

        role.as_str().clone_into(&mut member.role);
        member.updated_at = Utc::now();
        Ok(GuardedWrite::Applied(member.clone()))
    }

    async fn delete_keeping_admin(
        &self,
        org_id: i64,
        user_id: i64,
    ) -> Result<GuardedWrite<()>, AccessError> {
        let mut tables = self.write()?;
        let Some(member) = tables
            .org_members
            .values()
            .find(|m| m.org_id == org_id && m.user_id == user_id)
            .cloned()
        else {
            return Ok(GuardedWrite::Missing);
        };

        if member.parse_role() == Some(OrgRole::BusinessAdmin) && tables.org_admin_count(org_id) <= 1 {
            return Ok(GuardedWrite::LastAdmin);
        }

        tables.org_members.remove(&member.id);
        Ok(GuardedWrite::Applied(()))
    }
}

#[async_trait]
impl TeamRepository for MockAccessStore {
    async fn create_with_admin(&self, data: CreateTeam) -> Result<(Team, TeamMember), AccessError> {
        let now = Utc::now();
        let team = Team {
            id: self.next_id(),
            name: data.name,
            org_id: data.org_id,
            created_at: now,
            updated_at: now,
        };
        let member = TeamMember {
            id: self.next_id(),
            team_id: team.id,
            user_id: data.creator_id,
            role: TeamRole::Admin.as_str().to_owned(),
            created_at: now,
            updated_at: now,
        };

        let mut tables = self.write()?;
        tables.teams.insert(team.id, team.clone());
        tables.team_members.insert(member.id, member.clone());
        Ok((team, member))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Team>, AccessError> {
        Ok(self.read()?.teams.get(&id).cloned())
    }

    async fn find_by_org(&self, org_id: i64) -> Result<Vec<Team>, AccessError> {
        Ok(self
            .read()?
            .teams
            .values()
            .filter(|t| t.org_id == Some(org_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TeamMemberRepository for MockAccessStore {
    async fn find_by_team_and_user(
        &self,
        team_id: i64,
        user_id: i64,
    ) -> Result<Option<TeamMember>, AccessError> {
        Ok(self.read()?.team_member(team_id, user_id).cloned())
    }

    async fn find_by_team(&self, team_id: i64) -> Result<Vec<TeamMember>, AccessError> {
        Ok(self
            .read()?
            .team_members
            .values()
            .filter(|m| m.team_id == team_id)
            .cloned()
            .collect())
    }

    async fn find_by_user(&self, user_id: i64) -> Result<Vec<TeamMember>, AccessError> {
        Ok(self
            .read()?
            .team_members
            .values()
            .filter(|m| m.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_role_keeping_admin(
        &self,
        team_id: i64,
        user_id: i64,
        role: TeamRole,
    ) -> Result<GuardedWrite<TeamMember>, AccessError> {
        let mut tables = self.write()?;
        let admins = tables.team_admin_count(team_id);
        let Some(member) = tables
            .team_members
            .values_mut()
            .find(|m| m.team_id == team_id && m.user_id == user_id)
        else {
            return Ok(GuardedWrite::Missing);
        };

        if member.is_admin() && role != TeamRole::Admin && admins <= 1 {
            return Ok(GuardedWrite::LastAdmin);
        }

        role.as_str().clone_into(&mut member.role);
        member.updated_at = Utc::now();
        Ok(GuardedWrite::Applied(member.clone()))
    }

    async fn delete_keeping_admin(
        &self,
        team_id: i64,
        user_id: i64,
    ) -> Result<GuardedWrite<()>, AccessError> {
        let mut tables = self.write()?;
        let Some(member) = tables.team_member(team_id, user_id).cloned() else {
            return Ok(GuardedWrite::Missing);
        };

        if member.is_admin() && tables.team_admin_count(team_id) <= 1 {
            return Ok(GuardedWrite::LastAdmin);
        }

        tables.team_members.remove(&member.id);
        Ok(GuardedWrite::Applied(()))
    }
}

#[async_trait]
impl IdeaRepository for MockAccessStore {
    async fn find_idea(&self, id: i64) -> Result<Option<Idea>, AccessError> {
        Ok(self.read()?.ideas.get(&id).copied())
    }
}

#[async_trait]
impl SprintRepository for MockAccessStore {
    async fn find_sprint(&self, id: i64) -> Result<Option<Sprint>, AccessError> {
        Ok(self.read()?.sprints.get(&id).copied())
    }

    async fn is_participant(&self, sprint_id: i64, user_id: i64) -> Result<bool, AccessError> {
        Ok(self.read()?.sprint_participants.contains(&(sprint_id, user_id)))
    }
}

#[async_trait]
impl<S: InviteScope> InviteRepository<S> for MockAccessStore {
    async fn create(&self, data: CreateInvite<S>) -> Result<Invite<S>, AccessError> {
        let mut tables = self.write()?;
        if tables.invites.values().any(|i| i.code == data.code) {
            return Err(AccessError::DatabaseError("duplicate invite code".into()));
        }

        let stored = StoredInvite {
            id: self.next_id(),
            kind: S::KIND,
            scope_id: data.scope_id,
            email: data.email,
            role: data.role.as_str().to_owned(),
            code: data.code,
            created_by: data.created_by,
            expires_at: data.expires_at,
            used: false,
            created_at: Utc::now(),
        };
        let invite = stored.to_invite()?;
        tables.invites.insert(stored.id, stored);
        Ok(invite)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Invite<S>>, AccessError> {
        self.read()?
            .invites
            .get(&id)
            .filter(|i| i.kind == S::KIND)
            .map(StoredInvite::to_invite)
            .transpose()
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Invite<S>>, AccessError> {
        self.read()?
            .invites
            .values()
            .find(|i| i.kind == S::KIND && i.code == code)
            .map(StoredInvite::to_invite)
            .transpose()
    }

    async fn find_active_by_scope(
        &self,
        scope_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Invite<S>>, AccessError> {
        self.read()?
            .invites
            .values()
            .filter(|i| i.kind == S::KIND && i.scope_id == scope_id && !i.used && i.expires_at > now)
            .map(StoredInvite::to_invite)
            .collect()
    }

    async fn redeem(
        &self,
        invite_id: i64,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, AccessError> {
        let mut tables = self.write()?;
        let Some(invite) = tables
            .invites
            .get(&invite_id)
            .filter(|i| i.kind == S::KIND && !i.used && i.expires_at > now)
            .cloned()
        else {
            return Ok(false);
        };

        let timestamp = Utc::now();
        match S::KIND {
            ScopeKind::Team => {
                if tables.team_member(invite.scope_id, user_id).is_some() {
                    return Ok(false);
                }
                let member = TeamMember {
                    id: self.next_id(),
                    team_id: invite.scope_id,
                    user_id,
                    role: invite.role.clone(),
                    created_at: timestamp,
                    updated_at: timestamp,
                };
                tables.team_members.insert(member.id, member);
            }
            ScopeKind::Organization => {
                if tables.org_member_of_user(user_id).is_some() {
                    return Ok(false);
                }
                let member = OrgMember {
                    id: self.next_id(),
                    org_id: invite.scope_id,
                    user_id,
                    role: invite.role.clone(),
                    created_at: timestamp,
                    updated_at: timestamp,
                };
                tables.org_members.insert(member.id, member);
            }
        }

        if let Some(stored) = tables.invites.get_mut(&invite_id) {
            stored.used = true;
        }
        Ok(true)
    }

    async fn delete(&self, id: i64) -> Result<(), AccessError> {
        let mut tables = self.write()?;
        if tables.invites.get(&id).is_some_and(|i| i.kind == S::KIND) {
            tables.invites.remove(&id);
        }
        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AccessError> {
        let mut tables = self.write()?;
        let before = tables.invites.len();
        tables
            .invites
            .retain(|_, i| i.kind != S::KIND || i.expires_at > now);
        Ok((before - tables.invites.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invites::{OrgScope, TeamScope};
    use chrono::Duration;

    #[tokio::test]
    async fn test_provision_by_email_is_idempotent() {
        let store = MockAccessStore::new();
        let first = store.provision_by_email("a@acme.io").await.unwrap();
        let second = store.provision_by_email("a@acme.io").await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(!first.onboarding_complete);
    }

    #[tokio::test]
    async fn test_provision_by_subject_links_existing_email() {
        let store = MockAccessStore::new();
        let local = store.provision_by_email("a@acme.io").await.unwrap();
        let linked = store.provision_by_subject("oidc|1", "a@acme.io").await.unwrap();
        assert_eq!(local.id, linked.id);
        assert_eq!(linked.auth_subject.as_deref(), Some("oidc|1"));

        let again = store.provision_by_subject("oidc|1", "changed@acme.io").await.unwrap();
        assert_eq!(again.id, local.id);
    }

    #[tokio::test]
    async fn test_team_last_admin_guard() {
        let store = MockAccessStore::new();
        let team = store.insert_team("Core", None).unwrap();
        store.add_team_member(team.id, 1, TeamRole::Admin).unwrap();
        store.add_team_member(team.id, 2, TeamRole::Member).unwrap();

        let demote =
            TeamMemberRepository::update_role_keeping_admin(&store, team.id, 1, TeamRole::Member)
                .await
                .unwrap();
        assert_eq!(demote, GuardedWrite::LastAdmin);

        let remove = TeamMemberRepository::delete_keeping_admin(&store, team.id, 1).await.unwrap();
        assert_eq!(remove, GuardedWrite::LastAdmin);

        let promote =
            TeamMemberRepository::update_role_keeping_admin(&store, team.id, 2, TeamRole::Admin)
                .await
                .unwrap();
        assert!(matches!(promote, GuardedWrite::Applied(_)));

        let remove = TeamMemberRepository::delete_keeping_admin(&store, team.id, 1).await.unwrap();
        assert_eq!(remove, GuardedWrite::Applied(()));

        let missing = TeamMemberRepository::delete_keeping_admin(&store, team.id, 99).await.unwrap();
        assert_eq!(missing, GuardedWrite::Missing);
    }

    #[tokio::test]
    async fn test_org_create_rejects_second_org() {
        let store = MockAccessStore::new();
        let data = CreateOrganization {
            name: "Acme".into(),
            slug: "acme-abc123".into(),
            email_domain: None,
            creator_id: 5,
        };
        OrganizationRepository::create_with_admin(&store, data.clone()).await.unwrap();

        let second = CreateOrganization {
            slug: "acme-def456".into(),
            ..data
        };
        assert_eq!(
            OrganizationRepository::create_with_admin(&store, second).await.unwrap_err(),
            AccessError::AlreadyInOrganization
        );
    }

    #[tokio::test]
    async fn test_invites_are_partitioned_by_scope() {
        let store = MockAccessStore::new();
        let expires_at = Utc::now() + Duration::days(7);
        let created = InviteRepository::<TeamScope>::create(
            &store,
            CreateInvite {
                scope_id: 3,
                email: None,
                role: TeamRole::Member,
                code: "AB12CD34".into(),
                created_by: 1,
                expires_at,
            },
        )
        .await
        .unwrap();

        let as_team = InviteRepository::<TeamScope>::find_by_code(&store, "AB12CD34").await.unwrap();
        assert_eq!(as_team.map(|i| i.id), Some(created.id));

        let as_org = InviteRepository::<OrgScope>::find_by_code(&store, "AB12CD34").await.unwrap();
        assert!(as_org.is_none());
    }

    #[tokio::test]
    async fn test_redeem_flips_used_once() {
        let store = MockAccessStore::new();
        let now = Utc::now();
        let invite = InviteRepository::<TeamScope>::create(
            &store,
            CreateInvite {
                scope_id: 3,
                email: None,
                role: TeamRole::Member,
                code: "ZZ99YY88".into(),
                created_by: 1,
                expires_at: now + Duration::days(7),
            },
        )
        .await
        .unwrap();

        assert!(InviteRepository::<TeamScope>::redeem(&store, invite.id, 10, now).await.unwrap());
        assert!(!InviteRepository::<TeamScope>::redeem(&store, invite.id, 11, now).await.unwrap());

        let member = TeamMemberRepository::find_by_team_and_user(&store, 3, 10).await.unwrap();
        assert_eq!(member.map(|m| m.role), Some("member".to_owned()));
        assert!(
            TeamMemberRepository::find_by_team_and_user(&store, 3, 11)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_redeem_refuses_expired_at_write_time() {
        let store = MockAccessStore::new();
        let now = Utc::now();
        let invite = InviteRepository::<OrgScope>::create(
            &store,
            CreateInvite {
                scope_id: 3,
                email: None,
                role: OrgRole::Member,
                code: "QQ11WW22".into(),
                created_by: 1,
                expires_at: now,
            },
        )
        .await
        .unwrap();

        assert!(!InviteRepository::<OrgScope>::redeem(&store, invite.id, 10, now).await.unwrap());
        assert!(OrgMemberRepository::find_by_user(&store, 10).await.unwrap().is_none());
    }
}
