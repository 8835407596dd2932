use std::sync::Arc;

use mockable::{Clock, DefaultClock};

use crate::config::AccessConfig;
use crate::gate::RouteGate;
use crate::guards::AccessGuards;
use crate::invites::{InviteManager, JoinService, OrgScope, TeamScope};
use crate::jwt::JwtService;
use crate::membership::{OnboardingService, OrganizationService, TeamMembershipService};
use crate::repository::{
    IdeaRepository, InviteRepository, OrgMemberRepository, OrganizationRepository, SprintRepository,
    TeamMemberRepository, TeamRepository, UserRepository,
};
use crate::session::{RoleFactCache, SessionResolver};

/// A full set of repositories the HTTP layer can build its services from.
pub trait AccessBackend: Clone + Send + Sync + 'static {
    type Users: UserRepository + Clone + 'static;
    type Organizations: OrganizationRepository + Clone + 'static;
    type OrgMembers: OrgMemberRepository + Clone + 'static;
    type Teams: TeamRepository + Clone + 'static;
    type TeamMembers: TeamMemberRepository + Clone + 'static;
    type Resources: IdeaRepository + SprintRepository + Clone + 'static;
    type Invites: InviteRepository<TeamScope> + InviteRepository<OrgScope> + Clone + 'static;

    fn users(&self) -> Self::Users;
    fn organizations(&self) -> Self::Organizations;
    fn org_members(&self) -> Self::OrgMembers;
    fn teams(&self) -> Self::Teams;
    fn team_members(&self) -> Self::TeamMembers;
    fn resources(&self) -> Self::Resources;
    fn invites(&self) -> Self::Invites;
}

#[cfg(any(test, feature = "mocks"))]
impl AccessBackend for crate::repository::MockAccessStore {
    type Users = Self;
    type Organizations = Self;
    type OrgMembers = Self;
    type Teams = Self;
    type TeamMembers = Self;
    type Resources = Self;
    type Invites = Self;

    fn users(&self) -> Self {
        self.clone()
    }
    fn organizations(&self) -> Self {
        self.clone()
    }
    fn org_members(&self) -> Self {
        self.clone()
    }
    fn teams(&self) -> Self {
        self.clone()
    }
    fn team_members(&self) -> Self {
        self.clone()
    }
    fn resources(&self) -> Self {
        self.clone()
    }
    fn invites(&self) -> Self {
        self.clone()
    }
}

#[cfg(feature = "sqlx_postgres")]
impl AccessBackend for crate::postgres::PostgresRepositories {
    type Users = crate::postgres::PostgresUserRepository;
    type Organizations = crate::postgres::PostgresOrganizationRepository;
    type OrgMembers = crate::postgres::PostgresOrgMemberRepository;
    type Teams = crate::postgres::PostgresTeamRepository;
    type TeamMembers = crate::postgres::PostgresTeamMemberRepository;
    type Resources = crate::postgres::PostgresResourceRepository;
    type Invites = crate::postgres::PostgresInviteRepository;

    fn users(&self) -> Self::Users {
        self.users.clone()
    }
    fn organizations(&self) -> Self::Organizations {
        self.organizations.clone()
    }
    fn org_members(&self) -> Self::OrgMembers {
        self.org_members.clone()
    }
    fn teams(&self) -> Self::Teams {
        self.teams.clone()
    }
    fn team_members(&self) -> Self::TeamMembers {
        self.team_members.clone()
    }
    fn resources(&self) -> Self::Resources {
        self.resources.clone()
    }
    fn invites(&self) -> Self::Invites {
        self.invites.clone()
    }
}

pub type TeamInvites<B> = InviteManager<
    TeamScope,
    <B as AccessBackend>::Invites,
    <B as AccessBackend>::TeamMembers,
    <B as AccessBackend>::Users,
>;

pub type OrgInvites<B> = InviteManager<
    OrgScope,
    <B as AccessBackend>::Invites,
    <B as AccessBackend>::OrgMembers,
    <B as AccessBackend>::Users,
>;

/// Application state shared by every access route.
pub struct AccessState<B: AccessBackend> {
    pub jwt: JwtService,
    pub cache: Arc<RoleFactCache>,
    pub gate: Arc<RouteGate>,
    pub guards: Arc<AccessGuards<B::TeamMembers, B::OrgMembers, B::Resources, B::Resources>>,
    pub teams: Arc<TeamMembershipService<B::Teams, B::TeamMembers, B::OrgMembers>>,
    pub organizations: Arc<OrganizationService<B::Organizations, B::OrgMembers>>,
    pub onboarding: Arc<OnboardingService<B::Users>>,
    pub team_invites: Arc<TeamInvites<B>>,
    pub org_invites: Arc<OrgInvites<B>>,
    pub join: Arc<JoinService<Arc<TeamInvites<B>>, Arc<OrgInvites<B>>>>,
    /// Time source shared by every service and the invite responses.
    pub clock: Arc<dyn Clock>,
}

impl<B: AccessBackend> Clone for AccessState<B> {
    fn clone(&self) -> Self {
        Self {
            jwt: self.jwt.clone(),
            cache: Arc::clone(&self.cache),
            gate: Arc::clone(&self.gate),
            guards: Arc::clone(&self.guards),
            teams: Arc::clone(&self.teams),
            organizations: Arc::clone(&self.organizations),
            onboarding: Arc::clone(&self.onboarding),
            team_invites: Arc::clone(&self.team_invites),
            org_invites: Arc::clone(&self.org_invites),
            join: Arc::clone(&self.join),
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<B: AccessBackend> AccessState<B> {
    /// Wires every service over `backend` with one shared role-fact cache.
    pub fn new(backend: &B, jwt: JwtService, config: AccessConfig) -> Self {
        Self::with_clock(backend, jwt, config, Arc::new(DefaultClock))
    }

    /// Like [`AccessState::new`] but reads time from `clock`.
    pub fn with_clock(backend: &B, jwt: JwtService, config: AccessConfig, clock: Arc<dyn Clock>) -> Self {
        let resolver = Arc::new(SessionResolver::new(
            backend.users(),
            backend.org_members(),
            backend.team_members(),
        ));
        let cache = Arc::new(RoleFactCache::with_clock(
            resolver,
            config.role_cache_ttl,
            Arc::clone(&clock),
        ));

        let team_invites = Arc::new(InviteManager::with_config(
            backend.invites(),
            backend.team_members(),
            backend.users(),
            Arc::clone(&cache),
            config.invites.clone(),
        )
        .with_clock(Arc::clone(&clock)));
        let org_invites = Arc::new(InviteManager::with_config(
            backend.invites(),
            backend.org_members(),
            backend.users(),
            Arc::clone(&cache),
            config.invites.clone(),
        )
        .with_clock(Arc::clone(&clock)));

        Self {
            jwt,
            gate: Arc::new(RouteGate::new(config.gate)),
            guards: Arc::new(AccessGuards::new(
                backend.team_members(),
                backend.org_members(),
                backend.resources(),
                backend.resources(),
            )),
            teams: Arc::new(
                TeamMembershipService::new(
                    backend.teams(),
                    backend.team_members(),
                    backend.org_members(),
                    Arc::clone(&cache),
                )
                .with_clock(Arc::clone(&clock)),
            ),
            organizations: Arc::new(
                OrganizationService::new(backend.organizations(), backend.org_members(), Arc::clone(&cache))
                    .with_clock(Arc::clone(&clock)),
            ),
            onboarding: Arc::new(OnboardingService::new(backend.users(), Arc::clone(&cache))),
            join: Arc::new(JoinService::new(Arc::clone(&team_invites), Arc::clone(&org_invites))),
            team_invites,
            org_invites,
            cache,
            clock,
        }
    }
}
