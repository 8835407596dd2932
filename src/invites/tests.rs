use std::sync::Arc;

use chrono::Duration;
use mockable::Clock;

use super::*;
use crate::config::InviteConfig;
use crate::crypto::INVITE_CODE_LENGTH;
use crate::repository::{
    CreateInvite, InviteRepository, MockAccessStore, OrgMemberRepository, OrgRole,
    TeamMemberRepository, TeamRole,
};
use crate::session::{RoleFactCache, Session, SessionResolver};
use crate::test_support::MutableClock;
use crate::AccessError;

type TeamInvites = InviteManager<TeamScope, MockAccessStore, MockAccessStore, MockAccessStore>;
type OrgInvites = InviteManager<OrgScope, MockAccessStore, MockAccessStore, MockAccessStore>;

struct Fixture {
    store: MockAccessStore,
    clock: Arc<MutableClock>,
    cache: Arc<RoleFactCache>,
    teams: TeamInvites,
    orgs: OrgInvites,
}

impl Fixture {
    fn new() -> Self {
        let store = MockAccessStore::new();
        let clock = Arc::new(MutableClock::starting_now());
        let resolver = Arc::new(SessionResolver::new(store.clone(), store.clone(), store.clone()));
        let cache = Arc::new(RoleFactCache::with_clock(resolver, Duration::minutes(5), clock.clone()));
        let teams = InviteManager::new(store.clone(), store.clone(), store.clone(), cache.clone())
            .with_clock(clock.clone());
        let orgs = InviteManager::new(store.clone(), store.clone(), store.clone(), cache.clone())
            .with_clock(clock.clone());
        Self {
            store,
            clock,
            cache,
            teams,
            orgs,
        }
    }

    /// A team with one admin; returns (team_id, admin_id).
    fn team_with_admin(&self) -> (i64, i64) {
        let admin = self.store.insert_user("admin@acme.io").unwrap();
        let team = self.store.insert_team("Core", None).unwrap();
        self.store.add_team_member(team.id, admin.id, TeamRole::Admin).unwrap();
        (team.id, admin.id)
    }

    async fn seed_team_invite(&self, team_id: i64, admin_id: i64, code: &str, email: Option<&str>) -> Invite<TeamScope> {
        InviteRepository::<TeamScope>::create(
            &self.store,
            CreateInvite {
                scope_id: team_id,
                email: email.map(ToOwned::to_owned),
                role: TeamRole::Member,
                code: code.to_owned(),
                created_by: admin_id,
                expires_at: self.clock.utc() + Duration::days(7),
            },
        )
        .await
        .unwrap()
    }
}

#[tokio::test]
async fn test_create_requires_team_admin() {
    let fx = Fixture::new();
    let (team_id, admin_id) = fx.team_with_admin();
    let member = fx.store.insert_user("member@acme.io").unwrap();
    fx.store.add_team_member(team_id, member.id, TeamRole::Member).unwrap();

    let denied = fx
        .teams
        .create(&Session::authenticated(member.id), team_id, TeamRole::Member, None)
        .await;
    assert_eq!(denied, Err(AccessError::Forbidden));

    let anonymous = fx.teams.create(&Session::anonymous(), team_id, TeamRole::Member, None).await;
    assert_eq!(anonymous, Err(AccessError::Unauthenticated));

    let invite = fx
        .teams
        .create(&Session::authenticated(admin_id), team_id, TeamRole::Member, None)
        .await
        .unwrap();
    assert_eq!(invite.code.len(), 8);
    assert!(invite.code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    assert!(!invite.used);
    assert_eq!(invite.state(fx.clock.utc()), InviteState::Active);
    assert_eq!(invite.expires_at, fx.clock.utc() + Duration::days(7));
}

#[tokio::test]
async fn test_create_normalizes_and_validates_email() {
    let fx = Fixture::new();
    let (team_id, admin_id) = fx.team_with_admin();
    let session = Session::authenticated(admin_id);

    let invite = fx
        .teams
        .create(&session, team_id, TeamRole::Admin, Some(" New.Hire@Acme.IO "))
        .await
        .unwrap();
    assert_eq!(invite.email.as_deref(), Some("new.hire@acme.io"));
    assert_eq!(invite.role, TeamRole::Admin);

    let invalid = fx.teams.create(&session, team_id, TeamRole::Member, Some("not-an-email")).await;
    assert!(matches!(invalid, Err(AccessError::Validation(_))));
}

#[tokio::test]
async fn test_redeem_happy_path_then_used() {
    let fx = Fixture::new();
    let (team_id, admin_id) = fx.team_with_admin();
    fx.seed_team_invite(team_id, admin_id, "AB12CD34", None).await;
    let joiner = fx.store.insert_user("joiner@example.com").unwrap();
    let other = fx.store.insert_user("other@example.com").unwrap();

    let outcome = fx.teams.redeem(&Session::authenticated(joiner.id), "AB12CD34").await.unwrap();
    assert_eq!(outcome, RedeemOutcome::joined(team_id));

    let member = TeamMemberRepository::find_by_team_and_user(&fx.store, team_id, joiner.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(member.role, "member");

    let stored = InviteRepository::<TeamScope>::find_by_code(&fx.store, "AB12CD34")
        .await
        .unwrap()
        .unwrap();
    assert!(stored.used);

    let second = fx.teams.redeem(&Session::authenticated(other.id), "AB12CD34").await.unwrap();
    assert_eq!(second, RedeemOutcome::failed());
}

#[tokio::test]
async fn test_second_redemption_by_same_user_is_idempotent() {
    let fx = Fixture::new();
    let (team_id, admin_id) = fx.team_with_admin();
    fx.seed_team_invite(team_id, admin_id, "AB12CD34", None).await;
    let joiner = fx.store.insert_user("joiner@example.com").unwrap();
    let session = Session::authenticated(joiner.id);

    assert!(fx.teams.redeem(&session, "AB12CD34").await.unwrap().success);
    assert!(fx.teams.redeem(&session, "ab12cd34").await.unwrap().success);

    let members = TeamMemberRepository::find_by_team(&fx.store, team_id).await.unwrap();
    assert_eq!(members.iter().filter(|m| m.user_id == joiner.id).count(), 1);
}

#[tokio::test]
async fn test_expired_invite_fails_even_unused() {
    let fx = Fixture::new();
    let (team_id, admin_id) = fx.team_with_admin();
    fx.seed_team_invite(team_id, admin_id, "AB12CD34", None).await;
    let joiner = fx.store.insert_user("joiner@example.com").unwrap();

    fx.clock.advance(Duration::days(8));

    let outcome = fx.teams.redeem(&Session::authenticated(joiner.id), "AB12CD34").await.unwrap();
    assert_eq!(outcome, RedeemOutcome::failed());
    assert!(
        TeamMemberRepository::find_by_team_and_user(&fx.store, team_id, joiner.id)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_email_restricted_invite() {
    let fx = Fixture::new();
    let (team_id, admin_id) = fx.team_with_admin();
    fx.seed_team_invite(team_id, admin_id, "EMAIL123", Some("alice@acme.io")).await;
    let bob = fx.store.insert_user("bob@acme.io").unwrap();
    let alice = fx.store.insert_user("alice@acme.io").unwrap();

    let wrong = fx.teams.redeem(&Session::authenticated(bob.id), "EMAIL123").await.unwrap();
    assert!(!wrong.success);

    let right = fx.teams.redeem(&Session::authenticated(alice.id), "EMAIL123").await.unwrap();
    assert!(right.success);
}

#[tokio::test]
async fn test_malformed_and_unknown_codes_fail_closed() {
    let fx = Fixture::new();
    let user = fx.store.insert_user("u@example.com").unwrap();
    let session = Session::authenticated(user.id);

    for code in ["", "SHORT", "AB12CD34X", "AB12-D34", "NOPE0000"] {
        assert_eq!(fx.teams.redeem(&session, code).await.unwrap(), RedeemOutcome::failed());
    }
    assert_eq!(
        fx.teams.redeem(&Session::anonymous(), "AB12CD34").await,
        Err(AccessError::Unauthenticated)
    );
}

#[tokio::test]
async fn test_redeem_invalidates_cached_facts() {
    let fx = Fixture::new();
    let (team_id, admin_id) = fx.team_with_admin();
    fx.seed_team_invite(team_id, admin_id, "CACHE001", None).await;
    let joiner = fx.store.insert_user("joiner@example.com").unwrap();

    let before = fx.cache.get(joiner.id).await.unwrap();
    assert!(before.team_ids.is_empty());

    fx.teams.redeem(&Session::authenticated(joiner.id), "CACHE001").await.unwrap();

    let after = fx.cache.get(joiner.id).await.unwrap();
    assert_eq!(after.team_ids, vec![team_id]);
}

#[tokio::test]
async fn test_org_redeem_refuses_member_of_other_org() {
    let fx = Fixture::new();
    let acme = fx.store.insert_organization("Acme", "acme-111111").unwrap();
    let globex = fx.store.insert_organization("Globex", "globex-222222").unwrap();
    let user = fx.store.insert_user("dual@example.com").unwrap();
    fx.store.add_org_member(globex.id, user.id, OrgRole::Member).unwrap();

    InviteRepository::<OrgScope>::create(
        &fx.store,
        CreateInvite {
            scope_id: acme.id,
            email: None,
            role: OrgRole::Member,
            code: "ORGJOIN1".into(),
            created_by: 1,
            expires_at: fx.clock.utc() + Duration::days(7),
        },
    )
    .await
    .unwrap();

    let outcome = fx.orgs.redeem(&Session::authenticated(user.id), "ORGJOIN1").await.unwrap();
    assert!(!outcome.success);

    let membership = OrgMemberRepository::find_by_user(&fx.store, user.id).await.unwrap().unwrap();
    assert_eq!(membership.org_id, globex.id);
}

#[tokio::test]
async fn test_list_only_active_invites() {
    let fx = Fixture::new();
    let (team_id, admin_id) = fx.team_with_admin();
    let admin = Session::authenticated(admin_id);

    let old = fx.teams.create(&admin, team_id, TeamRole::Member, None).await.unwrap();
    fx.clock.advance(Duration::days(5));
    let used = fx.teams.create(&admin, team_id, TeamRole::Member, None).await.unwrap();
    let fresh = fx.teams.create(&admin, team_id, TeamRole::Member, None).await.unwrap();
    let joiner = fx.store.insert_user("joiner@example.com").unwrap();
    fx.teams.redeem(&Session::authenticated(joiner.id), &used.code).await.unwrap();
    fx.clock.advance(Duration::days(3));

    let listed = fx.teams.list(&admin, team_id).await.unwrap();
    let ids: Vec<i64> = listed.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![fresh.id]);
    assert!(!ids.contains(&old.id));

    assert_eq!(
        fx.teams.list(&Session::authenticated(joiner.id), team_id).await,
        Err(AccessError::Forbidden)
    );
}

#[tokio::test]
async fn test_revoke() {
    let fx = Fixture::new();
    let (team_id, admin_id) = fx.team_with_admin();
    let admin = Session::authenticated(admin_id);
    let invite = fx.teams.create(&admin, team_id, TeamRole::Member, None).await.unwrap();
    let outsider = fx.store.insert_user("outsider@example.com").unwrap();

    assert_eq!(
        fx.teams.revoke(&Session::authenticated(outsider.id), invite.id).await,
        Err(AccessError::Forbidden)
    );
    assert_eq!(fx.teams.revoke(&admin, 987_654).await, Err(AccessError::NotFound));

    fx.teams.revoke(&admin, invite.id).await.unwrap();
    let redeemed = fx.teams.redeem(&Session::authenticated(outsider.id), &invite.code).await.unwrap();
    assert!(!redeemed.success);
}

#[tokio::test]
async fn test_prune_expired() {
    let fx = Fixture::new();
    let (team_id, admin_id) = fx.team_with_admin();
    let admin = Session::authenticated(admin_id);
    fx.teams.create(&admin, team_id, TeamRole::Member, None).await.unwrap();
    fx.clock.advance(Duration::days(6));
    fx.teams.create(&admin, team_id, TeamRole::Member, None).await.unwrap();
    fx.clock.advance(Duration::days(2));

    assert_eq!(fx.teams.prune_expired().await.unwrap(), 1);
    assert_eq!(fx.store.invite_count().unwrap(), 1);
}

#[tokio::test]
async fn test_custom_expiry() {
    let store = MockAccessStore::new();
    let clock = Arc::new(MutableClock::starting_now());
    let resolver = Arc::new(SessionResolver::new(store.clone(), store.clone(), store.clone()));
    let cache = Arc::new(RoleFactCache::new(resolver, Duration::minutes(5)));
    let config = InviteConfig {
        expiry: Duration::hours(1),
    };
    let teams: TeamInvites =
        InviteManager::with_config(store.clone(), store.clone(), store.clone(), cache, config)
            .with_clock(clock.clone());

    let admin = store.insert_user("admin@acme.io").unwrap();
    let team = store.insert_team("Core", None).unwrap();
    store.add_team_member(team.id, admin.id, TeamRole::Admin).unwrap();

    let invite = teams
        .create(&Session::authenticated(admin.id), team.id, TeamRole::Member, None)
        .await
        .unwrap();
    assert_eq!(invite.expires_at, clock.utc() + Duration::hours(1));
    assert_eq!(invite.code.len(), INVITE_CODE_LENGTH);

    // Codes are fixed-width whatever the expiry settings.
    let session = Session::authenticated(admin.id);
    let truncated = &invite.code[..INVITE_CODE_LENGTH - 1];
    assert_eq!(teams.redeem(&session, truncated).await.unwrap(), RedeemOutcome::failed());
}

#[tokio::test]
async fn test_join_falls_back_to_org() {
    let fx = Fixture::new();
    let org = fx.store.insert_organization("Acme", "acme-333333").unwrap();
    InviteRepository::<OrgScope>::create(
        &fx.store,
        CreateInvite {
            scope_id: org.id,
            email: None,
            role: OrgRole::TeamAdmin,
            code: "ORGONLY1".into(),
            created_by: 1,
            expires_at: fx.clock.utc() + Duration::days(7),
        },
    )
    .await
    .unwrap();
    let user = fx.store.insert_user("new@example.com").unwrap();

    let join = JoinService::new(fx.teams, fx.orgs);
    let outcome = join.join(&Session::authenticated(user.id), "ORGONLY1").await.unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.scope, Some(ScopeKind::Organization));
    assert_eq!(outcome.scope_id, Some(org.id));

    let bad = join.join(&Session::authenticated(user.id), "ZZZZZZZZ").await.unwrap();
    assert!(!bad.success);
    assert_eq!(bad.scope, None);
}

#[tokio::test]
async fn test_join_prefers_team() {
    let fx = Fixture::new();
    let (team_id, admin_id) = fx.team_with_admin();
    fx.seed_team_invite(team_id, admin_id, "TEAMJOIN", None).await;
    let user = fx.store.insert_user("new@example.com").unwrap();

    let join = JoinService::new(fx.teams, fx.orgs);
    let outcome = join.join(&Session::authenticated(user.id), "teamjoin").await.unwrap();
    assert_eq!(outcome.scope, Some(ScopeKind::Team));
    assert_eq!(outcome.scope_id, Some(team_id));
}
