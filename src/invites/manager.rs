use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use mockable::{Clock, DefaultClock};

use super::{Invite, InviteScope, InviteState, RedeemOutcome, ScopeMembers};
use crate::config::InviteConfig;
use crate::crypto::{generate_invite_code, normalize_invite_code};
use crate::events::{AccessEvent, dispatch};
use crate::repository::{CreateInvite, InviteRepository, Role, UserRepository};
use crate::session::{RoleFactCache, Session};
use crate::validators::normalize_email;
use crate::{AccessError, PrincipalId};

const MAX_CODE_ATTEMPTS: usize = 5;

/// Redeems invite codes of one scope.
///
/// Seam used by [`JoinService`](super::JoinService) to try team codes before
/// organization codes.
#[async_trait]
pub trait RedeemInvite<S: InviteScope>: Send + Sync {
    async fn redeem(&self, session: &Session, code: &str) -> Result<RedeemOutcome, AccessError>;
}

/// Invite lifecycle for one scope: create, redeem, list, revoke, prune.
///
/// # Example
///
/// ```rust,ignore
/// use tenantry::invites::{InviteManager, TeamScope};
/// use tenantry::TeamRole;
///
/// let manager: InviteManager<TeamScope, _, _, _> =
///     InviteManager::new(invite_repo, member_repo, user_repo, cache.clone());
///
/// let invite = manager.create(&session, team_id, TeamRole::Member, None).await?;
/// let outcome = manager.redeem(&Session::authenticated(joiner), &invite.code).await?;
/// assert!(outcome.success);
/// ```
pub struct InviteManager<S, I, M, U>
where
    S: InviteScope,
    I: InviteRepository<S>,
    M: ScopeMembers<S>,
    U: UserRepository,
{
    invites: I,
    members: M,
    users: U,
    cache: Arc<RoleFactCache>,
    config: InviteConfig,
    clock: Arc<dyn Clock>,
    _scope: PhantomData<S>,
}

impl<S, I, M, U> InviteManager<S, I, M, U>
where
    S: InviteScope,
    I: InviteRepository<S>,
    M: ScopeMembers<S>,
    U: UserRepository,
{
    pub fn new(invites: I, members: M, users: U, cache: Arc<RoleFactCache>) -> Self {
        Self::with_config(invites, members, users, cache, InviteConfig::default())
    }

    pub fn with_config(invites: I, members: M, users: U, cache: Arc<RoleFactCache>, config: InviteConfig) -> Self {
        Self {
            invites,
            members,
            users,
            cache,
            config,
            clock: Arc::new(DefaultClock),
            _scope: PhantomData,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Requires that the caller may manage invites of the scope.
    async fn require_manager(&self, session: &Session, scope_id: i64) -> Result<PrincipalId, AccessError> {
        let principal = session.require()?;

        match self.members.scope_role(scope_id, principal).await? {
            Some(role) if S::manages_invites(&role) => Ok(principal),
            _ => {
                log::debug!(
                    target: "tenantry",
                    "msg=\"access denied\", guard=\"invite_admin\", scope=\"{}\", scope_id={scope_id}, user_id={principal}",
                    S::KIND
                );
                Err(AccessError::Forbidden)
            }
        }
    }

    async fn unused_code(&self) -> Result<String, AccessError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = generate_invite_code();
            if self.invites.find_by_code(&code).await?.is_none() {
                return Ok(code);
            }
        }
        Err(AccessError::Internal("could not allocate a unique invite code".into()))
    }

    fn reject(&self, principal: PrincipalId, reason: &str) -> RedeemOutcome {
        log::info!(
            target: "tenantry",
            "msg=\"invite rejected\", scope=\"{}\", user_id={principal}, reason=\"{reason}\"",
            S::KIND
        );
        RedeemOutcome::failed()
    }

    /// Creates an invite for the scope. Only scope admins may do this.
    ///
    /// `email`, when given, restricts redemption to that address.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "create_invite", skip_all, err))]
    pub async fn create(
        &self,
        session: &Session,
        scope_id: i64,
        role: S::Role,
        email: Option<&str>,
    ) -> Result<Invite<S>, AccessError> {
        let principal = self.require_manager(session, scope_id).await?;
        let email = email.map(normalize_email).transpose()?;
        let now = self.clock.utc();
        let code = self.unused_code().await?;

        let invite = self
            .invites
            .create(CreateInvite {
                scope_id,
                email,
                role,
                code,
                created_by: principal,
                expires_at: now + self.config.expiry,
            })
            .await?;

        log::info!(
            target: "tenantry",
            "msg=\"invite created\", scope=\"{}\", scope_id={scope_id}, invite_id={}, role=\"{}\", user_id={principal}",
            S::KIND,
            invite.id,
            invite.role.as_str()
        );

        dispatch(AccessEvent::InviteCreated {
            scope: S::KIND,
            scope_id,
            invite_id: invite.id,
            created_by: principal,
            at: now,
        })
        .await;

        Ok(invite)
    }

    /// Redeems a code for the caller.
    ///
    /// Unknown, used, expired and email-mismatched codes all produce the
    /// same failed outcome; only storage problems are errors. A caller who
    /// is already a member gets a success without any write.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "redeem_invite", skip_all, err))]
    pub async fn redeem(&self, session: &Session, code: &str) -> Result<RedeemOutcome, AccessError> {
        let principal = session.require()?;
        let now = self.clock.utc();

        let Some(code) = normalize_invite_code(code) else {
            return Ok(self.reject(principal, "malformed"));
        };
        let Some(invite) = self.invites.find_by_code(&code).await? else {
            return Ok(self.reject(principal, "unknown"));
        };

        if invite.state(now) == InviteState::Expired {
            return Ok(self.reject(principal, "expired"));
        }

        if invite.email.is_some() {
            let user = self.users.find_user_by_id(principal).await?;
            if !user.is_some_and(|u| invite.admits_email(&u.email)) {
                return Ok(self.reject(principal, "email_mismatch"));
            }
        }

        if self.members.scope_role(invite.scope_id, principal).await?.is_some() {
            log::debug!(
                target: "tenantry",
                "msg=\"invite redeemed by existing member\", scope=\"{}\", scope_id={}, user_id={principal}",
                S::KIND,
                invite.scope_id
            );
            return Ok(RedeemOutcome::joined(invite.scope_id));
        }

        if invite.used {
            return Ok(self.reject(principal, "used"));
        }

        if let Some(other) = self.members.conflicting_scope(invite.scope_id, principal).await? {
            log::debug!(target: "tenantry", "msg=\"member of another scope\", user_id={principal}, other_scope_id={other}");
            return Ok(self.reject(principal, "conflicting_membership"));
        }

        if !self.invites.redeem(invite.id, principal, now).await? {
            return Ok(self.reject(principal, "no_longer_redeemable"));
        }

        self.cache.invalidate(principal)?;

        log::info!(
            target: "tenantry",
            "msg=\"invite redeemed\", scope=\"{}\", scope_id={}, invite_id={}, user_id={principal}",
            S::KIND,
            invite.scope_id,
            invite.id
        );

        dispatch(AccessEvent::InviteRedeemed {
            scope: S::KIND,
            scope_id: invite.scope_id,
            invite_id: invite.id,
            user_id: principal,
            at: now,
        })
        .await;

        Ok(RedeemOutcome::joined(invite.scope_id))
    }

    /// Unused, unexpired invites of the scope. Admins only.
    pub async fn list(&self, session: &Session, scope_id: i64) -> Result<Vec<Invite<S>>, AccessError> {
        self.require_manager(session, scope_id).await?;
        let now = self.clock.utc();

        let mut invites = self.invites.find_active_by_scope(scope_id, now).await?;
        invites.retain(|invite| invite.is_redeemable(now));
        invites.sort_by_key(|invite| invite.created_at);
        Ok(invites)
    }

    /// Deletes an invite. The caller must administer the invite's scope.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "revoke_invite", skip(self, session), err))]
    pub async fn revoke(&self, session: &Session, invite_id: i64) -> Result<(), AccessError> {
        session.require()?;
        let invite = self
            .invites
            .find_by_id(invite_id)
            .await?
            .ok_or(AccessError::NotFound)?;
        let principal = self.require_manager(session, invite.scope_id).await?;

        self.invites.delete(invite.id).await?;

        log::info!(
            target: "tenantry",
            "msg=\"invite revoked\", scope=\"{}\", scope_id={}, invite_id={invite_id}, user_id={principal}",
            S::KIND,
            invite.scope_id
        );

        dispatch(AccessEvent::InviteRevoked {
            scope: S::KIND,
            scope_id: invite.scope_id,
            invite_id,
            revoked_by: principal,
            at: self.clock.utc(),
        })
        .await;

        Ok(())
    }

    /// Deletes expired invite rows. Never runs on its own.
    pub async fn prune_expired(&self) -> Result<u64, AccessError> {
        let pruned = self.invites.delete_expired(self.clock.utc()).await?;
        if pruned > 0 {
            log::info!(target: "tenantry", "msg=\"expired invites pruned\", scope=\"{}\", count={pruned}", S::KIND);
        }
        Ok(pruned)
    }
}

#[async_trait]
impl<S, I, M, U> RedeemInvite<S> for InviteManager<S, I, M, U>
where
    S: InviteScope,
    I: InviteRepository<S>,
    M: ScopeMembers<S>,
    U: UserRepository,
{
    async fn redeem(&self, session: &Session, code: &str) -> Result<RedeemOutcome, AccessError> {
        InviteManager::redeem(self, session, code).await
    }
}

#[async_trait]
impl<S, R> RedeemInvite<S> for Arc<R>
where
    S: InviteScope,
    R: RedeemInvite<S> + ?Sized,
{
    async fn redeem(&self, session: &Session, code: &str) -> Result<RedeemOutcome, AccessError> {
        (**self).redeem(session, code).await
    }
}
