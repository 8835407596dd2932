use std::sync::Arc;

use mockable::{Clock, DefaultClock};

use crate::crypto::generate_slug_suffix;
use crate::events::{AccessEvent, dispatch};
use crate::guards::OrgGuard;
use crate::invites::ScopeKind;
use crate::repository::{
    CreateOrganization, GuardedWrite, OrgMember, OrgMemberRepository, OrgRole, Organization,
    OrganizationRepository, Role,
};
use crate::session::{RoleFactCache, Session};
use crate::validators::{normalize_domain, slugify, validate_name};
use crate::AccessError;

/// Organization creation and membership changes.
pub struct OrganizationService<R, O>
where
    R: OrganizationRepository,
    O: OrgMemberRepository + Clone,
{
    organizations: R,
    members: O,
    guard: OrgGuard<O>,
    cache: Arc<RoleFactCache>,
    clock: Arc<dyn Clock>,
}

impl<R, O> OrganizationService<R, O>
where
    R: OrganizationRepository,
    O: OrgMemberRepository + Clone,
{
    pub fn new(organizations: R, members: O, cache: Arc<RoleFactCache>) -> Self {
        Self {
            organizations,
            guard: OrgGuard::new(members.clone()),
            members,
            cache,
            clock: Arc::new(DefaultClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Creates an organization with the caller as its first business admin.
    ///
    /// A user belongs to at most one organization, so callers who already
    /// have one get `AlreadyInOrganization`.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "create_organization", skip_all, err))]
    pub async fn create_organization(
        &self,
        session: &Session,
        name: &str,
        email_domain: Option<&str>,
    ) -> Result<Organization, AccessError> {
        let principal = session.require()?;
        let name = validate_name(name)?;
        let email_domain = email_domain.map(normalize_domain).transpose()?;

        if self.members.find_by_user(principal).await?.is_some() {
            return Err(AccessError::AlreadyInOrganization);
        }

        let base = slugify(&name);
        let base = if base.is_empty() { "org".to_owned() } else { base };
        let slug = format!("{base}-{}", generate_slug_suffix());

        let (org, _) = self
            .organizations
            .create_with_admin(CreateOrganization {
                name,
                slug,
                email_domain,
                creator_id: principal,
            })
            .await?;

        self.cache.invalidate(principal)?;

        log::info!(
            target: "tenantry",
            "msg=\"organization created\", org_id={}, slug=\"{}\", user_id={principal}",
            org.id,
            org.slug
        );

        dispatch(AccessEvent::OrganizationCreated {
            org_id: org.id,
            created_by: principal,
            at: org.created_at,
        })
        .await;

        Ok(org)
    }

    pub async fn get_organization(&self, session: &Session, org_id: i64) -> Result<Organization, AccessError> {
        self.guard.require_member(session, org_id).await?;
        self.organizations
            .find_by_id(org_id)
            .await?
            .ok_or(AccessError::NotFound)
    }

    pub async fn list_members(&self, session: &Session, org_id: i64) -> Result<Vec<OrgMember>, AccessError> {
        self.guard.require_member(session, org_id).await?;
        let mut members = self.members.find_by_org(org_id).await?;
        members.sort_by_key(|member| member.id);
        Ok(members)
    }

    /// Changes a member's organization role. Business admins only; the last
    /// business admin cannot be demoted.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "update_org_member_role", skip(self, session), err))]
    pub async fn update_member_role(
        &self,
        session: &Session,
        org_id: i64,
        user_id: i64,
        role: OrgRole,
    ) -> Result<OrgMember, AccessError> {
        let access = self
            .guard
            .require_role(session, org_id, &[OrgRole::BusinessAdmin])
            .await?;

        let member = match self.members.update_role_keeping_admin(org_id, user_id, role).await? {
            GuardedWrite::Applied(member) => member,
            GuardedWrite::Missing => return Err(AccessError::NotFound),
            GuardedWrite::LastAdmin => {
                log::warn!(
                    target: "tenantry",
                    "msg=\"refused to demote last business admin\", org_id={org_id}, user_id={user_id}"
                );
                return Err(AccessError::Forbidden);
            }
        };

        self.cache.invalidate(user_id)?;

        log::info!(
            target: "tenantry",
            "msg=\"org role changed\", org_id={org_id}, user_id={user_id}, role=\"{role}\", changed_by={}",
            access.principal
        );

        dispatch(AccessEvent::MemberRoleChanged {
            scope: ScopeKind::Organization,
            scope_id: org_id,
            user_id,
            role: role.as_str(),
            changed_by: access.principal,
            at: member.updated_at,
        })
        .await;

        Ok(member)
    }

    /// Removes a member. Business admins may remove anyone; members may leave.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "remove_org_member", skip(self, session), err))]
    pub async fn remove_member(&self, session: &Session, org_id: i64, user_id: i64) -> Result<(), AccessError> {
        let principal = session.require()?;
        if principal == user_id {
            self.guard.require_member(session, org_id).await?;
        } else {
            self.guard
                .require_role(session, org_id, &[OrgRole::BusinessAdmin])
                .await?;
        }

        match self.members.delete_keeping_admin(org_id, user_id).await? {
            GuardedWrite::Applied(()) => {}
            GuardedWrite::Missing => return Err(AccessError::NotFound),
            GuardedWrite::LastAdmin => {
                log::warn!(
                    target: "tenantry",
                    "msg=\"refused to remove last business admin\", org_id={org_id}, user_id={user_id}"
                );
                return Err(AccessError::Forbidden);
            }
        }

        self.cache.invalidate(user_id)?;

        log::info!(
            target: "tenantry",
            "msg=\"org member removed\", org_id={org_id}, user_id={user_id}, removed_by={principal}"
        );

        dispatch(AccessEvent::MemberRemoved {
            scope: ScopeKind::Organization,
            scope_id: org_id,
            user_id,
            removed_by: principal,
            at: self.clock.utc(),
        })
        .await;

        Ok(())
    }
}
