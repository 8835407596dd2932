use serde::Serialize;

use crate::repository::{OrgMemberRepository, OrgRole};
use crate::session::Session;
use crate::{AccessError, PrincipalId};

/// Passed organization guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrgAccess {
    pub principal: PrincipalId,
    pub org_id: i64,
    pub role: OrgRole,
}

/// Organization membership checks.
#[derive(Clone)]
pub struct OrgGuard<O: OrgMemberRepository> {
    members: O,
}

impl<O: OrgMemberRepository> OrgGuard<O> {
    pub fn new(members: O) -> Self {
        Self { members }
    }

    pub async fn require_member(&self, session: &Session, org_id: i64) -> Result<OrgAccess, AccessError> {
        let principal = session.require()?;

        let Some(member) = self.members.find_by_org_and_user(org_id, principal).await? else {
            log::debug!(
                target: "tenantry",
                "msg=\"access denied\", guard=\"org_member\", user_id={principal}, org_id={org_id}"
            );
            return Err(AccessError::Forbidden);
        };

        let role = member
            .parse_role()
            .ok_or_else(|| AccessError::Internal(format!("unknown org role {}", member.role)))?;

        Ok(OrgAccess {
            principal,
            org_id,
            role,
        })
    }

    /// Passes when the caller's organization role is one of `allowed`.
    pub async fn require_role(
        &self,
        session: &Session,
        org_id: i64,
        allowed: &[OrgRole],
    ) -> Result<OrgAccess, AccessError> {
        let access = self.require_member(session, org_id).await?;

        if !allowed.contains(&access.role) {
            log::debug!(
                target: "tenantry",
                "msg=\"access denied\", guard=\"org_role\", user_id={}, org_id={org_id}, role=\"{}\"",
                access.principal,
                access.role
            );
            return Err(AccessError::Forbidden);
        }

        Ok(access)
    }
}
