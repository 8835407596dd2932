use async_trait::async_trait;

use super::{InviteScope, OrgScope, TeamScope};
use crate::AccessError;
use crate::repository::{OrgMemberRepository, TeamMemberRepository};

/// Membership lookups the invite lifecycle needs for one scope kind.
#[async_trait]
pub trait ScopeMembers<S: InviteScope>: Send + Sync {
    /// Role of `user_id` in the scope, if a member.
    async fn scope_role(&self, scope_id: i64, user_id: i64) -> Result<Option<S::Role>, AccessError>;

    /// Another scope of the same kind that `user_id` already belongs to and
    /// that rules out joining `scope_id`.
    async fn conflicting_scope(&self, scope_id: i64, user_id: i64) -> Result<Option<i64>, AccessError>;
}

#[async_trait]
impl<T: TeamMemberRepository> ScopeMembers<TeamScope> for T {
    async fn scope_role(&self, scope_id: i64, user_id: i64) -> Result<Option<crate::TeamRole>, AccessError> {
        let member = self.find_by_team_and_user(scope_id, user_id).await?;
        Ok(member.and_then(|m| m.parse_role()))
    }

    async fn conflicting_scope(&self, _scope_id: i64, _user_id: i64) -> Result<Option<i64>, AccessError> {
        // a user may be on any number of teams
        Ok(None)
    }
}

#[async_trait]
impl<O: OrgMemberRepository> ScopeMembers<OrgScope> for O {
    async fn scope_role(&self, scope_id: i64, user_id: i64) -> Result<Option<crate::OrgRole>, AccessError> {
        let member = self.find_by_org_and_user(scope_id, user_id).await?;
        Ok(member.and_then(|m| m.parse_role()))
    }

    async fn conflicting_scope(&self, scope_id: i64, user_id: i64) -> Result<Option<i64>, AccessError> {
        let member = self.find_by_user(user_id).await?;
        Ok(member.map(|m| m.org_id).filter(|org_id| *org_id != scope_id))
    }
}
