use serde::Serialize;

use super::{OrgScope, RedeemInvite, ScopeKind, TeamScope};
use crate::AccessError;
use crate::session::Session;

/// Result of [`JoinService::join`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JoinOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<ScopeKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_id: Option<i64>,
}

impl JoinOutcome {
    fn joined(scope: ScopeKind, scope_id: Option<i64>) -> Self {
        Self {
            success: true,
            scope: Some(scope),
            scope_id,
        }
    }

    fn failed() -> Self {
        Self {
            success: false,
            scope: None,
            scope_id: None,
        }
    }
}

/// Redeems a code of unknown scope: team first, organization second.
pub struct JoinService<T, O>
where
    T: RedeemInvite<TeamScope>,
    O: RedeemInvite<OrgScope>,
{
    teams: T,
    orgs: O,
}

impl<T, O> JoinService<T, O>
where
    T: RedeemInvite<TeamScope>,
    O: RedeemInvite<OrgScope>,
{
    pub fn new(teams: T, orgs: O) -> Self {
        Self { teams, orgs }
    }

    /// The organization attempt runs only when the team attempt failed.
    /// Storage errors from either attempt propagate.
    pub async fn join(&self, session: &Session, code: &str) -> Result<JoinOutcome, AccessError> {
        let team = self.teams.redeem(session, code).await?;
        if team.success {
            return Ok(JoinOutcome::joined(ScopeKind::Team, team.scope_id));
        }

        let org = self.orgs.redeem(session, code).await?;
        if org.success {
            return Ok(JoinOutcome::joined(ScopeKind::Organization, org.scope_id));
        }

        Ok(JoinOutcome::failed())
    }
}
