use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::invites::{Invite, InviteScope, InviteState, JoinOutcome, RedeemOutcome, ScopeKind};
use crate::repository::{AccountType, OrgMember, OrgRole, Organization, Role, Team, TeamMember, TeamRole, User};
use crate::{AccessError, ResourceAccess, TeamAccess};

// Request DTOs

#[derive(Debug, Deserialize)]
pub struct CreateTeamRequest {
    pub name: String,
    #[serde(default)]
    pub org_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: String,
    #[serde(default)]
    pub email_domain: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTeamRoleRequest {
    pub role: TeamRole,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrgRoleRequest {
    pub role: OrgRole,
}

#[derive(Debug, Deserialize)]
pub struct CreateInviteRequest<R> {
    pub role: R,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RedeemInviteRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct CompleteOnboardingRequest {
    pub account_type: AccountType,
}

// Response DTOs

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl From<&AccessError> for ErrorResponse {
    fn from(err: &AccessError) -> Self {
        Self {
            error: err.public_message(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionTokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct TeamResponse {
    pub id: i64,
    pub name: String,
    pub org_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<Team> for TeamResponse {
    fn from(team: Team) -> Self {
        Self {
            id: team.id,
            name: team.name,
            org_id: team.org_id,
            created_at: team.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrganizationResponse {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub email_domain: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Organization> for OrganizationResponse {
    fn from(org: Organization) -> Self {
        Self {
            id: org.id,
            name: org.name,
            slug: org.slug,
            email_domain: org.email_domain,
            created_at: org.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub user_id: i64,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

impl From<TeamMember> for MemberResponse {
    fn from(member: TeamMember) -> Self {
        Self {
            user_id: member.user_id,
            role: member.role,
            joined_at: member.created_at,
        }
    }
}

impl From<OrgMember> for MemberResponse {
    fn from(member: OrgMember) -> Self {
        Self {
            user_id: member.user_id,
            role: member.role,
            joined_at: member.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub onboarding_complete: bool,
    pub account_type: AccountType,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            onboarding_complete: user.onboarding_complete,
            account_type: user.account_type,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InviteResponse {
    pub id: i64,
    pub scope: ScopeKind,
    pub scope_id: i64,
    pub email: Option<String>,
    pub role: &'static str,
    pub code: String,
    pub state: InviteState,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl InviteResponse {
    pub fn new<S: InviteScope>(invite: Invite<S>, now: DateTime<Utc>) -> Self {
        let state = invite.state(now);
        Self {
            id: invite.id,
            scope: S::KIND,
            scope_id: invite.scope_id,
            email: invite.email,
            role: invite.role.as_str(),
            code: invite.code,
            state,
            expires_at: invite.expires_at,
            created_at: invite.created_at,
        }
    }
}

/// Outcome of a redemption or join attempt.
///
/// Failures carry one fixed message whatever the reason.
#[derive(Debug, Serialize, Deserialize)]
pub struct RedeemResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<ScopeKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RedeemResponse {
    pub fn from_outcome(scope: ScopeKind, outcome: RedeemOutcome) -> Self {
        if outcome.success {
            Self {
                success: true,
                scope: Some(scope),
                scope_id: outcome.scope_id,
                message: None,
            }
        } else {
            Self::failed()
        }
    }

    pub fn from_join(outcome: JoinOutcome) -> Self {
        if outcome.success {
            Self {
                success: true,
                scope: outcome.scope,
                scope_id: outcome.scope_id,
                message: None,
            }
        } else {
            Self::failed()
        }
    }

    fn failed() -> Self {
        Self {
            success: false,
            scope: None,
            scope_id: None,
            message: Some(RedeemOutcome::MESSAGE.to_owned()),
        }
    }
}

/// Relationship facts a guard established for the caller.
#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub principal: i64,
    pub is_owner: bool,
    pub is_team_member: bool,
    pub is_participant: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_role: Option<TeamRole>,
}

impl From<ResourceAccess> for AccessResponse {
    fn from(access: ResourceAccess) -> Self {
        Self {
            principal: access.principal,
            is_owner: access.is_owner,
            is_team_member: access.is_team_member,
            is_participant: access.is_participant,
            team_role: None,
        }
    }
}

impl From<TeamAccess> for AccessResponse {
    fn from(access: TeamAccess) -> Self {
        Self {
            principal: access.principal,
            is_owner: false,
            is_team_member: true,
            is_participant: false,
            team_role: Some(access.role),
        }
    }
}
