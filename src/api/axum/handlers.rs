use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use mockable::Clock;

use super::error::AppError;
use super::middleware::SessionUser;
use super::state::{AccessBackend, AccessState};
use crate::api::{
    AccessResponse, CompleteOnboardingRequest, CreateInviteRequest, CreateOrganizationRequest,
    CreateTeamRequest, InviteResponse, MemberResponse, MessageResponse, OrganizationResponse,
    RedeemInviteRequest, RedeemResponse, SessionTokenResponse, TeamResponse, UpdateOrgRoleRequest,
    UpdateTeamRoleRequest, UserResponse,
};
use crate::invites::ScopeKind;
use crate::repository::{OrgRole, TeamRole};

// Session

/// Re-issues the caller's token with freshly resolved role facts.
pub async fn refresh_session<B: AccessBackend>(
    State(state): State<AccessState<B>>,
    user: SessionUser,
) -> Result<impl IntoResponse, AppError> {
    let principal = user.session.require()?;
    let token = state.jwt.issue_current(principal, &state.cache).await?;
    Ok(Json(SessionTokenResponse { token }))
}

pub async fn role_facts<B: AccessBackend>(
    State(state): State<AccessState<B>>,
    user: SessionUser,
) -> Result<impl IntoResponse, AppError> {
    let principal = user.session.require()?;
    Ok(Json(state.cache.get(principal).await?))
}

pub async fn complete_onboarding<B: AccessBackend>(
    State(state): State<AccessState<B>>,
    user: SessionUser,
    Json(body): Json<CompleteOnboardingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let updated = state
        .onboarding
        .complete_onboarding(&user.session, body.account_type)
        .await?;
    Ok(Json(UserResponse::from(updated)))
}

// Resource guards

pub async fn idea_access<B: AccessBackend>(
    State(state): State<AccessState<B>>,
    user: SessionUser,
    Path(idea_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let access = state.guards.require_idea_access(&user.session, idea_id).await?;
    Ok(Json(AccessResponse::from(access)))
}

pub async fn sprint_access<B: AccessBackend>(
    State(state): State<AccessState<B>>,
    user: SessionUser,
    Path(sprint_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let access = state.guards.require_sprint_access(&user.session, sprint_id).await?;
    Ok(Json(AccessResponse::from(access)))
}

pub async fn team_access<B: AccessBackend>(
    State(state): State<AccessState<B>>,
    user: SessionUser,
    Path(team_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let access = state.guards.require_team_member(&user.session, team_id).await?;
    Ok(Json(AccessResponse::from(access)))
}

// Teams

pub async fn create_team<B: AccessBackend>(
    State(state): State<AccessState<B>>,
    user: SessionUser,
    Json(body): Json<CreateTeamRequest>,
) -> Result<impl IntoResponse, AppError> {
    let team = state.teams.create_team(&user.session, &body.name, body.org_id).await?;
    Ok((StatusCode::CREATED, Json(TeamResponse::from(team))))
}

pub async fn list_user_teams<B: AccessBackend>(
    State(state): State<AccessState<B>>,
    user: SessionUser,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let teams = state.teams.list_teams_for_user(&user.session, user_id).await?;
    Ok(Json(teams.into_iter().map(TeamResponse::from).collect::<Vec<_>>()))
}

pub async fn list_team_members<B: AccessBackend>(
    State(state): State<AccessState<B>>,
    user: SessionUser,
    Path(team_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let members = state.teams.list_members(&user.session, team_id).await?;
    Ok(Json(members.into_iter().map(MemberResponse::from).collect::<Vec<_>>()))
}

pub async fn update_team_member_role<B: AccessBackend>(
    State(state): State<AccessState<B>>,
    user: SessionUser,
    Path((team_id, user_id)): Path<(i64, i64)>,
    Json(body): Json<UpdateTeamRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let member = state
        .teams
        .update_member_role(&user.session, team_id, user_id, body.role)
        .await?;
    Ok(Json(MemberResponse::from(member)))
}

pub async fn remove_team_member<B: AccessBackend>(
    State(state): State<AccessState<B>>,
    user: SessionUser,
    Path((team_id, user_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    state.teams.remove_member(&user.session, team_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Organizations

pub async fn create_organization<B: AccessBackend>(
    State(state): State<AccessState<B>>,
    user: SessionUser,
    Json(body): Json<CreateOrganizationRequest>,
) -> Result<impl IntoResponse, AppError> {
    let org = state
        .organizations
        .create_organization(&user.session, &body.name, body.email_domain.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(OrganizationResponse::from(org))))
}

pub async fn get_organization<B: AccessBackend>(
    State(state): State<AccessState<B>>,
    user: SessionUser,
    Path(org_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let org = state.organizations.get_organization(&user.session, org_id).await?;
    Ok(Json(OrganizationResponse::from(org)))
}

pub async fn list_org_members<B: AccessBackend>(
    State(state): State<AccessState<B>>,
    user: SessionUser,
    Path(org_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let members = state.organizations.list_members(&user.session, org_id).await?;
    Ok(Json(members.into_iter().map(MemberResponse::from).collect::<Vec<_>>()))
}

pub async fn update_org_member_role<B: AccessBackend>(
    State(state): State<AccessState<B>>,
    user: SessionUser,
    Path((org_id, user_id)): Path<(i64, i64)>,
    Json(body): Json<UpdateOrgRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    let member = state
        .organizations
        .update_member_role(&user.session, org_id, user_id, body.role)
        .await?;
    Ok(Json(MemberResponse::from(member)))
}

pub async fn remove_org_member<B: AccessBackend>(
    State(state): State<AccessState<B>>,
    user: SessionUser,
    Path((org_id, user_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    state.organizations.remove_member(&user.session, org_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Team invites

pub async fn create_team_invite<B: AccessBackend>(
    State(state): State<AccessState<B>>,
    user: SessionUser,
    Path(team_id): Path<i64>,
    Json(body): Json<CreateInviteRequest<TeamRole>>,
) -> Result<impl IntoResponse, AppError> {
    let invite = state
        .team_invites
        .create(&user.session, team_id, body.role, body.email.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(InviteResponse::new(invite, state.clock.utc()))))
}

pub async fn list_team_invites<B: AccessBackend>(
    State(state): State<AccessState<B>>,
    user: SessionUser,
    Path(team_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let now = state.clock.utc();
    let invites = state.team_invites.list(&user.session, team_id).await?;
    Ok(Json(
        invites
            .into_iter()
            .map(|invite| InviteResponse::new(invite, now))
            .collect::<Vec<_>>(),
    ))
}

pub async fn revoke_team_invite<B: AccessBackend>(
    State(state): State<AccessState<B>>,
    user: SessionUser,
    Path(invite_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.team_invites.revoke(&user.session, invite_id).await?;
    Ok(Json(MessageResponse {
        message: "invite revoked".to_owned(),
    }))
}

pub async fn redeem_team_invite<B: AccessBackend>(
    State(state): State<AccessState<B>>,
    user: SessionUser,
    Json(body): Json<RedeemInviteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.team_invites.redeem(&user.session, &body.code).await?;
    Ok(Json(RedeemResponse::from_outcome(ScopeKind::Team, outcome)))
}

// Organization invites

pub async fn create_org_invite<B: AccessBackend>(
    State(state): State<AccessState<B>>,
    user: SessionUser,
    Path(org_id): Path<i64>,
    Json(body): Json<CreateInviteRequest<OrgRole>>,
) -> Result<impl IntoResponse, AppError> {
    let invite = state
        .org_invites
        .create(&user.session, org_id, body.role, body.email.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(InviteResponse::new(invite, state.clock.utc()))))
}

pub async fn list_org_invites<B: AccessBackend>(
    State(state): State<AccessState<B>>,
    user: SessionUser,
    Path(org_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let now = state.clock.utc();
    let invites = state.org_invites.list(&user.session, org_id).await?;
    Ok(Json(
        invites
            .into_iter()
            .map(|invite| InviteResponse::new(invite, now))
            .collect::<Vec<_>>(),
    ))
}

pub async fn revoke_org_invite<B: AccessBackend>(
    State(state): State<AccessState<B>>,
    user: SessionUser,
    Path(invite_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.org_invites.revoke(&user.session, invite_id).await?;
    Ok(Json(MessageResponse {
        message: "invite revoked".to_owned(),
    }))
}

pub async fn redeem_org_invite<B: AccessBackend>(
    State(state): State<AccessState<B>>,
    user: SessionUser,
    Json(body): Json<RedeemInviteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.org_invites.redeem(&user.session, &body.code).await?;
    Ok(Json(RedeemResponse::from_outcome(ScopeKind::Organization, outcome)))
}

/// Redeems a code of either scope, team first.
pub async fn join<B: AccessBackend>(
    State(state): State<AccessState<B>>,
    user: SessionUser,
    Json(body): Json<RedeemInviteRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.join.join(&user.session, &body.code).await?;
    Ok(Json(RedeemResponse::from_join(outcome)))
}
