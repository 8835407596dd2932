use axum::Router;
use axum::routing::{delete, get, post, put};

use super::handlers;
use super::state::{AccessBackend, AccessState};

/// Creates all access-control API routes.
///
/// All routes require a session token (bearer header or cookie).
///
/// # Routes
///
/// ## Session
/// - `POST /session/refresh` - Re-issue the token with current role facts
/// - `GET /me/role-facts` - Caller's role-fact bundle
/// - `POST /onboarding/complete` - Finish onboarding
///
/// ## Guards
/// - `GET /ideas/{id}/access`
/// - `GET /sprints/{id}/access`
/// - `GET /teams/{id}/access`
///
/// ## Teams
/// - `POST /teams` - Create a team
/// - `GET /users/{id}/teams` - Caller's own teams
/// - `GET /teams/{id}/members`
/// - `PUT /teams/{id}/members/{user_id}` - Change role (admins)
/// - `DELETE /teams/{id}/members/{user_id}` - Remove member or leave
///
/// ## Organizations
/// - `POST /organizations`
/// - `GET /organizations/{id}`
/// - `GET /organizations/{id}/members`
/// - `PUT /organizations/{id}/members/{user_id}` - Change role (business admins)
/// - `DELETE /organizations/{id}/members/{user_id}`
///
/// ## Invites
/// - `POST|GET /teams/{id}/invites`, `POST|GET /organizations/{id}/invites`
/// - `DELETE /team-invites/{id}`, `DELETE /org-invites/{id}` - Revoke
/// - `POST /team-invites/redeem`, `POST /org-invites/redeem`
/// - `POST /join` - Redeem a code of either scope
pub fn access_routes<B: AccessBackend>() -> Router<AccessState<B>> {
    Router::new()
        // Session
        .route("/session/refresh", post(handlers::refresh_session::<B>))
        .route("/me/role-facts", get(handlers::role_facts::<B>))
        .route("/onboarding/complete", post(handlers::complete_onboarding::<B>))
        // Guards
        .route("/ideas/{id}/access", get(handlers::idea_access::<B>))
        .route("/sprints/{id}/access", get(handlers::sprint_access::<B>))
        .route("/teams/{id}/access", get(handlers::team_access::<B>))
        // Teams
        .route("/teams", post(handlers::create_team::<B>))
        .route("/users/{id}/teams", get(handlers::list_user_teams::<B>))
        .route("/teams/{id}/members", get(handlers::list_team_members::<B>))
        .route(
            "/teams/{id}/members/{user_id}",
            put(handlers::update_team_member_role::<B>).delete(handlers::remove_team_member::<B>),
        )
        // Organizations
        .route("/organizations", post(handlers::create_organization::<B>))
        .route("/organizations/{id}", get(handlers::get_organization::<B>))
        .route("/organizations/{id}/members", get(handlers::list_org_members::<B>))
        .route(
            "/organizations/{id}/members/{user_id}",
            put(handlers::update_org_member_role::<B>).delete(handlers::remove_org_member::<B>),
        )
        // Invites
        .route(
            "/teams/{id}/invites",
            post(handlers::create_team_invite::<B>).get(handlers::list_team_invites::<B>),
        )
        .route("/team-invites/redeem", post(handlers::redeem_team_invite::<B>))
        .route("/team-invites/{id}", delete(handlers::revoke_team_invite::<B>))
        .route(
            "/organizations/{id}/invites",
            post(handlers::create_org_invite::<B>).get(handlers::list_org_invites::<B>),
        )
        .route("/org-invites/redeem", post(handlers::redeem_org_invite::<B>))
        .route("/org-invites/{id}", delete(handlers::revoke_org_invite::<B>))
        .route("/join", post(handlers::join::<B>))
}
