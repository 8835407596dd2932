use axum::extract::{FromRequestParts, Request, State};
use axum::http::HeaderMap;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use cookie::Cookie;

use super::error::AppError;
use super::state::{AccessBackend, AccessState};
use crate::gate::{GateDecision, GateRequest};
use crate::jwt::SessionClaims;
use crate::session::Session;
use crate::{AccessError, PrincipalId};

/// Cookie carrying the session token for browser requests.
pub const SESSION_COOKIE: &str = "tenantry_session";

pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(ToOwned::to_owned)
}

/// Reads [`SESSION_COOKIE`] from every `Cookie` header, ignoring malformed
/// pairs. Surrounding double quotes are stripped from the value.
pub fn extract_session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(|cookie| cookie.value_trimmed().to_owned())
        .filter(|value| !value.is_empty())
}

/// Bearer header first, then the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    extract_bearer_token(headers).or_else(|| extract_session_cookie(headers))
}

/// verifies the session token and exposes the caller's [`Session`]
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub session: Session,
    pub claims: SessionClaims,
}

impl SessionUser {
    pub fn principal(&self) -> Option<PrincipalId> {
        self.session.principal()
    }
}

impl<B: AccessBackend> FromRequestParts<AccessState<B>> for SessionUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AccessState<B>) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or(AppError(AccessError::Unauthenticated))?;
        let claims = state.jwt.decode(&token)?;
        let session = claims.session()?;

        Ok(SessionUser { session, claims })
    }
}

/// Runs the route gate in front of protected pages.
///
/// Redirects are `303 See Other`. Any token problem counts as no token.
pub async fn route_gate<B: AccessBackend>(
    State(state): State<AccessState<B>>,
    request: Request,
    next: Next,
) -> Response {
    let claims = session_token(request.headers())
        .and_then(|token| state.jwt.decode(&token).ok())
        .map(|claims| claims.gate_claims());

    let gate_request = GateRequest {
        path: request.uri().path().to_owned(),
        query: request.uri().query().map(ToOwned::to_owned),
        claims,
    };

    match state.gate.evaluate(&gate_request) {
        GateDecision::Pass => next.run(request).await,
        GateDecision::Redirect(location) => Redirect::to(&location).into_response(),
    }
}
