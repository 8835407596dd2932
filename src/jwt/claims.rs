use serde::{Deserialize, Serialize};

use crate::gate::GateClaims;
use crate::session::{RoleFactBundle, Session};
use crate::{AccessError, PrincipalId};

/// Claims embedded in a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject - the principal id.
    pub sub: String,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at time (Unix timestamp).
    pub iat: i64,
    /// Unique token id.
    pub jti: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    /// Role facts as of `iat`.
    pub facts: RoleFactBundle,
}

impl SessionClaims {
    pub fn principal(&self) -> Result<PrincipalId, AccessError> {
        self.sub.parse().map_err(|_| AccessError::TokenInvalid)
    }

    pub fn session(&self) -> Result<Session, AccessError> {
        self.principal().map(Session::authenticated)
    }

    pub fn gate_claims(&self) -> GateClaims {
        GateClaims::from(&self.facts)
    }
}
