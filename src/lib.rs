//! Multi-tenant access control for team and organization workspaces.
//!
//! The crate decides who may read or mutate teams, organizations, ideas and
//! sprints, runs the invite-code lifecycle for both scopes, and keeps a
//! short-lived cache of each principal's role facts so the session layer can
//! embed them in its token.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tenantry::{AccessConfig, RoleFactCache, Session, SessionResolver};
//! use tenantry::guards::AccessGuards;
//! use tenantry::repository::MockAccessStore;
//!
//! let store = MockAccessStore::new();
//! let config = AccessConfig::default();
//! let resolver = Arc::new(SessionResolver::new(store.clone(), store.clone(), store.clone()));
//! let cache = Arc::new(RoleFactCache::new(resolver, config.role_cache_ttl));
//! let guards = AccessGuards::new(store.clone(), store.clone(), store.clone(), store.clone());
//!
//! let access = guards.require_team_admin(&Session::authenticated(7), 42).await?;
//! ```

pub mod config;
pub mod crypto;
pub mod events;
pub mod gate;
pub mod guards;
pub mod invites;
pub mod membership;
pub mod repository;
pub mod session;
pub mod validators;

#[cfg(feature = "jwt")]
pub mod jwt;

#[cfg(feature = "sqlx_postgres")]
pub mod postgres;

#[cfg(feature = "axum_support")]
pub mod api;

#[cfg(any(test, feature = "mocks"))]
pub mod test_support;

use std::fmt;

pub use config::{AccessConfig, GateConfig, InviteConfig};
pub use events::{AccessEvent, register_event_listeners};
pub use gate::{GateClaims, GateDecision, GateRequest, RouteGate};
pub use guards::{AccessGuards, OrgAccess, ResourceAccess, TeamAccess};
pub use invites::{Invite, InviteScope, InviteState, JoinOutcome, OrgScope, RedeemOutcome, TeamScope};
pub use repository::{AccountType, OrgRole, Role, TeamRole};
pub use session::{Credential, RoleFactBundle, RoleFactCache, Session, SessionResolver};

/// Identifier of an authenticated user.
pub type PrincipalId = i64;

/// Errors returned by guards, membership mutations and storage adapters.
///
/// `Forbidden` and `NotFound` stay distinct so logs and tests can tell them
/// apart; [`AccessError::public_message`] folds both into the same text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// No principal on the request.
    Unauthenticated,
    /// The principal exists but lacks the required relationship or role.
    Forbidden,
    /// The addressed resource does not exist.
    NotFound,
    /// The user already belongs to an organization.
    AlreadyInOrganization,
    /// Input failed validation.
    Validation(String),
    /// Session token could not be decoded or verified.
    TokenInvalid,
    /// Session token is past its expiry.
    TokenExpired,
    /// Storage layer failure.
    DatabaseError(String),
    /// Invalid configuration such as a short signing secret.
    ConfigurationError(String),
    /// Invariant breach inside the crate, e.g. a poisoned lock.
    Internal(String),
}

/// Message shown for both `Forbidden` and `NotFound`.
pub const NO_ACCESS_MESSAGE: &str = "you don't have access";

impl AccessError {
    /// Text safe to show to the caller.
    ///
    /// Never reveals whether a guarded resource exists, and never leaks
    /// storage or internal details.
    pub fn public_message(&self) -> String {
        match self {
            Self::Unauthenticated => "authentication required".to_owned(),
            Self::Forbidden | Self::NotFound => NO_ACCESS_MESSAGE.to_owned(),
            Self::AlreadyInOrganization => "already a member of an organization".to_owned(),
            Self::Validation(msg) => msg.clone(),
            Self::TokenInvalid => "invalid session".to_owned(),
            Self::TokenExpired => "session expired".to_owned(),
            Self::DatabaseError(_) | Self::ConfigurationError(_) | Self::Internal(_) => {
                "internal error".to_owned()
            }
        }
    }

    /// `true` for the two outcomes a guard reports on a denied request.
    pub fn is_denial(&self) -> bool {
        matches!(self, Self::Forbidden | Self::NotFound)
    }
}

impl std::error::Error for AccessError {}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessError::Unauthenticated => write!(f, "Not authenticated"),
            AccessError::Forbidden => write!(f, "Forbidden"),
            AccessError::NotFound => write!(f, "Not found"),
            AccessError::AlreadyInOrganization => write!(f, "User already belongs to an organization"),
            AccessError::Validation(msg) => write!(f, "Validation error: {msg}"),
            AccessError::TokenInvalid => write!(f, "Invalid token"),
            AccessError::TokenExpired => write!(f, "Token has expired"),
            AccessError::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            AccessError::ConfigurationError(msg) => write!(f, "Configuration error: {msg}"),
            AccessError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl From<validators::ValidationError> for AccessError {
    fn from(err: validators::ValidationError) -> Self {
        AccessError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_message_hides_existence() {
        assert_eq!(AccessError::Forbidden.public_message(), NO_ACCESS_MESSAGE);
        assert_eq!(AccessError::NotFound.public_message(), NO_ACCESS_MESSAGE);
        assert_ne!(AccessError::Forbidden, AccessError::NotFound);
    }

    #[test]
    fn test_public_message_redacts_storage_errors() {
        let err = AccessError::DatabaseError("relation \"team_members\" does not exist".to_owned());
        assert_eq!(err.public_message(), "internal error");
        assert!(err.to_string().contains("team_members"));
    }

    #[test]
    fn test_is_denial() {
        assert!(AccessError::Forbidden.is_denial());
        assert!(AccessError::NotFound.is_denial());
        assert!(!AccessError::Unauthenticated.is_denial());
    }
}
