//! Session facts: who is calling, and what roles they hold.
//!
//! [`SessionResolver`] turns an authenticated credential into a principal id
//! and computes the principal's [`RoleFactBundle`] from persisted
//! memberships. [`RoleFactCache`] keeps bundles for a short while so the
//! session token can carry them without a database round trip per request.

mod cache;
mod resolver;

pub use cache::RoleFactCache;
pub use resolver::{RoleFactSource, SessionResolver};

use serde::{Deserialize, Serialize};

use crate::repository::{AccountType, OrgRole};
use crate::{AccessError, PrincipalId};

/// The current request's session, as supplied by the outer session layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    principal: Option<PrincipalId>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self { principal: None }
    }

    pub fn authenticated(principal: PrincipalId) -> Self {
        Self {
            principal: Some(principal),
        }
    }

    pub fn principal(&self) -> Option<PrincipalId> {
        self.principal
    }

    /// The principal id, or `Unauthenticated`.
    pub fn require(&self) -> Result<PrincipalId, AccessError> {
        self.principal.ok_or(AccessError::Unauthenticated)
    }
}

impl From<Option<PrincipalId>> for Session {
    fn from(principal: Option<PrincipalId>) -> Self {
        Self { principal }
    }
}

/// What the authentication layer established about the caller.
///
/// Password checks and OAuth exchanges happen before this point; the
/// resolver only maps an already-verified identity onto a user row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    /// Email/password sign-in that the outer layer already verified.
    Local { email: String },
    /// Sign-in through an external identity provider.
    External { subject: String, email: String },
    Anonymous,
}

/// Role facts derived from persisted memberships.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleFactBundle {
    pub org_id: Option<i64>,
    pub org_role: Option<OrgRole>,
    /// Sorted ascending.
    pub team_ids: Vec<i64>,
    pub onboarding_complete: bool,
    pub account_type: AccountType,
}

impl RoleFactBundle {
    pub fn is_business_admin(&self) -> bool {
        self.org_role == Some(OrgRole::BusinessAdmin)
    }

    pub fn in_team(&self, team_id: i64) -> bool {
        self.team_ids.binary_search(&team_id).is_ok()
    }
}
