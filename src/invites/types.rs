use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::repository::{OrgRole, Role, TeamRole};

/// Which kind of scope an invite grants membership in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    Team,
    Organization,
}

impl ScopeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Team => "team",
            Self::Organization => "organization",
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marker for the scope an [`Invite`] belongs to.
///
/// The lifecycle is the same for every scope; only the role type, the
/// membership written on redemption and who may manage invites differ.
pub trait InviteScope: fmt::Debug + Clone + Copy + Default + Send + Sync + 'static {
    type Role: Role + fmt::Debug + PartialEq + Send + Sync;

    const KIND: ScopeKind;

    /// Whether a member holding `role` may create, list and revoke invites.
    fn manages_invites(role: &Self::Role) -> bool;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeamScope;

impl InviteScope for TeamScope {
    type Role = TeamRole;

    const KIND: ScopeKind = ScopeKind::Team;

    fn manages_invites(role: &TeamRole) -> bool {
        *role == TeamRole::Admin
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrgScope;

impl InviteScope for OrgScope {
    type Role = OrgRole;

    const KIND: ScopeKind = ScopeKind::Organization;

    fn manages_invites(role: &OrgRole) -> bool {
        *role == OrgRole::BusinessAdmin
    }
}

/// Lifecycle state of an invite, derived at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteState {
    Active,
    /// Terminal: `used` was flipped by a successful redemption.
    Redeemed,
    /// Terminal: `expires_at` has passed. Never stored.
    Expired,
}

/// An invite code granting membership in a team or organization.
#[derive(Debug, Clone, PartialEq)]
pub struct Invite<S: InviteScope> {
    pub id: i64,
    pub scope: S,
    /// Team or organization id, depending on `S`.
    pub scope_id: i64,
    /// When set, only a user with this (normalized) email may redeem.
    pub email: Option<String>,
    pub role: S::Role,
    /// Eight characters of `[A-Z0-9]`.
    pub code: String,
    pub created_by: i64,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl<S: InviteScope> Invite<S> {
    pub fn state(&self, now: DateTime<Utc>) -> InviteState {
        if self.used {
            InviteState::Redeemed
        } else if self.expires_at <= now {
            InviteState::Expired
        } else {
            InviteState::Active
        }
    }

    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.state(now) == InviteState::Active
    }

    /// Case-insensitive check against the invite's email restriction.
    pub fn admits_email(&self, email: &str) -> bool {
        self.email
            .as_deref()
            .is_none_or(|restricted| restricted.eq_ignore_ascii_case(email.trim()))
    }
}

/// Result of a redemption attempt.
///
/// Every expected failure (unknown code, used, expired, wrong email) is the
/// same `success: false` value; callers show [`RedeemOutcome::MESSAGE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_id: Option<i64>,
}

impl RedeemOutcome {
    pub const MESSAGE: &'static str = "invalid or expired code";

    pub fn joined(scope_id: i64) -> Self {
        Self {
            success: true,
            scope_id: Some(scope_id),
        }
    }

    pub fn failed() -> Self {
        Self {
            success: false,
            scope_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn invite(used: bool, expires_at: DateTime<Utc>, email: Option<&str>) -> Invite<TeamScope> {
        Invite {
            id: 1,
            scope: TeamScope,
            scope_id: 10,
            email: email.map(ToOwned::to_owned),
            role: TeamRole::Member,
            code: "AB12CD34".to_owned(),
            created_by: 2,
            expires_at,
            used,
            created_at: expires_at - Duration::days(7),
        }
    }

    #[test]
    fn test_state_is_derived_from_expiry() {
        let now = Utc::now();
        let active = invite(false, now + Duration::days(1), None);
        assert_eq!(active.state(now), InviteState::Active);
        assert_eq!(active.state(now + Duration::days(2)), InviteState::Expired);
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let now = Utc::now();
        assert_eq!(invite(false, now, None).state(now), InviteState::Expired);
    }

    #[test]
    fn test_used_wins_over_expiry() {
        let now = Utc::now();
        assert_eq!(invite(true, now + Duration::days(1), None).state(now), InviteState::Redeemed);
        assert_eq!(invite(true, now - Duration::days(1), None).state(now), InviteState::Redeemed);
        assert!(!invite(true, now + Duration::days(1), None).is_redeemable(now));
    }

    #[test]
    fn test_admits_email_case_insensitive() {
        let now = Utc::now();
        let restricted = invite(false, now, Some("alice@acme.io"));
        assert!(restricted.admits_email("Alice@ACME.io"));
        assert!(!restricted.admits_email("bob@acme.io"));
        assert!(invite(false, now, None).admits_email("anyone@example.com"));
    }

    #[test]
    fn test_scope_admin_roles() {
        assert!(TeamScope::manages_invites(&TeamRole::Admin));
        assert!(!TeamScope::manages_invites(&TeamRole::Member));
        assert!(OrgScope::manages_invites(&OrgRole::BusinessAdmin));
        assert!(!OrgScope::manages_invites(&OrgRole::TeamAdmin));
    }

    #[test]
    fn test_redeem_outcome_serialization() {
        let json = serde_json::to_value(RedeemOutcome::failed()).unwrap();
        assert_eq!(json, serde_json::json!({ "success": false }));
        let json = serde_json::to_value(RedeemOutcome::joined(4)).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true, "scope_id": 4 }));
    }
}
