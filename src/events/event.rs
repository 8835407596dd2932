use chrono::{DateTime, Utc};

use crate::invites::ScopeKind;

/// Events emitted by membership and invite operations.
///
/// Events are always fired. If no listeners are registered they are
/// silently ignored. Register listeners via
/// [`register_event_listeners`](crate::register_event_listeners).
#[derive(Debug, Clone)]
pub enum AccessEvent {
    // structure
    OrganizationCreated {
        org_id: i64,
        created_by: i64,
        at: DateTime<Utc>,
    },
    TeamCreated {
        team_id: i64,
        org_id: Option<i64>,
        created_by: i64,
        at: DateTime<Utc>,
    },
    OnboardingCompleted {
        user_id: i64,
        at: DateTime<Utc>,
    },

    // membership
    MemberRoleChanged {
        scope: ScopeKind,
        scope_id: i64,
        user_id: i64,
        role: &'static str,
        changed_by: i64,
        at: DateTime<Utc>,
    },
    MemberRemoved {
        scope: ScopeKind,
        scope_id: i64,
        user_id: i64,
        removed_by: i64,
        at: DateTime<Utc>,
    },

    // invites
    InviteCreated {
        scope: ScopeKind,
        scope_id: i64,
        invite_id: i64,
        created_by: i64,
        at: DateTime<Utc>,
    },
    InviteRedeemed {
        scope: ScopeKind,
        scope_id: i64,
        invite_id: i64,
        user_id: i64,
        at: DateTime<Utc>,
    },
    InviteRevoked {
        scope: ScopeKind,
        scope_id: i64,
        invite_id: i64,
        revoked_by: i64,
        at: DateTime<Utc>,
    },
}

impl AccessEvent {
    /// Returns a dot-separated event name for logging/tracing.
    pub fn name(&self) -> &'static str {
        match self {
            Self::OrganizationCreated { .. } => "org.created",
            Self::TeamCreated { .. } => "team.created",
            Self::OnboardingCompleted { .. } => "user.onboarding_completed",
            Self::MemberRoleChanged { .. } => "member.role_changed",
            Self::MemberRemoved { .. } => "member.removed",
            Self::InviteCreated { .. } => "invite.created",
            Self::InviteRedeemed { .. } => "invite.redeemed",
            Self::InviteRevoked { .. } => "invite.revoked",
        }
    }

    /// Returns the timestamp when this event occurred.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::OrganizationCreated { at, .. }
            | Self::TeamCreated { at, .. }
            | Self::OnboardingCompleted { at, .. }
            | Self::MemberRoleChanged { at, .. }
            | Self::MemberRemoved { at, .. }
            | Self::InviteCreated { at, .. }
            | Self::InviteRedeemed { at, .. }
            | Self::InviteRevoked { at, .. } => *at,
        }
    }
}
