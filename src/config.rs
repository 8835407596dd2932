//! Configuration types for the access-control core.
//!
//! # Example
//!
//! ```rust
//! use tenantry::config::{AccessConfig, InviteConfig};
//! use chrono::Duration;
//!
//! // Use defaults
//! let config = AccessConfig::default();
//!
//! // Or customize
//! let config = AccessConfig {
//!     role_cache_ttl: Duration::minutes(1),
//!     invites: InviteConfig {
//!         expiry: Duration::days(3),
//!     },
//!     ..Default::default()
//! };
//! ```

use chrono::Duration;

/// Top-level configuration.
#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// How long a resolved role-fact bundle may be served from the cache.
    ///
    /// Default: 5 minutes
    pub role_cache_ttl: Duration,

    /// Invite code settings.
    pub invites: InviteConfig,

    /// Route gate paths and prefixes.
    pub gate: GateConfig,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            role_cache_ttl: Duration::minutes(5),
            invites: InviteConfig::default(),
            gate: GateConfig::default(),
        }
    }
}

impl AccessConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for local development.
    ///
    /// Shorter cache lifetime so role changes made by hand in the database
    /// show up quickly.
    pub fn development() -> Self {
        Self {
            role_cache_ttl: Duration::seconds(30),
            invites: InviteConfig {
                expiry: Duration::days(30),
            },
            gate: GateConfig::default(),
        }
    }

    /// Configuration with shorter lifetimes for sensitive deployments.
    pub fn strict() -> Self {
        Self {
            role_cache_ttl: Duration::minutes(1),
            invites: InviteConfig {
                expiry: Duration::days(2),
            },
            gate: GateConfig::default(),
        }
    }
}

/// Invite code settings.
#[derive(Debug, Clone)]
pub struct InviteConfig {
    /// Time from creation until an invite stops being redeemable.
    ///
    /// Default: 7 days
    pub expiry: Duration,
}

impl Default for InviteConfig {
    fn default() -> Self {
        Self {
            expiry: Duration::days(7),
        }
    }
}

/// Paths used by the route gate.
///
/// All prefixes are matched on whole path segments, so `/admin` covers
/// `/admin` and `/admin/users` but not `/administrator`.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Prefixes that require a session token.
    pub protected_prefixes: Vec<String>,

    /// Prefixes that additionally require the `business_admin` org role.
    pub admin_prefixes: Vec<String>,

    /// Protected prefixes reachable before onboarding is complete.
    pub onboarding_exempt_prefixes: Vec<String>,

    /// Where unauthenticated requests are sent.
    pub sign_in_path: String,

    /// Where users with incomplete onboarding are sent.
    pub onboarding_path: String,

    /// Where non-admins land when they hit an admin prefix.
    pub landing_path: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            protected_prefixes: vec![
                "/dashboard".to_owned(),
                "/ideas".to_owned(),
                "/sprints".to_owned(),
                "/teams".to_owned(),
                "/admin".to_owned(),
                "/onboarding".to_owned(),
                "/join".to_owned(),
            ],
            admin_prefixes: vec!["/admin".to_owned()],
            onboarding_exempt_prefixes: vec!["/onboarding".to_owned(), "/join".to_owned()],
            sign_in_path: "/sign-in".to_owned(),
            onboarding_path: "/onboarding".to_owned(),
            landing_path: "/dashboard".to_owned(),
        }
    }
}
