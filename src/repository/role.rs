use std::fmt;

use serde::{Deserialize, Serialize};

/// A role stored as a string column and parsed back into a typed enum.
pub trait Role: Clone + Send + Sync + 'static {
    /// Convert to string for database storage.
    fn as_str(&self) -> &'static str;

    /// Parse from database string.
    fn from_str(s: &str) -> Option<Self>;
}

/// Role of a user inside a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeamRole {
    Admin,
    Member,
}

impl Role for TeamRole {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Self::Admin),
            "member" => Some(Self::Member),
            _ => None,
        }
    }
}

/// Role of a user inside an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgRole {
    BusinessAdmin,
    TeamAdmin,
    Member,
}

impl Role for OrgRole {
    fn as_str(&self) -> &'static str {
        match self {
            Self::BusinessAdmin => "business_admin",
            Self::TeamAdmin => "team_admin",
            Self::Member => "member",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "business_admin" => Some(Self::BusinessAdmin),
            "team_admin" => Some(Self::TeamAdmin),
            "member" => Some(Self::Member),
            _ => None,
        }
    }
}

/// Kind of account chosen during onboarding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    #[default]
    Individual,
    Business,
}

impl Role for AccountType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Business => "business",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "individual" => Some(Self::Individual),
            "business" => Some(Self::Business),
            _ => None,
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(TeamRole, OrgRole, AccountType);

/// Outcome of a membership write that must keep at least one admin.
///
/// The admin count is checked and the row written under the same lock or
/// transaction, so two concurrent demotions cannot both succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardedWrite<T> {
    Applied(T),
    /// No membership row for the (scope, user) pair.
    Missing,
    /// The write would remove the scope's last admin.
    LastAdmin,
}
