//! Storage traits and data types.
//!
//! The core never talks to a database directly; it asks these traits for
//! the relationship facts it needs. Implement them for your own backend or
//! use the `sqlx_postgres` adapters.
//!
//! # Traits
//!
//! | Trait | Description |
//! |-------|-------------|
//! | [`UserRepository`] | User lookup and idempotent provisioning |
//! | [`OrganizationRepository`] | Organization creation and lookup |
//! | [`OrgMemberRepository`] | Organization membership, last-admin-safe writes |
//! | [`TeamRepository`] | Team creation and lookup |
//! | [`TeamMemberRepository`] | Team membership, last-admin-safe writes |
//! | [`IdeaRepository`] / [`SprintRepository`] | Ownership facts of guarded resources |
//! | [`InviteRepository`] | Invite storage and atomic redemption, per scope |
//!
//! # Mock Implementation
//!
//! Enable the `mocks` feature for [`MockAccessStore`], an in-memory store
//! implementing every trait above.

mod invite;
mod organization;
mod resource;
mod role;
mod team;
mod user;

#[cfg(any(test, feature = "mocks"))]
mod mock;

pub use invite::{CreateInvite, InviteRepository};
pub use organization::{CreateOrganization, OrgMember, OrgMemberRepository, Organization, OrganizationRepository};
pub use resource::{Idea, IdeaRepository, Sprint, SprintRepository};
pub use role::{AccountType, GuardedWrite, OrgRole, Role, TeamRole};
pub use team::{CreateTeam, Team, TeamMember, TeamMemberRepository, TeamRepository};
pub use user::{User, UserRepository};

#[cfg(any(test, feature = "mocks"))]
pub use mock::MockAccessStore;
