//! Invite-code lifecycle for teams and organizations.
//!
//! An invite is `active` until it is redeemed (`used = true`) or its
//! `expires_at` passes; both are terminal. Expiry is computed on read, so
//! nothing sweeps invites in the background.

mod join;
mod manager;
mod members;
mod types;

pub use join::{JoinOutcome, JoinService};
pub use manager::{InviteManager, RedeemInvite};
pub use members::ScopeMembers;
pub use types::{Invite, InviteScope, InviteState, OrgScope, RedeemOutcome, ScopeKind, TeamScope};

#[cfg(test)]
mod tests;
