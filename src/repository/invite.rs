use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::AccessError;
use crate::invites::{Invite, InviteScope};

#[derive(Debug, Clone)]
pub struct CreateInvite<S: InviteScope> {
    pub scope_id: i64,
    /// Normalized address the invite is restricted to, if any.
    pub email: Option<String>,
    pub role: S::Role,
    pub code: String,
    pub created_by: i64,
    pub expires_at: DateTime<Utc>,
}

/// Storage for invites of one scope (team or organization).
#[async_trait]
pub trait InviteRepository<S: InviteScope>: Send + Sync {
    async fn create(&self, data: CreateInvite<S>) -> Result<Invite<S>, AccessError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Invite<S>>, AccessError>;

    async fn find_by_code(&self, code: &str) -> Result<Option<Invite<S>>, AccessError>;

    /// Unused invites of the scope with `expires_at > now`.
    async fn find_active_by_scope(
        &self,
        scope_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Invite<S>>, AccessError>;

    /// Flips `used` and inserts the membership for `user_id` in a single
    /// atomic step.
    ///
    /// Returns `false`, writing nothing, when the invite is already used or
    /// has expired at `now` by the time the write happens.
    async fn redeem(
        &self,
        invite_id: i64,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<bool, AccessError>;

    async fn delete(&self, id: i64) -> Result<(), AccessError>;

    /// Deletes invites whose `expires_at <= now`, returning how many.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AccessError>;
}
