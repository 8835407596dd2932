use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AccountType;
use crate::AccessError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Normalized (trimmed, lowercased) address.
    pub email: String,
    /// Subject issued by an external identity provider.
    pub auth_subject: Option<String>,
    pub onboarding_complete: bool,
    pub account_type: AccountType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, AccessError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AccessError>;
    async fn find_user_by_subject(&self, subject: &str) -> Result<Option<User>, AccessError>;

    /// Returns the user with this email, creating it if absent.
    ///
    /// Must be idempotent under concurrency; implementations rely on the
    /// unique constraint on `email`.
    async fn provision_by_email(&self, email: &str) -> Result<User, AccessError>;

    /// Returns the user with this external subject, creating it if absent.
    ///
    /// A local user with the same email and no subject is linked instead of
    /// duplicated.
    async fn provision_by_subject(&self, subject: &str, email: &str) -> Result<User, AccessError>;

    async fn complete_onboarding(
        &self,
        user_id: i64,
        account_type: AccountType,
    ) -> Result<User, AccessError>;
}
