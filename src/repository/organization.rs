use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{GuardedWrite, OrgRole, Role};
use crate::AccessError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    /// Unique, derived from the name plus a random suffix.
    pub slug: String,
    pub email_domain: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Links a user to an organization. A user has at most one such row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgMember {
    pub id: i64,
    pub org_id: i64,
    pub user_id: i64,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrgMember {
    pub fn parse_role(&self) -> Option<OrgRole> {
        OrgRole::from_str(&self.role)
    }
}

#[derive(Debug, Clone)]
pub struct CreateOrganization {
    pub name: String,
    pub slug: String,
    pub email_domain: Option<String>,
    /// Becomes the first `business_admin`.
    pub creator_id: i64,
}

#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    /// Inserts the organization and its creator's `business_admin` row in
    /// one step. Fails with `AlreadyInOrganization` when the creator
    /// already belongs to an organization.
    async fn create_with_admin(
        &self,
        data: CreateOrganization,
    ) -> Result<(Organization, OrgMember), AccessError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Organization>, AccessError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Organization>, AccessError>;
}

#[async_trait]
pub trait OrgMemberRepository: Send + Sync {
    async fn find_by_org_and_user(
        &self,
        org_id: i64,
        user_id: i64,
    ) -> Result<Option<OrgMember>, AccessError>;

    /// The user's single organization membership, if any.
    async fn find_by_user(&self, user_id: i64) -> Result<Option<OrgMember>, AccessError>;

    async fn find_by_org(&self, org_id: i64) -> Result<Vec<OrgMember>, AccessError>;

    /// Changes a role unless it would leave the organization without a
    /// `business_admin`.
    async fn update_role_keeping_admin(
        &self,
        org_id: i64,
        user_id: i64,
        role: OrgRole,
    ) -> Result<GuardedWrite<OrgMember>, AccessError>;

    /// Removes a member unless it is the last `business_admin`.
    async fn delete_keeping_admin(
        &self,
        org_id: i64,
        user_id: i64,
    ) -> Result<GuardedWrite<()>, AccessError>;
}
