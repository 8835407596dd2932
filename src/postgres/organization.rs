use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use super::{db_error, is_unique_violation, parse_stored};
use crate::repository::{
    CreateOrganization, GuardedWrite, OrgMember, OrgMemberRepository, OrgRole, Organization,
    OrganizationRepository, Role,
};
use crate::AccessError;
use crate::validators::ValidationError;

const ORG_COLUMNS: &str = "id, name, slug, email_domain, created_at, updated_at";
const MEMBER_COLUMNS: &str = "id, org_id, user_id, role, created_at, updated_at";
const EMAIL_DOMAIN_INDEX: &str = "uq_organizations_email_domain";

fn violates(e: &sqlx::Error, index: &str) -> bool {
    is_unique_violation(e) && e.as_database_error().and_then(|d| d.constraint()) == Some(index)
}

#[derive(Clone)]
pub struct PostgresOrganizationRepository {
    pool: PgPool,
}

impl PostgresOrganizationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Clone)]
pub struct PostgresOrgMemberRepository {
    pool: PgPool,
}

impl PostgresOrgMemberRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct OrganizationRecord {
    id: i64,
    name: String,
    slug: String,
    email_domain: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrganizationRecord> for Organization {
    fn from(row: OrganizationRecord) -> Self {
        Organization {
            id: row.id,
            name: row.name,
            slug: row.slug,
            email_domain: row.email_domain,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct OrgMemberRecord {
    id: i64,
    org_id: i64,
    user_id: i64,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrgMemberRecord> for OrgMember {
    fn from(row: OrgMemberRecord) -> Self {
        OrgMember {
            id: row.id,
            org_id: row.org_id,
            user_id: row.user_id,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl OrganizationRepository for PostgresOrganizationRepository {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn create_with_admin(&self, data: CreateOrganization) -> Result<(Organization, OrgMember), AccessError> {
        let mut tx = self.pool.begin().await.map_err(db_error("create_organization"))?;

        let org: OrganizationRecord = sqlx::query_as(&format!(
            r"
            INSERT INTO organizations (name, slug, email_domain)
            VALUES ($1, $2, $3)
            RETURNING {ORG_COLUMNS}
            "
        ))
        .bind(&data.name)
        .bind(&data.slug)
        .bind(&data.email_domain)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if violates(&e, EMAIL_DOMAIN_INDEX) {
                AccessError::from(ValidationError::DomainTaken)
            } else {
                db_error("create_organization")(e)
            }
        })?;

        // organization_members.user_id is unique: one organization per user.
        let member: OrgMemberRecord = sqlx::query_as(&format!(
            r"
            INSERT INTO organization_members (org_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING {MEMBER_COLUMNS}
            "
        ))
        .bind(org.id)
        .bind(data.creator_id)
        .bind(OrgRole::BusinessAdmin.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AccessError::AlreadyInOrganization
            } else {
                db_error("create_organization")(e)
            }
        })?;

        tx.commit().await.map_err(db_error("create_organization"))?;

        Ok((org.into(), member.into()))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_by_id(&self, id: i64) -> Result<Option<Organization>, AccessError> {
        let row: Option<OrganizationRecord> =
            sqlx::query_as(&format!("SELECT {ORG_COLUMNS} FROM organizations WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("find_organization_by_id"))?;

        Ok(row.map(Into::into))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Organization>, AccessError> {
        let row: Option<OrganizationRecord> =
            sqlx::query_as(&format!("SELECT {ORG_COLUMNS} FROM organizations WHERE slug = $1"))
                .bind(slug)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("find_organization_by_slug"))?;

        Ok(row.map(Into::into))
    }
}

#[async_trait]
impl OrgMemberRepository for PostgresOrgMemberRepository {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_by_org_and_user(&self, org_id: i64, user_id: i64) -> Result<Option<OrgMember>, AccessError> {
        let row: Option<OrgMemberRecord> = sqlx::query_as(&format!(
            "SELECT {MEMBER_COLUMNS} FROM organization_members WHERE org_id = $1 AND user_id = $2"
        ))
        .bind(org_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("find_org_member"))?;

        Ok(row.map(Into::into))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_by_user(&self, user_id: i64) -> Result<Option<OrgMember>, AccessError> {
        let row: Option<OrgMemberRecord> =
            sqlx::query_as(&format!("SELECT {MEMBER_COLUMNS} FROM organization_members WHERE user_id = $1"))
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("find_org_member_by_user"))?;

        Ok(row.map(Into::into))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_by_org(&self, org_id: i64) -> Result<Vec<OrgMember>, AccessError> {
        let rows: Vec<OrgMemberRecord> = sqlx::query_as(&format!(
            "SELECT {MEMBER_COLUMNS} FROM organization_members WHERE org_id = $1 ORDER BY id"
        ))
        .bind(org_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("find_org_members"))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn update_role_keeping_admin(
        &self,
        org_id: i64,
        user_id: i64,
        role: OrgRole,
    ) -> Result<GuardedWrite<OrgMember>, AccessError> {
        let mut tx = self.pool.begin().await.map_err(db_error("update_org_member_role"))?;

        let members: Vec<OrgMemberRecord> = sqlx::query_as(&format!(
            "SELECT {MEMBER_COLUMNS} FROM organization_members WHERE org_id = $1 FOR UPDATE"
        ))
        .bind(org_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_error("update_org_member_role"))?;

        let Some(target) = members.iter().find(|m| m.user_id == user_id) else {
            return Ok(GuardedWrite::Missing);
        };

        let admins = members
            .iter()
            .filter(|m| m.role == OrgRole::BusinessAdmin.as_str())
            .count();
        let current: OrgRole = parse_stored(&target.role)?;
        if current == OrgRole::BusinessAdmin && role != OrgRole::BusinessAdmin && admins <= 1 {
            return Ok(GuardedWrite::LastAdmin);
        }

        let row: OrgMemberRecord = sqlx::query_as(&format!(
            r"
            UPDATE organization_members SET role = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING {MEMBER_COLUMNS}
            "
        ))
        .bind(role.as_str())
        .bind(target.id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("update_org_member_role"))?;

        tx.commit().await.map_err(db_error("update_org_member_role"))?;

        Ok(GuardedWrite::Applied(row.into()))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn delete_keeping_admin(&self, org_id: i64, user_id: i64) -> Result<GuardedWrite<()>, AccessError> {
        let mut tx = self.pool.begin().await.map_err(db_error("delete_org_member"))?;

        let members: Vec<OrgMemberRecord> = sqlx::query_as(&format!(
            "SELECT {MEMBER_COLUMNS} FROM organization_members WHERE org_id = $1 FOR UPDATE"
        ))
        .bind(org_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(db_error("delete_org_member"))?;

        let Some(target) = members.iter().find(|m| m.user_id == user_id) else {
            return Ok(GuardedWrite::Missing);
        };

        let admins = members
            .iter()
            .filter(|m| m.role == OrgRole::BusinessAdmin.as_str())
            .count();
        if target.role == OrgRole::BusinessAdmin.as_str() && admins <= 1 {
            return Ok(GuardedWrite::LastAdmin);
        }

        sqlx::query("DELETE FROM organization_members WHERE id = $1")
            .bind(target.id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("delete_org_member"))?;

        tx.commit().await.map_err(db_error("delete_org_member"))?;

        Ok(GuardedWrite::Applied(()))
    }
}
