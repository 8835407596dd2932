use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use super::{db_error, parse_stored};
use crate::repository::{AccountType, Role, User, UserRepository};
use crate::AccessError;

const USER_COLUMNS: &str = "id, email, auth_subject, onboarding_complete, account_type, created_at, updated_at";

#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRecord {
    id: i64,
    email: String,
    auth_subject: Option<String>,
    onboarding_complete: bool,
    account_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRecord> for User {
    type Error = AccessError;

    fn try_from(row: UserRecord) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            email: row.email,
            auth_subject: row.auth_subject,
            onboarding_complete: row.onboarding_complete,
            account_type: parse_stored(&row.account_type)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, AccessError> {
        let row: Option<UserRecord> = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("find_user_by_id"))?;

        row.map(TryInto::try_into).transpose()
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AccessError> {
        let row: Option<UserRecord> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("find_user_by_email"))?;

        row.map(TryInto::try_into).transpose()
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_user_by_subject(&self, subject: &str) -> Result<Option<User>, AccessError> {
        let row: Option<UserRecord> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE auth_subject = $1"))
                .bind(subject)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error("find_user_by_subject"))?;

        row.map(TryInto::try_into).transpose()
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn provision_by_email(&self, email: &str) -> Result<User, AccessError> {
        // The no-op update makes RETURNING yield the existing row on conflict.
        let row: UserRecord = sqlx::query_as(&format!(
            r"
            INSERT INTO users (email) VALUES ($1)
            ON CONFLICT (email) DO UPDATE SET email = EXCLUDED.email
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("provision_by_email"))?;

        row.try_into()
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn provision_by_subject(&self, subject: &str, email: &str) -> Result<User, AccessError> {
        let mut tx = self.pool.begin().await.map_err(db_error("provision_by_subject"))?;

        let existing: Option<UserRecord> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE auth_subject = $1"))
                .bind(subject)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error("provision_by_subject"))?;

        let row = match existing {
            Some(row) => row,
            None => {
                let linked: Option<UserRecord> = sqlx::query_as(&format!(
                    r"
                    UPDATE users SET auth_subject = $1, updated_at = NOW()
                    WHERE email = $2 AND auth_subject IS NULL
                    RETURNING {USER_COLUMNS}
                    "
                ))
                .bind(subject)
                .bind(email)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error("provision_by_subject"))?;

                match linked {
                    Some(row) => row,
                    None => sqlx::query_as(&format!(
                        r"
                        INSERT INTO users (email, auth_subject) VALUES ($1, $2)
                        ON CONFLICT (auth_subject) DO UPDATE SET auth_subject = EXCLUDED.auth_subject
                        RETURNING {USER_COLUMNS}
                        "
                    ))
                    .bind(email)
                    .bind(subject)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(db_error("provision_by_subject"))?,
                }
            }
        };

        tx.commit().await.map_err(db_error("provision_by_subject"))?;
        row.try_into()
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn complete_onboarding(&self, user_id: i64, account_type: AccountType) -> Result<User, AccessError> {
        let row: Option<UserRecord> = sqlx::query_as(&format!(
            r"
            UPDATE users SET onboarding_complete = TRUE, account_type = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(account_type.as_str())
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("complete_onboarding"))?;

        row.ok_or(AccessError::NotFound)?.try_into()
    }
}
