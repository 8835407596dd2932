use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use super::db_error;
use crate::repository::{Idea, IdeaRepository, Sprint, SprintRepository};
use crate::AccessError;

/// Ownership facts of ideas and sprints.
#[derive(Clone)]
pub struct PostgresResourceRepository {
    pool: PgPool,
}

impl PostgresResourceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct OwnershipRecord {
    id: i64,
    owner_id: i64,
    team_id: Option<i64>,
}

#[async_trait]
impl IdeaRepository for PostgresResourceRepository {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_idea(&self, id: i64) -> Result<Option<Idea>, AccessError> {
        let row: Option<OwnershipRecord> = sqlx::query_as("SELECT id, owner_id, team_id FROM ideas WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("find_idea"))?;

        Ok(row.map(|r| Idea {
            id: r.id,
            owner_id: r.owner_id,
            team_id: r.team_id,
        }))
    }
}

#[async_trait]
impl SprintRepository for PostgresResourceRepository {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_sprint(&self, id: i64) -> Result<Option<Sprint>, AccessError> {
        let row: Option<OwnershipRecord> = sqlx::query_as("SELECT id, owner_id, team_id FROM sprints WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("find_sprint"))?;

        Ok(row.map(|r| Sprint {
            id: r.id,
            owner_id: r.owner_id,
            team_id: r.team_id,
        }))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn is_participant(&self, sprint_id: i64, user_id: i64) -> Result<bool, AccessError> {
        let (exists,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM sprint_participants WHERE sprint_id = $1 AND user_id = $2)",
        )
        .bind(sprint_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("is_sprint_participant"))?;

        Ok(exists)
    }
}
