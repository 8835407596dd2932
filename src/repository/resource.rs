use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::AccessError;

/// Ownership facts of an idea. The idea's content lives elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Idea {
    pub id: i64,
    pub owner_id: i64,
    pub team_id: Option<i64>,
}

/// Ownership facts of a sprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprint {
    pub id: i64,
    pub owner_id: i64,
    pub team_id: Option<i64>,
}

#[async_trait]
pub trait IdeaRepository: Send + Sync {
    async fn find_idea(&self, id: i64) -> Result<Option<Idea>, AccessError>;
}

#[async_trait]
pub trait SprintRepository: Send + Sync {
    async fn find_sprint(&self, id: i64) -> Result<Option<Sprint>, AccessError>;

    /// Whether the user is on the sprint's explicit participant list.
    async fn is_participant(&self, sprint_id: i64, user_id: i64) -> Result<bool, AccessError>;
}
