//! Election directory repository.

use std::sync::Arc;

use crate::entities::{Election, election};
use ballotbox_common::{AppError, AppResult};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

/// Election repository for database operations.
#[derive(Clone)]
pub struct ElectionRepository {
    db: Arc<DatabaseConnection>,
}

impl ElectionRepository {
    /// Create a new election repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find an election by ID.
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<election::Model>> {
        Election::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get an election by ID, returning `ElectionNotFound` if absent.
    pub async fn get_by_id(&self, id: i32) -> AppResult<election::Model> {
        self.find_by_id(id)
            .await?
            .ok_or(AppError::ElectionNotFound(id))
    }

    /// All elections, newest first.
    pub async fn find_all(&self) -> AppResult<Vec<election::Model>> {
        Election::find()
            .order_by_desc(election::Column::CreatedAt)
            .order_by_desc(election::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find elections by IDs.
    pub async fn find_by_ids(&self, ids: &[i32]) -> AppResult<Vec<election::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Election::find()
            .filter(election::Column::Id.is_in(ids.iter().copied()))
            .order_by_desc(election::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
