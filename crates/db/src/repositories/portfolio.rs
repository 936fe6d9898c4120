//! Portfolio (contested position) repository.

use std::sync::Arc;

use crate::entities::{Portfolio, portfolio};
use ballotbox_common::{AppError, AppResult};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

/// Portfolio repository for database operations.
#[derive(Clone)]
pub struct PortfolioRepository {
    db: Arc<DatabaseConnection>,
}

impl PortfolioRepository {
    /// Create a new portfolio repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Portfolios of an election, in creation order.
    pub async fn find_by_election(&self, election_id: i32) -> AppResult<Vec<portfolio::Model>> {
        Portfolio::find()
            .filter(portfolio::Column::ElectionId.eq(election_id))
            .order_by_asc(portfolio::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find portfolios by IDs.
    pub async fn find_by_ids(&self, ids: &[i32]) -> AppResult<Vec<portfolio::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Portfolio::find()
            .filter(portfolio::Column::Id.is_in(ids.iter().copied()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_portfolio(id: i32, election_id: i32) -> portfolio::Model {
        portfolio::Model {
            id,
            name: format!("Portfolio {id}"),
            description: None,
            election_id,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_election() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_portfolio(1, 7), create_test_portfolio(2, 7)]])
                .into_connection(),
        );

        let repo = PortfolioRepository::new(db);
        let portfolios = repo.find_by_election(7).await.unwrap();

        assert_eq!(portfolios.len(), 2);
        assert!(portfolios.iter().all(|p| p.election_id == 7));
    }
}
