//! Candidate entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "candidate")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    #[sea_orm(nullable)]
    pub party: Option<String>,

    #[sea_orm(nullable)]
    pub party_symbol: Option<String>,

    /// Image URL
    #[sea_orm(nullable)]
    pub profile_picture: Option<String>,

    #[sea_orm(indexed)]
    pub portfolio_id: i32,

    /// Redundant with the portfolio's election; kept for ballot validation
    #[sea_orm(indexed)]
    pub election_id: i32,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::portfolio::Entity",
        from = "Column::PortfolioId",
        to = "super::portfolio::Column::Id",
        on_delete = "Cascade"
    )]
    Portfolio,
    #[sea_orm(
        belongs_to = "super::election::Entity",
        from = "Column::ElectionId",
        to = "super::election::Column::Id",
        on_delete = "Cascade"
    )]
    Election,
}

impl Related<super::portfolio::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Portfolio.def()
    }
}

impl Related<super::election::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Election.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether this candidate may be chosen for `portfolio_id` in `election_id`.
    #[must_use]
    pub const fn is_bound_to(&self, portfolio_id: i32, election_id: i32) -> bool {
        self.portfolio_id == portfolio_id && self.election_id == election_id
    }
}
