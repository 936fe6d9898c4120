//! Voter entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "voter")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// External voter identifier (student number, admin user ID, ...)
    #[sea_orm(unique, nullable)]
    pub voter_id: Option<String>,

    #[sea_orm(unique, nullable)]
    pub phone_number: Option<String>,

    pub name: String,

    /// Session token issued after OTP verification
    #[sea_orm(unique, nullable)]
    #[serde(skip_serializing)]
    pub token: Option<String>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::voter_election::Entity")]
    VoterElection,
    #[sea_orm(has_many = "super::vote_action::Entity")]
    VoteAction,
}

impl Related<super::voter_election::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VoterElection.def()
    }
}

impl Related<super::vote_action::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VoteAction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
