//! Election entity.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Election lifecycle status. Transitions are administrator-driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElectionStatus {
    #[sea_orm(string_value = "UPCOMING")]
    Upcoming,
    #[sea_orm(string_value = "IN_PROGRESS")]
    InProgress,
    #[sea_orm(string_value = "ENDED")]
    Ended,
    #[sea_orm(string_value = "PAUSED")]
    Paused,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

impl ElectionStatus {
    /// Wire/database name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upcoming => "UPCOMING",
            Self::InProgress => "IN_PROGRESS",
            Self::Ended => "ENDED",
            Self::Paused => "PAUSED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "election")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    pub status: ElectionStatus,

    /// Voting opens at this instant (inclusive)
    #[sea_orm(nullable)]
    pub start_date: Option<DateTimeWithTimeZone>,

    /// Voting closes at this instant (exclusive)
    #[sea_orm(nullable)]
    pub end_date: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::portfolio::Entity")]
    Portfolio,
    #[sea_orm(has_many = "super::candidate::Entity")]
    Candidate,
    #[sea_orm(has_many = "super::voter_election::Entity")]
    VoterElection,
}

impl Related<super::portfolio::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Portfolio.def()
    }
}

impl Related<super::candidate::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Candidate.def()
    }
}

impl Related<super::voter_election::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VoterElection.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether `start_date < end_date` holds (vacuously true if either is absent).
    #[must_use]
    pub fn window_is_valid(&self) -> bool {
        match (&self.start_date, &self.end_date) {
            (Some(start), Some(end)) => start < end,
            _ => true,
        }
    }

    /// Whether `now` lies within `[start_date, end_date)`.
    ///
    /// A missing bound leaves that side of the window open.
    #[must_use]
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        let after_start = self.start_date.as_ref().is_none_or(|start| now >= *start);
        let before_end = self.end_date.as_ref().is_none_or(|end| now < *end);
        after_start && before_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn election(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Model {
        Model {
            id: 1,
            name: "Student Council".to_string(),
            description: None,
            status: ElectionStatus::InProgress,
            start_date: start.map(Into::into),
            end_date: end.map(Into::into),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[test]
    fn test_window_is_half_open() {
        let start = Utc::now();
        let end = start + Duration::hours(1);
        let e = election(Some(start), Some(end));

        assert!(e.is_open_at(start));
        assert!(e.is_open_at(end - Duration::seconds(1)));
        assert!(!e.is_open_at(end));
        assert!(!e.is_open_at(start - Duration::seconds(1)));
    }

    #[test]
    fn test_missing_bounds_are_unbounded() {
        let now = Utc::now();
        assert!(election(None, None).is_open_at(now));
        assert!(election(None, Some(now + Duration::minutes(1))).is_open_at(now));
        assert!(!election(Some(now + Duration::minutes(1)), None).is_open_at(now));
    }

    #[test]
    fn test_window_validity() {
        let now = Utc::now();
        assert!(election(Some(now), Some(now + Duration::days(1))).window_is_valid());
        assert!(!election(Some(now), Some(now)).window_is_valid());
        assert!(election(Some(now), None).window_is_valid());
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(ElectionStatus::InProgress.as_str(), "IN_PROGRESS");
        assert_eq!(
            serde_json::to_string(&ElectionStatus::Cancelled).unwrap_or_default(),
            "\"CANCELLED\""
        );
    }
}
