//! Authenticated caller identity.

use ballotbox_db::entities::{user, voter};

/// The caller a bearer token resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// An administrator account.
    Admin(user::Model),
    /// A registered voter.
    Voter(voter::Model),
}

impl Principal {
    /// Whether the caller holds an administrative role.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin(_))
    }

    /// Identifier used in log fields.
    #[must_use]
    pub fn log_id(&self) -> String {
        match self {
            Self::Admin(user) => format!("admin:{}", user.id),
            Self::Voter(voter) => format!("voter:{}", voter.id),
        }
    }
}
