// Team identity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable team identifier.
pub type TeamId = String;

/// A registered team. Immutable once created; identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
}

impl Team {
    /// Create a team with a freshly generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Team {
            id: format!("team_{}", Uuid::new_v4().simple()),
            name: name.into(),
        }
    }

    /// Create a team with a caller-chosen id.
    pub fn with_id(id: impl Into<TeamId>, name: impl Into<String>) -> Self {
        Team {
            id: id.into(),
            name: name.into(),
        }
    }
}
