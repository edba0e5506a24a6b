//! Identifiers for members of an RSVP editing session.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a member inside an editing session.
///
/// The variant records where the id came from, which decides how the
/// member is persisted on submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum MemberId {
    /// A guest row confirmed by the directory. Persisted with an update.
    Stored(Uuid),
    /// A self-registered guest not yet known to the directory. Persisted with a create.
    Registered(Uuid),
    /// The group's plus one. Never persisted as its own row.
    PlusOne(Uuid),
}

impl MemberId {
    pub fn uuid(&self) -> Uuid {
        match self {
            MemberId::Stored(id) | MemberId::Registered(id) | MemberId::PlusOne(id) => *id,
        }
    }

    pub fn is_plus_one(&self) -> bool {
        matches!(self, MemberId::PlusOne(_))
    }

    /// Stored or registered members are real guests.
    pub fn is_real(&self) -> bool {
        !self.is_plus_one()
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberId::Stored(id) => write!(f, "{}", id),
            MemberId::Registered(id) => write!(f, "registered-{}", id),
            MemberId::PlusOne(id) => write!(f, "plusone-{}", id),
        }
    }
}
