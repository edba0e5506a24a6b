//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

use crate::models::MemberId;

/// Errors raised by a guest directory implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("Directory unavailable: {0}")]
    Unavailable(String),

    #[error("Guest not found: {0}")]
    NotFound(Uuid),

    #[error("Directory rejected the write: {0}")]
    Rejected(String),
}

impl DirectoryError {
    /// Returns true if the store could not be reached at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DirectoryError::Unavailable(_))
    }
}

/// Errors surfaced by the RSVP flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RsvpError {
    #[error("We could not find your invitation")]
    NotFound,

    #[error("More than one invitation matches '{0}'. Please search by email instead")]
    AmbiguousMatch(String),

    #[error("Guest directory unavailable: {0}")]
    DirectoryUnavailable(String),

    #[error("Only one plus one can be added to a group")]
    CapacityExceeded,

    #[error("At least one guest is required")]
    MinimumGuestsViolation,

    #[error("Please fill in names for all guests")]
    IncompleteGuestData { member: MemberId },

    #[error("Please choose where you will be staying")]
    MissingLodgingSelection,

    #[error("Failed to save guest {id}: {reason}")]
    PersistenceFailure { id: MemberId, reason: String },

    #[error("Guest change stream lost: {0}")]
    SubscriptionLost(String),

    #[error("Unknown group member: {0}")]
    UnknownMember(MemberId),

    #[error("A submission for this group is already in progress")]
    SubmissionInProgress,
}

impl RsvpError {
    /// Returns true if repeating the same action may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RsvpError::DirectoryUnavailable(_)
                | RsvpError::PersistenceFailure { .. }
                | RsvpError::SubscriptionLost(_)
                | RsvpError::SubmissionInProgress
        )
    }

    /// Returns true for errors caught before any network call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            RsvpError::CapacityExceeded
                | RsvpError::MinimumGuestsViolation
                | RsvpError::IncompleteGuestData { .. }
                | RsvpError::MissingLodgingSelection
                | RsvpError::UnknownMember(_)
        )
    }
}

impl From<DirectoryError> for RsvpError {
    fn from(err: DirectoryError) -> Self {
        RsvpError::DirectoryUnavailable(err.to_string())
    }
}
