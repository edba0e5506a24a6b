//! Domain services for the RSVP flow.
//!
//! Services contain business logic that operates on domain models and the
//! injected guest directory.

pub mod confirmation;
pub mod directory;
pub mod editor;
pub mod guest_list;
pub mod resolver;
pub mod submission;

pub use confirmation::{build_confirmation_email, ConfirmationEmail, EventDetails};
pub use directory::{ChangeEvent, ChangeFeed, ChangeKind, DirectoryClient, InMemoryDirectory};
pub use editor::{EditableMember, RsvpEditor, UpdateIntent, DEFAULT_MEAL};
pub use guest_list::{
    GuestListStatus, GuestListSubscription, LiveGuestList, RefreshMode, RefreshTrigger,
};
pub use resolver::{resolve_in, GuestResolver, ResolvedGroup};
pub use submission::{MemberOutcome, SubmissionReport, SubmissionService, WriteMode};
