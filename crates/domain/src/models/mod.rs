//! Domain models for the wedding RSVP backend.

pub mod guest;
pub mod member;
pub mod rsvp;

pub use guest::{Accommodation, Guest, GuestFields, GuestStats, RsvpStatus};
pub use member::MemberId;
