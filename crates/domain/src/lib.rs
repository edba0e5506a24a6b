//! Domain layer for the wedding RSVP backend.
//!
//! This crate contains:
//! - Domain models (Guest, RSVP form payloads, editor member ids)
//! - The guest directory abstraction and an in-memory implementation
//! - RSVP services: resolver, batch editor, submission, live guest list
//! - Domain error types

pub mod errors;
pub mod models;
pub mod services;

pub use errors::{DirectoryError, RsvpError};
