//! Persistence layer for the wedding RSVP backend.
//!
//! This crate contains:
//! - Database connection management
//! - The guest row entity and its conversion to the domain `Guest`
//! - The guest repository
//! - A PostgreSQL guest directory with a LISTEN/NOTIFY change feed

pub mod db;
pub mod directory;
pub mod entities;
pub mod metrics;
pub mod repositories;

pub use directory::{PgDirectory, GUEST_CHANGES_CHANNEL};
