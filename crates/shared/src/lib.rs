//! Shared utilities for the wedding RSVP backend.
//!
//! This crate provides small helpers used across the other crates:
//! - Shared-secret digests and comparison
//! - Text normalization for names, emails and search input
//! - Custom `validator` functions

pub mod crypto;
pub mod validation;
