//! Plain-text RSVP confirmation email.

use serde::Serialize;

use crate::models::Guest;

const NOT_SPECIFIED: &str = "Not specified";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmationEmail {
    pub subject: String,
    pub body: String,
}

/// Event details printed in the email.
#[derive(Debug, Clone)]
pub struct EventDetails {
    pub couple_names: String,
    pub location: String,
}

impl Default for EventDetails {
    fn default() -> Self {
        Self {
            couple_names: "Zhang & Yang".to_string(),
            location: "Maui".to_string(),
        }
    }
}

fn or_default<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    value.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(fallback)
}

fn humanize(value: Option<&str>) -> String {
    or_default(value, NOT_SPECIFIED).replace('_', " ")
}

/// Builds the confirmation email for one guest.
pub fn build_confirmation_email(guest: &Guest, event: &EventDetails) -> ConfirmationEmail {
    let full_name = guest.full_name();
    let greeting = if !guest.first_name.trim().is_empty() {
        guest.first_name.trim()
    } else if !full_name.is_empty() {
        full_name.as_str()
    } else {
        "there"
    };

    let accommodation = guest
        .accommodation
        .map(|a| a.label())
        .unwrap_or(NOT_SPECIFIED);
    let plus_one = if guest.plus_one {
        or_default(guest.plus_one_name.as_deref(), "Yes")
    } else {
        "No"
    };

    let lines = [
        format!("Dear {},", greeting),
        String::new(),
        format!(
            "Thank you for your RSVP! We are so excited to celebrate with you in {}.",
            event.location
        ),
        String::new(),
        "Your RSVP details".to_string(),
        "----------------".to_string(),
        format!("Name: {}", or_default(Some(full_name.as_str()), NOT_SPECIFIED)),
        format!("Email: {}", or_default(guest.email.as_deref(), NOT_SPECIFIED)),
        format!("Phone: {}", or_default(guest.phone.as_deref(), NOT_SPECIFIED)),
        format!("Status: {}", guest.rsvp_status),
        String::new(),
        format!("Accommodation: {}", accommodation),
        format!("Room details: {}", humanize(guest.room_detail.as_deref())),
        format!("Booking method: {}", humanize(guest.booking_method.as_deref())),
        String::new(),
        format!(
            "Dinner selection: {}",
            or_default(guest.meal_choice.as_deref(), NOT_SPECIFIED)
        ),
        format!(
            "Dietary restrictions: {}",
            or_default(guest.dietary_restrictions.as_deref(), "None")
        ),
        String::new(),
        format!("Plus one: {}", plus_one),
        String::new(),
        format!("Notes: {}", or_default(guest.note.as_deref(), "None")),
        String::new(),
        String::new(),
        "With love,".to_string(),
        event.couple_names.clone(),
    ];

    ConfirmationEmail {
        subject: format!("Wedding RSVP Confirmation - {}", event.couple_names),
        body: lines.join("\n"),
    }
}
