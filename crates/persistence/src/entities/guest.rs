//! Guest entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Accommodation, Guest, RsvpStatus};
use shared::validation::blank_to_none;
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;

/// Database row mapping for the guests table.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct GuestEntity {
    pub id: Uuid,
    pub family_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub rsvp_status: String,
    pub accommodation: Option<String>,
    pub room_detail: Option<String>,
    pub booking_method: Option<String>,
    pub meal_choice: Option<String>,
    pub dietary_restrictions: Option<String>,
    pub plus_one: bool,
    pub plus_one_name: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored row that does not map onto a domain guest.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityConversionError {
    #[error("guest {id} has invalid rsvp_status '{value}'")]
    InvalidStatus { id: Uuid, value: String },

    #[error("guest {id} has invalid accommodation '{value}'")]
    InvalidAccommodation { id: Uuid, value: String },
}

impl TryFrom<GuestEntity> for Guest {
    type Error = EntityConversionError;

    fn try_from(entity: GuestEntity) -> Result<Self, Self::Error> {
        let rsvp_status: RsvpStatus =
            entity
                .rsvp_status
                .parse()
                .map_err(|_| EntityConversionError::InvalidStatus {
                    id: entity.id,
                    value: entity.rsvp_status.clone(),
                })?;

        let accommodation = match entity.accommodation.as_deref() {
            Some(value) => Accommodation::parse_optional(value).map_err(|_| {
                EntityConversionError::InvalidAccommodation {
                    id: entity.id,
                    value: value.to_string(),
                }
            })?,
            None => None,
        };

        Ok(Guest {
            id: entity.id,
            family_id: blank_to_none(entity.family_id),
            first_name: entity.first_name,
            last_name: entity.last_name,
            email: blank_to_none(entity.email),
            phone: blank_to_none(entity.phone),
            rsvp_status,
            accommodation,
            room_detail: blank_to_none(entity.room_detail),
            booking_method: blank_to_none(entity.booking_method),
            meal_choice: blank_to_none(entity.meal_choice),
            dietary_restrictions: blank_to_none(entity.dietary_restrictions),
            plus_one: entity.plus_one,
            plus_one_name: blank_to_none(entity.plus_one_name),
            note: blank_to_none(entity.note),
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        })
    }
}

impl From<&Guest> for GuestEntity {
    fn from(guest: &Guest) -> Self {
        Self {
            id: guest.id,
            family_id: blank_to_none(guest.family_id.clone()),
            first_name: guest.first_name.trim().to_string(),
            last_name: guest.last_name.trim().to_string(),
            email: blank_to_none(guest.email.clone()),
            phone: blank_to_none(guest.phone.clone()),
            rsvp_status: guest.rsvp_status.as_str().to_string(),
            accommodation: guest.accommodation.map(|a| a.as_str().to_string()),
            room_detail: blank_to_none(guest.room_detail.clone()),
            booking_method: blank_to_none(guest.booking_method.clone()),
            meal_choice: blank_to_none(guest.meal_choice.clone()),
            dietary_restrictions: blank_to_none(guest.dietary_restrictions.clone()),
            plus_one: guest.plus_one,
            plus_one_name: blank_to_none(guest.plus_one_name.clone()),
            note: blank_to_none(guest.note.clone()),
            created_at: guest.created_at,
            updated_at: guest.updated_at,
        }
    }
}
