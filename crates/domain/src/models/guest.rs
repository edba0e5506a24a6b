//! Guest domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use shared::validation::blank_to_none;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// RSVP state of a guest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RsvpStatus {
    #[default]
    Pending,
    Attending,
    Declined,
}

impl RsvpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RsvpStatus::Pending => "Pending",
            RsvpStatus::Attending => "Attending",
            RsvpStatus::Declined => "Declined",
        }
    }

    /// Returns true if the RSVP flow may move a guest from `self` to `next`.
    ///
    /// A guest that has answered never goes back to `Pending`.
    pub fn can_transition_to(&self, next: RsvpStatus) -> bool {
        next != RsvpStatus::Pending || *self == RsvpStatus::Pending
    }
}

impl FromStr for RsvpStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(RsvpStatus::Pending),
            "attending" => Ok(RsvpStatus::Attending),
            "declined" => Ok(RsvpStatus::Declined),
            _ => Err(format!("Invalid RSVP status: {}", s)),
        }
    }
}

impl fmt::Display for RsvpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a group is staying.
///
/// "Unset" is represented as `Option::None` wherever this type appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Accommodation {
    #[serde(rename = "andaz")]
    Andaz,
    #[serde(rename = "ac_hotel")]
    AcHotel,
    #[serde(rename = "self")]
    SelfBooked,
}

impl Accommodation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Accommodation::Andaz => "andaz",
            Accommodation::AcHotel => "ac_hotel",
            Accommodation::SelfBooked => "self",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Accommodation::Andaz => "Andaz",
            Accommodation::AcHotel => "AC Hotel",
            Accommodation::SelfBooked => "Self booked / Other",
        }
    }

    /// Whether room view and bed sub-options apply to this choice.
    pub fn has_room_options(&self) -> bool {
        matches!(self, Accommodation::Andaz)
    }

    /// Parses an optional value, treating blank input as unset.
    pub fn parse_optional(value: &str) -> Result<Option<Self>, String> {
        if value.trim().is_empty() {
            Ok(None)
        } else {
            value.parse().map(Some)
        }
    }
}

impl FromStr for Accommodation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "andaz" => Ok(Accommodation::Andaz),
            "ac_hotel" => Ok(Accommodation::AcHotel),
            "self" => Ok(Accommodation::SelfBooked),
            _ => Err(format!("Invalid accommodation: {}", s)),
        }
    }
}

impl fmt::Display for Accommodation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Deserializes an optional accommodation where `""` and `null` both mean unset.
pub fn deserialize_accommodation<'de, D>(deserializer: D) -> Result<Option<Accommodation>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(value) => Accommodation::parse_optional(&value).map_err(serde::de::Error::custom),
    }
}

/// Deserializes a present field as `Some`, so that an explicit `null`
/// becomes `Some(None)` while a missing field stays `None` via `#[serde(default)]`.
fn deserialize_present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn deserialize_present_accommodation<'de, D>(
    deserializer: D,
) -> Result<Option<Option<Accommodation>>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_accommodation(deserializer).map(Some)
}

/// One invitee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Guest {
    pub id: Uuid,
    pub family_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub rsvp_status: RsvpStatus,
    pub accommodation: Option<Accommodation>,
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

impl Guest {
    /// "First Last", trimmed.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }

    /// Key identifying the editable group this guest belongs to.
    ///
    /// Guests without a family id form a group of one.
    pub fn group_key(&self) -> String {
        match &self.family_id {
            Some(family_id) => family_id.clone(),
            None => format!("guest-{}", self.id),
        }
    }

    /// Builds a new guest from creation fields.
    ///
    /// Returns `None` if a first or last name is missing.
    pub fn from_fields(id: Uuid, fields: &GuestFields, now: DateTime<Utc>) -> Option<Guest> {
        let first_name = fields.first_name.as_deref()?.trim().to_string();
        let last_name = fields.last_name.as_deref()?.trim().to_string();
        if first_name.is_empty() || last_name.is_empty() {
            return None;
        }

        let mut guest = Guest {
            id,
            family_id: None,
            first_name,
            last_name,
            email: None,
            phone: None,
            rsvp_status: RsvpStatus::Pending,
            accommodation: None,
            room_detail: None,
            booking_method: None,
            meal_choice: None,
            dietary_restrictions: None,
            plus_one: false,
            plus_one_name: None,
            note: None,
            created_at: now,
            updated_at: now,
        };
        guest.apply(fields, now);
        Some(guest)
    }

    /// Applies a partial update in place and stamps `updated_at`.
    pub fn apply(&mut self, fields: &GuestFields, now: DateTime<Utc>) {
        if let Some(first_name) = &fields.first_name {
            self.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = &fields.last_name {
            self.last_name = last_name.trim().to_string();
        }
        if let Some(family_id) = &fields.family_id {
            self.family_id = blank_to_none(family_id.clone());
        }
        if let Some(email) = &fields.email {
            self.email = blank_to_none(email.clone());
        }
        if let Some(phone) = &fields.phone {
            self.phone = blank_to_none(phone.clone());
        }
        if let Some(status) = fields.rsvp_status {
            self.rsvp_status = status;
        }
        if let Some(accommodation) = fields.accommodation {
            self.accommodation = accommodation;
        }
        if let Some(room_detail) = &fields.room_detail {
            self.room_detail = blank_to_none(room_detail.clone());
        }
        if let Some(booking_method) = &fields.booking_method {
            self.booking_method = blank_to_none(booking_method.clone());
        }
        if let Some(meal_choice) = &fields.meal_choice {
            self.meal_choice = blank_to_none(meal_choice.clone());
        }
        if let Some(dietary) = &fields.dietary_restrictions {
            self.dietary_restrictions = blank_to_none(dietary.clone());
        }
        if let Some(plus_one) = fields.plus_one {
            self.plus_one = plus_one;
        }
        if let Some(plus_one_name) = &fields.plus_one_name {
            self.plus_one_name = blank_to_none(plus_one_name.clone());
        }
        if let Some(note) = &fields.note {
            self.note = blank_to_none(note.clone());
        }
        self.updated_at = now;
    }
}

/// Partial guest update.
///
/// The outer `Option` means "leave unchanged" when `None`. For nullable
/// columns the inner `Option` carries the new value, where `None` or a
/// blank string clears the column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GuestFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub family_id: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub email: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub phone: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsvp_status: Option<RsvpStatus>,
    #[serde(
        default,
        deserialize_with = "deserialize_present_accommodation",
        skip_serializing_if = "Option::is_none"
    )]
    pub accommodation: Option<Option<Accommodation>>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub room_detail: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub booking_method: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub meal_choice: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub dietary_restrictions: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plus_one: Option<bool>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub plus_one_name: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub note: Option<Option<String>>,
}

impl GuestFields {
    /// Returns true if no field would change.
    pub fn is_empty(&self) -> bool {
        *self == GuestFields::default()
    }
}

/// Aggregate counts over the guest list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct GuestStats {
    pub total: usize,
    pub attending: usize,
    pub declined: usize,
    pub pending: usize,
    pub andaz: usize,
    pub ac_hotel: usize,
    pub self_booked: usize,
    pub accommodation_unset: usize,
    pub plus_ones: usize,
}

impl GuestStats {
    pub fn from_guests(guests: &[Guest]) -> Self {
        let mut stats = GuestStats {
            total: guests.len(),
            ..Default::default()
        };

        for guest in guests {
            match guest.rsvp_status {
                RsvpStatus::Attending => stats.attending += 1,
                RsvpStatus::Declined => stats.declined += 1,
                RsvpStatus::Pending => stats.pending += 1,
            }
            match guest.accommodation {
                Some(Accommodation::Andaz) => stats.andaz += 1,
                Some(Accommodation::AcHotel) => stats.ac_hotel += 1,
                Some(Accommodation::SelfBooked) => stats.self_booked += 1,
                None => stats.accommodation_unset += 1,
            }
            if guest.plus_one {
                stats.plus_ones += 1;
            }
        }

        stats
    }
}
