//! RSVP form payloads and group lodging selection.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::guest::{deserialize_accommodation, Accommodation, Guest, RsvpStatus};
use super::member::MemberId;

/// Delimiter between room sub-choices in `room_detail`.
pub const ROOM_DETAIL_DELIMITER: &str = " | ";

/// Group-level lodging choices shared by every member of a group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LodgingSelection {
    #[serde(default, deserialize_with = "deserialize_accommodation")]
    pub stay_choice: Option<Accommodation>,
    #[serde(default)]
    pub room_view: String,
    #[serde(default)]
    pub bed_preference: String,
    #[serde(default)]
    pub stay_duration: String,
    #[serde(default)]
    pub general_note: String,
}

impl LodgingSelection {
    /// Loads the lodging choices previously saved on a guest.
    ///
    /// `room_detail` is split on `|`; a segment mentioning "View" or
    /// "Standard" is the room view, one mentioning "King" or "Queen" is the bed.
    pub fn from_guest(guest: &Guest) -> Self {
        let mut selection = LodgingSelection {
            stay_choice: guest.accommodation,
            stay_duration: guest.booking_method.clone().unwrap_or_default(),
            ..Default::default()
        };

        if let Some(detail) = &guest.room_detail {
            let parts: Vec<&str> = detail.split('|').map(str::trim).collect();
            if let Some(view) = parts
                .iter()
                .find(|p| p.contains("View") || p.contains("Standard"))
            {
                selection.room_view = view.to_string();
            }
            if let Some(bed) = parts.iter().find(|p| p.contains("King") || p.contains("Queen")) {
                selection.bed_preference = bed.to_string();
            }
        }

        selection
    }

    /// The `room_detail` value written for every member of the group.
    ///
    /// For the on-property option this joins the non-empty view and bed
    /// choices. Any other choice falls back to the raw choice string.
    pub fn room_detail(&self) -> Option<String> {
        let detail = match self.stay_choice {
            Some(choice) if choice.has_room_options() => [&self.room_view, &self.bed_preference]
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(ROOM_DETAIL_DELIMITER),
            Some(choice) => choice.as_str().to_string(),
            None => String::new(),
        };

        if detail.is_empty() {
            None
        } else {
            Some(detail)
        }
    }
}

/// Request payload for looking up an invitation.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct SearchRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Search must be between 1 and 200 characters"
    ))]
    pub query: String,
}

/// One member as shown on the RSVP form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct MemberView {
    pub id: MemberId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub rsvp_status: Option<RsvpStatus>,
    pub meal_choice: String,
    pub dietary: String,
}

/// Response for a successful invitation lookup: the initial form state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SearchResponse {
    pub session_key: String,
    pub members: Vec<MemberView>,
    pub lodging: LodgingSelection,
}

/// A resolved member as submitted from the form.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MemberForm {
    pub id: Uuid,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub meal_choice: Option<String>,
    #[serde(default)]
    pub dietary: Option<String>,
}

/// The plus one as submitted from the form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PlusOneForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub meal_choice: Option<String>,
    #[serde(default)]
    pub dietary: Option<String>,
}

/// Self-registration for a guest who is not on the invitation list.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct RegistrationForm {
    #[validate(custom(function = "shared::validation::validate_name"))]
    pub first_name: String,

    #[validate(custom(function = "shared::validation::validate_name"))]
    pub last_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[serde(default)]
    pub meal_choice: Option<String>,

    #[serde(default)]
    pub dietary: Option<String>,
}

/// Request payload for submitting a group RSVP.
///
/// Either `members` (ids from a previous search) or `registration` is used.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SubmitRsvpRequest {
    #[serde(default)]
    pub members: Vec<MemberForm>,
    #[serde(default)]
    pub registration: Option<RegistrationForm>,
    #[serde(default)]
    pub plus_one: Option<PlusOneForm>,
    #[serde(default)]
    pub lodging: LodgingSelection,
}

/// Request payload for declining an invitation.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct DeclineRequest {
    #[validate(length(min = 1, max = 50, message = "Between 1 and 50 guests may be declined"))]
    pub member_ids: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GuestFields;
    use chrono::Utc;

    fn stored_guest(room_detail: Option<&str>) -> Guest {
        let fields = GuestFields {
            first_name: Some("Tony".into()),
            last_name: Some("Stark".into()),
            accommodation: Some(Some(Accommodation::Andaz)),
            room_detail: Some(room_detail.map(str::to_string)),
            booking_method: Some(Some("5 nights".into())),
            ..Default::default()
        };
        Guest::from_fields(Uuid::new_v4(), &fields, Utc::now()).unwrap()
    }

    #[test]
    fn test_room_detail_andaz_joins_options() {
        let selection = LodgingSelection {
            stay_choice: Some(Accommodation::Andaz),
            room_view: "Ocean View".into(),
            bed_preference: "1 King".into(),
            ..Default::default()
        };
        assert_eq!(selection.room_detail().as_deref(), Some("Ocean View | 1 King"));
    }

    #[test]
    fn test_room_detail_andaz_skips_empty_options() {
        let selection = LodgingSelection {
            stay_choice: Some(Accommodation::Andaz),
            bed_preference: "2 Queens".into(),
            ..Default::default()
        };
        assert_eq!(selection.room_detail().as_deref(), Some("2 Queens"));

        let bare = LodgingSelection {
            stay_choice: Some(Accommodation::Andaz),
            ..Default::default()
        };
        assert_eq!(bare.room_detail(), None);
    }

    #[test]
    fn test_room_detail_falls_back_to_choice() {
        let selection = LodgingSelection {
            stay_choice: Some(Accommodation::AcHotel),
            room_view: "Ocean View".into(),
            ..Default::default()
        };
        assert_eq!(selection.room_detail().as_deref(), Some("ac_hotel"));
    }

    #[test]
    fn test_room_detail_unset() {
        assert_eq!(LodgingSelection::default().room_detail(), None);
    }

    #[test]
    fn test_from_guest_parses_room_detail() {
        let guest = stored_guest(Some("Partial Ocean View | 2 Queens"));
        let selection = LodgingSelection::from_guest(&guest);
        assert_eq!(selection.stay_choice, Some(Accommodation::Andaz));
        assert_eq!(selection.room_view, "Partial Ocean View");
        assert_eq!(selection.bed_preference, "2 Queens");
        assert_eq!(selection.stay_duration, "5 nights");
    }

    #[test]
    fn test_from_guest_ignores_unknown_segments() {
        let guest = stored_guest(Some("ac_hotel"));
        let selection = LodgingSelection::from_guest(&guest);
        assert!(selection.room_view.is_empty());
        assert!(selection.bed_preference.is_empty());
    }

    #[test]
    fn test_lodging_deserialize_blank_choice() {
        let selection: LodgingSelection =
            serde_json::from_str(r#"{"stay_choice": "", "stay_duration": "3 nights"}"#).unwrap();
        assert_eq!(selection.stay_choice, None);
        assert_eq!(selection.stay_duration, "3 nights");
    }

    #[test]
    fn test_search_request_validation() {
        assert!(SearchRequest { query: "Tony".into() }.validate().is_ok());
        assert!(SearchRequest { query: "".into() }.validate().is_err());
        assert!(SearchRequest {
            query: "x".repeat(201)
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_registration_validation() {
        let form = RegistrationForm {
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            email: Some("jane@example.com".into()),
            meal_choice: None,
            dietary: None,
        };
        assert!(form.validate().is_ok());

        let bad_email = RegistrationForm {
            email: Some("not-an-email".into()),
            ..form.clone()
        };
        assert!(bad_email.validate().is_err());

        let blank_name = RegistrationForm {
            last_name: "  ".into(),
            ..form
        };
        assert!(blank_name.validate().is_err());
    }

    #[test]
    fn test_decline_request_validation() {
        assert!(DeclineRequest { member_ids: vec![] }.validate().is_err());
        assert!(DeclineRequest {
            member_ids: vec![Uuid::new_v4()]
        }
        .validate()
        .is_ok());
    }
}
