//! Batch RSVP editor.
//!
//! Holds an editable copy of one resolved group, validates it, and turns it
//! into one update intent per real guest. Nothing is persisted until the
//! intents are handed to [`SubmissionService`](super::SubmissionService).

use std::collections::HashMap;
use uuid::Uuid;

use shared::validation::is_blank;

use crate::errors::RsvpError;
use crate::models::rsvp::{LodgingSelection, MemberView};
use crate::models::{Accommodation, Guest, GuestFields, MemberId, RsvpStatus};
use crate::services::resolver::ResolvedGroup;

/// Meal preselected for members without a stored choice.
pub const DEFAULT_MEAL: &str = "Wagyu & Lobster";

const PLUS_ONE_MEAL_TAG: &str = "[+1 Meal: ";
const PLUS_ONE_DIET_TAG: &str = "[+1 Diet: ";
const GENERAL_PREFIX: &str = "General: ";
const GENERAL_SEPARATOR: &str = " | General: ";

/// Plus-one and general-note parts recovered from a composed `note`.
#[derive(Debug, Default, PartialEq)]
struct ComposedNote {
    plus_one_meal: Option<String>,
    plus_one_diet: Option<String>,
    general: Option<String>,
}

impl ComposedNote {
    fn parse(note: &str) -> Self {
        let note = note.trim();
        let (body, general) = match note.strip_prefix(GENERAL_PREFIX) {
            Some(general) => ("", Some(general)),
            None => match note.split_once(GENERAL_SEPARATOR) {
                Some((body, general)) => (body, Some(general)),
                None => (note, None),
            },
        };

        Self {
            plus_one_meal: tag_value(body, PLUS_ONE_MEAL_TAG),
            plus_one_diet: tag_value(body, PLUS_ONE_DIET_TAG),
            general: general
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(str::to_string),
        }
    }
}

fn tag_value(note: &str, tag: &str) -> Option<String> {
    let start = note.find(tag)? + tag.len();
    let end = start + note[start..].find(']')?;
    let value = note[start..end].trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Splits a stored "first last" name at the first space.
fn split_name(name: &str) -> (String, String) {
    match name.trim().split_once(char::is_whitespace) {
        Some((first, last)) => (first.to_string(), last.trim().to_string()),
        None => (name.trim().to_string(), String::new()),
    }
}

/// One member of the group being edited.
#[derive(Debug, Clone, PartialEq)]
pub struct EditableMember {
    pub id: MemberId,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub family_id: Option<String>,
    /// Stored status, `None` for members the directory has not seen.
    pub rsvp_status: Option<RsvpStatus>,
}

impl EditableMember {
    fn from_guest(guest: &Guest) -> Self {
        Self {
            id: MemberId::Stored(guest.id),
            first_name: guest.first_name.clone(),
            last_name: guest.last_name.clone(),
            email: guest.email.clone(),
            family_id: guest.family_id.clone(),
            rsvp_status: Some(guest.rsvp_status),
        }
    }

    fn has_complete_name(&self) -> bool {
        !is_blank(&self.first_name) && !is_blank(&self.last_name)
    }

    fn display_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }
}

/// A pending write for one guest.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateIntent {
    pub id: MemberId,
    pub fields: GuestFields,
}

/// Editable state of one RSVP session.
#[derive(Debug, Clone)]
pub struct RsvpEditor {
    members: Vec<EditableMember>,
    meal_by_member: HashMap<MemberId, String>,
    dietary_by_member: HashMap<MemberId, String>,
    lodging: LodgingSelection,
    session_key: String,
    default_meal: String,
}

impl RsvpEditor {
    /// Opens a session on a resolved group.
    ///
    /// Meals default to the stored choice or `default_meal`. Lodging is
    /// loaded from the first member that already picked a stay. A plus one
    /// saved on a member is rebuilt from its name and the tags in its note.
    pub fn from_group(group: &ResolvedGroup, default_meal: &str) -> Self {
        let mut editor = Self::empty(group.session_key(), default_meal);

        for guest in &group.members {
            let member = EditableMember::from_guest(guest);
            let meal = guest
                .meal_choice
                .clone()
                .unwrap_or_else(|| default_meal.to_string());
            editor.meal_by_member.insert(member.id, meal);
            editor.dietary_by_member.insert(
                member.id,
                guest.dietary_restrictions.clone().unwrap_or_default(),
            );
            editor.members.push(member);
        }

        if let Some(guest) = group.members.iter().find(|g| g.accommodation.is_some()) {
            editor.lodging = LodgingSelection::from_guest(guest);
        }
        if let Some(general) = group
            .members
            .first()
            .and_then(|g| g.note.as_deref())
            .and_then(|note| ComposedNote::parse(note).general)
        {
            editor.lodging.general_note = general;
        }

        if let Some(holder) = group.members.iter().find(|g| g.plus_one) {
            editor.restore_plus_one(holder);
        }

        editor
    }

    fn restore_plus_one(&mut self, holder: &Guest) {
        let (first_name, last_name) = split_name(holder.plus_one_name.as_deref().unwrap_or_default());
        let stored = ComposedNote::parse(holder.note.as_deref().unwrap_or_default());

        let id = MemberId::PlusOne(Uuid::new_v4());
        self.members.push(EditableMember {
            id,
            first_name,
            last_name,
            email: None,
            family_id: holder.family_id.clone(),
            rsvp_status: None,
        });
        self.meal_by_member.insert(
            id,
            stored
                .plus_one_meal
                .unwrap_or_else(|| self.default_meal.clone()),
        );
        self.dietary_by_member
            .insert(id, stored.plus_one_diet.unwrap_or_default());
    }

    /// Opens a session for a guest registering themselves.
    ///
    /// The single member gets a local id and a fresh family id; it is
    /// created in the directory on submit.
    pub fn register(first_name: &str, last_name: &str, email: Option<&str>, default_meal: &str) -> Self {
        let family_id = format!("fam-{}", Uuid::new_v4().simple());
        let member = EditableMember {
            id: MemberId::Registered(Uuid::new_v4()),
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            email: email
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string),
            family_id: Some(family_id.clone()),
            rsvp_status: None,
        };

        let mut editor = Self::empty(family_id, default_meal);
        editor.meal_by_member.insert(member.id, default_meal.to_string());
        editor.dietary_by_member.insert(member.id, String::new());
        editor.members.push(member);
        editor
    }

    fn empty(session_key: String, default_meal: &str) -> Self {
        Self {
            members: Vec::new(),
            meal_by_member: HashMap::new(),
            dietary_by_member: HashMap::new(),
            lodging: LodgingSelection::default(),
            session_key,
            default_meal: default_meal.to_string(),
        }
    }

    pub fn session_key(&self) -> &str {
        &self.session_key
    }

    pub fn members(&self) -> &[EditableMember] {
        &self.members
    }

    pub fn lodging(&self) -> &LodgingSelection {
        &self.lodging
    }

    pub fn meal(&self, id: MemberId) -> Option<&str> {
        self.meal_by_member.get(&id).map(String::as_str)
    }

    pub fn dietary(&self, id: MemberId) -> Option<&str> {
        self.dietary_by_member.get(&id).map(String::as_str)
    }

    fn plus_one(&self) -> Option<&EditableMember> {
        self.members.iter().find(|m| m.id.is_plus_one())
    }

    pub fn plus_one_id(&self) -> Option<MemberId> {
        self.plus_one().map(|m| m.id)
    }

    fn member_mut(&mut self, id: MemberId) -> Result<&mut EditableMember, RsvpError> {
        self.members
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(RsvpError::UnknownMember(id))
    }

    /// Appends a blank plus one. A group has exactly one plus-one slot.
    pub fn add_member(&mut self) -> Result<MemberId, RsvpError> {
        if self.plus_one().is_some() {
            return Err(RsvpError::CapacityExceeded);
        }

        let family_id = self.members.first().and_then(|m| m.family_id.clone());
        let id = MemberId::PlusOne(Uuid::new_v4());
        self.members.push(EditableMember {
            id,
            first_name: String::new(),
            last_name: String::new(),
            email: None,
            family_id,
            rsvp_status: None,
        });
        self.meal_by_member.insert(id, self.default_meal.clone());
        self.dietary_by_member.insert(id, String::new());
        Ok(id)
    }

    /// Removes a member. The group must keep at least one real guest.
    pub fn remove_member(&mut self, id: MemberId) -> Result<(), RsvpError> {
        let index = self
            .members
            .iter()
            .position(|m| m.id == id)
            .ok_or(RsvpError::UnknownMember(id))?;

        let remaining_real = self
            .members
            .iter()
            .filter(|m| m.id.is_real() && m.id != id)
            .count();
        if remaining_real == 0 {
            return Err(RsvpError::MinimumGuestsViolation);
        }

        self.members.remove(index);
        self.meal_by_member.remove(&id);
        self.dietary_by_member.remove(&id);
        Ok(())
    }

    pub fn update_member_name(
        &mut self,
        id: MemberId,
        first_name: &str,
        last_name: &str,
    ) -> Result<(), RsvpError> {
        let member = self.member_mut(id)?;
        member.first_name = first_name.to_string();
        member.last_name = last_name.to_string();
        Ok(())
    }

    pub fn set_meal(&mut self, id: MemberId, meal: &str) -> Result<(), RsvpError> {
        self.member_mut(id)?;
        self.meal_by_member.insert(id, meal.to_string());
        Ok(())
    }

    pub fn set_dietary(&mut self, id: MemberId, dietary: &str) -> Result<(), RsvpError> {
        self.member_mut(id)?;
        self.dietary_by_member.insert(id, dietary.to_string());
        Ok(())
    }

    pub fn set_stay_choice(&mut self, choice: Option<Accommodation>) {
        self.lodging.stay_choice = choice;
    }

    pub fn set_room_view(&mut self, view: &str) {
        self.lodging.room_view = view.to_string();
    }

    pub fn set_bed_preference(&mut self, bed: &str) {
        self.lodging.bed_preference = bed.to_string();
    }

    pub fn set_stay_duration(&mut self, duration: &str) {
        self.lodging.stay_duration = duration.to_string();
    }

    pub fn set_general_note(&mut self, note: &str) {
        self.lodging.general_note = note.to_string();
    }

    /// Replaces the whole lodging selection.
    pub fn set_lodging(&mut self, lodging: LodgingSelection) {
        self.lodging = lodging;
    }

    /// Checks the form before anything is sent to the directory.
    pub fn validate_for_submit(&self, require_lodging: bool) -> Result<(), RsvpError> {
        if let Some(member) = self.members.iter().find(|m| !m.has_complete_name()) {
            return Err(RsvpError::IncompleteGuestData { member: member.id });
        }
        if require_lodging && self.lodging.stay_choice.is_none() {
            return Err(RsvpError::MissingLodgingSelection);
        }
        Ok(())
    }

    fn compose_note(&self, dietary: &str) -> String {
        let mut parts: Vec<String> = Vec::new();
        if !is_blank(dietary) {
            parts.push(dietary.trim().to_string());
        }

        if let Some(plus_one) = self.plus_one() {
            let meal = self.meal(plus_one.id).unwrap_or(self.default_meal.as_str());
            parts.push(format!("{}{}]", PLUS_ONE_MEAL_TAG, meal.trim()));
            let diet = self.dietary(plus_one.id).unwrap_or_default();
            if !is_blank(diet) {
                parts.push(format!("{}{}]", PLUS_ONE_DIET_TAG, diet.trim()));
            }
        }

        let note = parts.join(" ");
        let general = self.lodging.general_note.trim();
        match (note.is_empty(), general.is_empty()) {
            (_, true) => note,
            (true, false) => format!("{}{}", GENERAL_PREFIX, general),
            (false, false) => format!("{}{}{}", note, GENERAL_SEPARATOR, general),
        }
    }

    /// Produces one update intent per real member, in member order.
    ///
    /// Every intent marks the guest attending and carries the group
    /// lodging. The plus one is folded into the first real member's
    /// `note`, `plus_one` and `plus_one_name`; every other real member has
    /// its plus-one fields cleared.
    pub fn build_submission(&self) -> Vec<UpdateIntent> {
        let plus_one_name = self
            .plus_one()
            .map(EditableMember::display_name)
            .filter(|name| !name.is_empty());
        let room_detail = self.lodging.room_detail();
        let stay_duration = self.lodging.stay_duration.trim().to_string();

        self.members
            .iter()
            .filter(|m| m.id.is_real())
            .enumerate()
            .map(|(index, member)| {
                let dietary = self.dietary(member.id).unwrap_or_default().trim().to_string();
                let meal = self
                    .meal(member.id)
                    .unwrap_or(self.default_meal.as_str())
                    .trim()
                    .to_string();

                let mut fields = GuestFields {
                    first_name: Some(member.first_name.trim().to_string()),
                    last_name: Some(member.last_name.trim().to_string()),
                    rsvp_status: Some(RsvpStatus::Attending),
                    meal_choice: Some(Some(meal)),
                    dietary_restrictions: Some(Some(dietary.clone())),
                    accommodation: Some(self.lodging.stay_choice),
                    room_detail: Some(room_detail.clone()),
                    booking_method: Some(Some(stay_duration.clone())),
                    note: Some(Some(dietary.clone())),
                    ..Default::default()
                };

                if index == 0 {
                    fields.note = Some(Some(self.compose_note(&dietary)));
                    fields.plus_one = Some(plus_one_name.is_some());
                    fields.plus_one_name = Some(plus_one_name.clone());
                } else {
                    fields.plus_one = Some(false);
                    fields.plus_one_name = Some(None);
                }

                if let MemberId::Registered(_) = member.id {
                    fields.email = Some(member.email.clone());
                    fields.family_id = Some(member.family_id.clone());
                }

                UpdateIntent {
                    id: member.id,
                    fields,
                }
            })
            .collect()
    }

    /// Form state as returned to the client.
    pub fn snapshot(&self) -> Vec<MemberView> {
        self.members
            .iter()
            .map(|m| MemberView {
                id: m.id,
                first_name: m.first_name.clone(),
                last_name: m.last_name.clone(),
                email: m.email.clone(),
                rsvp_status: m.rsvp_status,
                meal_choice: self.meal(m.id).unwrap_or(self.default_meal.as_str()).to_string(),
                dietary: self.dietary(m.id).unwrap_or_default().to_string(),
            })
            .collect()
    }
}
