//! Guest-facing RSVP endpoints: invitation lookup, submit and decline.

use axum::{extract::State, http::StatusCode, Json};
use std::collections::HashSet;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use domain::models::rsvp::{
    DeclineRequest, MemberForm, PlusOneForm, RegistrationForm, SearchRequest, SearchResponse,
    SubmitRsvpRequest,
};
use domain::models::{Guest, MemberId};
use domain::services::{ResolvedGroup, RsvpEditor, SubmissionReport};
use domain::RsvpError;
use shared::validation::is_blank;

use crate::app::AppState;
use crate::error::ApiError;

/// POST /api/v1/rsvp/search
///
/// Resolves a name or email to the invited group and returns the initial
/// form state for it.
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
    request.validate()?;

    let group = state.resolver.resolve(&request.query).await?;
    let editor = RsvpEditor::from_group(&group, &state.config.rsvp.default_meal);

    Ok(Json(SearchResponse {
        session_key: editor.session_key().to_string(),
        members: editor.snapshot(),
        lodging: editor.lodging().clone(),
    }))
}

/// POST /api/v1/rsvp/submit
///
/// Replays the submitted form through an editor, validates it and writes
/// one update per guest.
pub async fn submit(
    State(state): State<AppState>,
    Json(request): Json<SubmitRsvpRequest>,
) -> Result<(StatusCode, Json<SubmissionReport>), ApiError> {
    let default_meal = state.config.rsvp.default_meal.as_str();

    let mut editor = match (&request.registration, request.members.first()) {
        (Some(_), Some(_)) => {
            return Err(ApiError::Validation(
                "Submit either members or a registration, not both".to_string(),
            ))
        }
        (Some(registration), None) => {
            registration.validate()?;
            registration_editor(registration, default_meal)?
        }
        (None, Some(first)) => {
            let guests = current_guests(&state).await?;
            let group = group_of(&guests, first.id)?;
            group_editor(&group, &request.members, default_meal)?
        }
        (None, None) => return Err(RsvpError::MinimumGuestsViolation.into()),
    };

    apply_plus_one(&mut editor, request.plus_one.as_ref())?;
    editor.set_lodging(request.lodging.clone());
    editor.validate_for_submit(state.config.rsvp.require_lodging)?;

    let intents = editor.build_submission();
    let report = state
        .submissions
        .submit(editor.session_key(), intents)
        .await?;

    info!(
        family_id = %editor.session_key(),
        saved = report.saved,
        total = report.total,
        mode = report.mode.as_str(),
        "RSVP submitted"
    );

    Ok(report_response(report))
}

/// POST /api/v1/rsvp/decline
pub async fn decline(
    State(state): State<AppState>,
    Json(request): Json<DeclineRequest>,
) -> Result<(StatusCode, Json<SubmissionReport>), ApiError> {
    request.validate()?;

    let report = state.submissions.decline(&request.member_ids).await?;

    info!(
        saved = report.saved,
        total = report.total,
        mode = report.mode.as_str(),
        "RSVP declined"
    );

    Ok(report_response(report))
}

/// Fresh directory rows, or the live list while the directory is unreachable.
async fn current_guests(state: &AppState) -> Result<Vec<Guest>, ApiError> {
    match state.directory.list_guests().await {
        Ok(guests) => Ok(guests),
        Err(e) if e.is_unavailable() => {
            warn!(error = %e, "Guest directory unreachable, replaying form against live list");
            Ok(state.guest_list.snapshot().await)
        }
        Err(e) => Err(e.into()),
    }
}

fn report_response(report: SubmissionReport) -> (StatusCode, Json<SubmissionReport>) {
    let status = if report.all_failed() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::OK
    };
    (status, Json(report))
}

/// The stored group containing `guest_id`, anchored on that guest.
fn group_of(guests: &[Guest], guest_id: Uuid) -> Result<ResolvedGroup, RsvpError> {
    let anchor = guests
        .iter()
        .find(|g| g.id == guest_id)
        .ok_or(RsvpError::NotFound)?;
    let key = anchor.group_key();

    Ok(ResolvedGroup {
        anchor_id: anchor.id,
        members: guests
            .iter()
            .filter(|g| g.group_key() == key)
            .cloned()
            .collect(),
    })
}

/// Opens an editor on `group` and applies the submitted members to it.
///
/// Group members missing from the form are removed. A submitted id outside
/// the group is an unknown member. A restored plus one is left for
/// [`apply_plus_one`].
fn group_editor(
    group: &ResolvedGroup,
    members: &[MemberForm],
    default_meal: &str,
) -> Result<RsvpEditor, RsvpError> {
    let mut editor = RsvpEditor::from_group(group, default_meal);

    let submitted: HashSet<Uuid> = members.iter().map(|m| m.id).collect();
    let omitted: Vec<MemberId> = editor
        .members()
        .iter()
        .map(|m| m.id)
        .filter(|id| id.is_real() && !submitted.contains(&id.uuid()))
        .collect();
    for id in omitted {
        editor.remove_member(id)?;
    }

    for form in members {
        let id = MemberId::Stored(form.id);
        editor.update_member_name(id, &form.first_name, &form.last_name)?;
        apply_choices(&mut editor, id, form.meal_choice.as_deref(), form.dietary.as_deref())?;
    }

    Ok(editor)
}

fn registration_editor(
    registration: &RegistrationForm,
    default_meal: &str,
) -> Result<RsvpEditor, RsvpError> {
    let mut editor = RsvpEditor::register(
        &registration.first_name,
        &registration.last_name,
        registration.email.as_deref(),
        default_meal,
    );
    if let Some(id) = editor.members().first().map(|m| m.id) {
        apply_choices(
            &mut editor,
            id,
            registration.meal_choice.as_deref(),
            registration.dietary.as_deref(),
        )?;
    }
    Ok(editor)
}

/// Makes the editor's plus one match the form.
///
/// A submitted plus one fills the stored slot or takes a new one; leaving it
/// out removes a plus one saved earlier.
fn apply_plus_one(editor: &mut RsvpEditor, form: Option<&PlusOneForm>) -> Result<(), RsvpError> {
    let existing = editor.plus_one_id();
    let Some(form) = form else {
        return match existing {
            Some(id) => editor.remove_member(id),
            None => Ok(()),
        };
    };

    let id = match existing {
        Some(id) => id,
        None => editor.add_member()?,
    };
    editor.update_member_name(id, &form.first_name, &form.last_name)?;
    apply_choices(editor, id, form.meal_choice.as_deref(), form.dietary.as_deref())
}

/// Blank meal choices keep the preselected meal.
fn apply_choices(
    editor: &mut RsvpEditor,
    id: MemberId,
    meal: Option<&str>,
    dietary: Option<&str>,
) -> Result<(), RsvpError> {
    if let Some(meal) = meal.filter(|m| !is_blank(m)) {
        editor.set_meal(id, meal)?;
    }
    if let Some(dietary) = dietary {
        editor.set_dietary(id, dietary)?;
    }
    Ok(())
}
