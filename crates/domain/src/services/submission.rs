//! Applies RSVP update intents to the directory and reconciles the live list.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::{DirectoryError, RsvpError};
use crate::models::{Guest, GuestFields, MemberId, RsvpStatus};
use crate::services::directory::DirectoryClient;
use crate::services::editor::UpdateIntent;
use crate::services::guest_list::{LiveGuestList, RefreshTrigger};

/// Whether the writes reached the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// The directory acknowledged the writes.
    Confirmed,
    /// The directory was unreachable; only the local list was changed.
    Optimistic,
}

impl WriteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteMode::Confirmed => "confirmed",
            WriteMode::Optimistic => "optimistic",
        }
    }
}

/// Result of writing one member.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberOutcome {
    pub id: MemberId,
    /// Directory id of the saved row. Differs from `id` for created guests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guest_id: Option<Uuid>,
    pub saved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionReport {
    pub mode: WriteMode,
    pub saved: usize,
    pub total: usize,
    pub message: String,
    pub outcomes: Vec<MemberOutcome>,
}

impl SubmissionReport {
    /// True when nothing was saved against a reachable directory.
    pub fn all_failed(&self) -> bool {
        self.mode == WriteMode::Confirmed && self.total > 0 && self.saved == 0
    }
}

/// Releases the session key when dropped.
struct InFlightGuard {
    key: String,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut keys) = self.in_flight.lock() {
            keys.remove(&self.key);
        }
    }
}

/// Writes RSVP submissions one member at a time.
///
/// A failed member never aborts the rest of the batch. When the directory
/// is unreachable for every member the intents are merged into the live
/// list instead and the report is marked optimistic.
#[derive(Clone)]
pub struct SubmissionService {
    directory: Arc<dyn DirectoryClient>,
    live: LiveGuestList,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl SubmissionService {
    pub fn new(directory: Arc<dyn DirectoryClient>, live: LiveGuestList) -> Self {
        Self {
            directory,
            live,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    fn acquire(&self, session_key: &str) -> Result<InFlightGuard, RsvpError> {
        self.acquire_all(&[session_key.to_string()])?
            .pop()
            .ok_or(RsvpError::SubmissionInProgress)
    }

    /// Takes every session key or none of them.
    fn acquire_all(&self, session_keys: &[String]) -> Result<Vec<InFlightGuard>, RsvpError> {
        let mut keys = self
            .in_flight
            .lock()
            .map_err(|_| RsvpError::SubmissionInProgress)?;
        if session_keys.iter().any(|key| keys.contains(key)) {
            return Err(RsvpError::SubmissionInProgress);
        }
        keys.extend(session_keys.iter().cloned());

        Ok(session_keys
            .iter()
            .map(|key| InFlightGuard {
                key: key.clone(),
                in_flight: Arc::clone(&self.in_flight),
            })
            .collect())
    }

    /// Submits an editor's update intents.
    pub async fn submit(
        &self,
        session_key: &str,
        intents: Vec<UpdateIntent>,
    ) -> Result<SubmissionReport, RsvpError> {
        let _guard = self.acquire(session_key)?;
        Ok(self.apply(session_key, &intents).await)
    }

    /// Marks the given stored guests declined.
    ///
    /// Holds the session key of every group the ids belong to.
    pub async fn decline(&self, ids: &[Uuid]) -> Result<SubmissionReport, RsvpError> {
        if ids.is_empty() {
            return Err(RsvpError::MinimumGuestsViolation);
        }

        let mut seen = HashSet::new();
        let ids: Vec<Uuid> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let mut session_keys: Vec<String> = Vec::new();
        for id in &ids {
            let key = match self.live.get(*id).await {
                Some(guest) => guest.group_key(),
                None => format!("guest-{}", id),
            };
            if !session_keys.contains(&key) {
                session_keys.push(key);
            }
        }
        let _guards = self.acquire_all(&session_keys)?;
        let session_key = session_keys.join(",");

        let intents: Vec<UpdateIntent> = ids
            .iter()
            .map(|id| UpdateIntent {
                id: MemberId::Stored(*id),
                fields: GuestFields {
                    rsvp_status: Some(RsvpStatus::Declined),
                    ..Default::default()
                },
            })
            .collect();

        Ok(self.apply(&session_key, &intents).await)
    }

    async fn write(&self, intent: &UpdateIntent) -> Result<Guest, DirectoryError> {
        match intent.id {
            MemberId::Stored(id) => {
                if let (Some(next), Some(current)) =
                    (intent.fields.rsvp_status, self.live.get(id).await)
                {
                    if !current.rsvp_status.can_transition_to(next) {
                        return Err(DirectoryError::Rejected(format!(
                            "cannot move RSVP from {} to {}",
                            current.rsvp_status, next
                        )));
                    }
                }
                self.directory.update_guest(id, intent.fields.clone()).await
            }
            MemberId::Registered(_) => self.directory.create_guest(intent.fields.clone()).await,
            MemberId::PlusOne(_) => Err(DirectoryError::Rejected(
                "plus ones are not stored as guests".to_string(),
            )),
        }
    }

    async fn apply(&self, session_key: &str, intents: &[UpdateIntent]) -> SubmissionReport {
        let mut outcomes = Vec::with_capacity(intents.len());
        let mut unreachable = 0usize;

        for intent in intents {
            match self.write(intent).await {
                Ok(guest) => {
                    metrics::counter!("rsvp_guest_writes_total", "outcome" => "saved").increment(1);
                    debug!(member = %intent.id, guest_id = %guest.id, "Guest saved");
                    outcomes.push(MemberOutcome {
                        id: intent.id,
                        guest_id: Some(guest.id),
                        saved: true,
                        error: None,
                    });
                }
                Err(e) => {
                    if e.is_unavailable() {
                        unreachable += 1;
                    }
                    let err = RsvpError::PersistenceFailure {
                        id: intent.id,
                        reason: e.to_string(),
                    };
                    metrics::counter!("rsvp_guest_writes_total", "outcome" => "failed").increment(1);
                    warn!(session_key = session_key, error = %err, "Guest write failed");
                    outcomes.push(MemberOutcome {
                        id: intent.id,
                        guest_id: None,
                        saved: false,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        let total = outcomes.len();
        let saved = outcomes.iter().filter(|o| o.saved).count();

        if total > 0 && unreachable == total {
            let merged = self.live.merge_optimistic(intents).await;
            metrics::counter!("rsvp_submissions_total", "mode" => WriteMode::Optimistic.as_str())
                .increment(1);
            warn!(
                session_key = session_key,
                mode = WriteMode::Optimistic.as_str(),
                saved = merged,
                total = total,
                "Guest directory unreachable, RSVP kept in local guest list only"
            );
            return SubmissionReport {
                mode: WriteMode::Optimistic,
                saved: merged,
                total,
                message: format!("Saved {} of {} guests locally", merged, total),
                outcomes,
            };
        }

        if saved > 0 {
            if let Err(e) = self.live.refresh(RefreshTrigger::Submission).await {
                warn!(error = %e, "Guest list refresh after submission failed");
            }
        }

        metrics::counter!("rsvp_submissions_total", "mode" => WriteMode::Confirmed.as_str())
            .increment(1);
        info!(
            session_key = session_key,
            mode = WriteMode::Confirmed.as_str(),
            saved = saved,
            total = total,
            "RSVP submission processed"
        );

        SubmissionReport {
            mode: WriteMode::Confirmed,
            saved,
            total,
            message: format!("Saved {} of {} guests", saved, total),
            outcomes,
        }
    }
}
