//! PostgreSQL guest directory.
//!
//! Writes go through [`GuestRepository`]. Change notifications come from the
//! `guests_notify_change` trigger over `LISTEN guest_changes`.

use chrono::Utc;
use serde::Deserialize;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use domain::models::{Guest, GuestFields};
use domain::services::{ChangeEvent, ChangeFeed, ChangeKind, DirectoryClient};
use domain::DirectoryError;

use crate::entities::{EntityConversionError, GuestEntity};
use crate::repositories::GuestRepository;

/// Notification channel the guests trigger publishes on.
pub const GUEST_CHANGES_CHANNEL: &str = "guest_changes";

#[derive(Debug, Deserialize)]
struct ChangePayload {
    op: String,
    id: Option<Uuid>,
}

fn parse_payload(payload: &str) -> ChangeEvent {
    match serde_json::from_str::<ChangePayload>(payload) {
        Ok(change) => ChangeEvent {
            kind: change.op.parse().unwrap_or(ChangeKind::Update),
            guest_id: change.id,
        },
        Err(e) => {
            debug!(error = %e, "Unparseable guest change payload, treating as update");
            ChangeEvent {
                kind: ChangeKind::Update,
                guest_id: None,
            }
        }
    }
}

/// Maps driver errors onto the directory error taxonomy.
fn directory_error(err: sqlx::Error) -> DirectoryError {
    match err {
        sqlx::Error::Database(db) => DirectoryError::Rejected(db.message().to_string()),
        sqlx::Error::Decode(e) => DirectoryError::Rejected(e.to_string()),
        sqlx::Error::RowNotFound => DirectoryError::Rejected("row not found".to_string()),
        other => DirectoryError::Unavailable(other.to_string()),
    }
}

fn conversion_error(err: EntityConversionError) -> DirectoryError {
    DirectoryError::Rejected(err.to_string())
}

/// Guest directory backed by the `guests` table.
#[derive(Clone)]
pub struct PgDirectory {
    repo: GuestRepository,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repo: GuestRepository::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        self.repo.pool()
    }
}

#[async_trait::async_trait]
impl DirectoryClient for PgDirectory {
    async fn list_guests(&self) -> Result<Vec<Guest>, DirectoryError> {
        self.repo
            .list_all()
            .await
            .map_err(directory_error)?
            .into_iter()
            .map(Guest::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(conversion_error)
    }

    async fn create_guest(&self, fields: GuestFields) -> Result<Guest, DirectoryError> {
        let draft = Guest::from_fields(Uuid::nil(), &fields, Utc::now()).ok_or_else(|| {
            DirectoryError::Rejected("first_name and last_name are required".to_string())
        })?;

        let row = self
            .repo
            .insert(&GuestEntity::from(&draft))
            .await
            .map_err(directory_error)?;
        info!(guest_id = %row.id, family_id = ?row.family_id, "Guest created");
        Guest::try_from(row).map_err(conversion_error)
    }

    async fn update_guest(&self, id: Uuid, fields: GuestFields) -> Result<Guest, DirectoryError> {
        let row = self
            .repo
            .update_fields(id, &fields)
            .await
            .map_err(directory_error)?
            .ok_or(DirectoryError::NotFound(id))?;
        debug!(guest_id = %id, "Guest updated");
        Guest::try_from(row).map_err(conversion_error)
    }

    async fn delete_guest(&self, id: Uuid) -> Result<(), DirectoryError> {
        let affected = self.repo.delete(id).await.map_err(directory_error)?;
        if affected == 0 {
            return Err(DirectoryError::NotFound(id));
        }
        info!(guest_id = %id, "Guest deleted");
        Ok(())
    }

    async fn ping(&self) -> Result<(), DirectoryError> {
        self.repo.ping().await.map_err(directory_error)
    }
}

#[async_trait::async_trait]
impl ChangeFeed for PgDirectory {
    async fn forward_changes(&self, sink: mpsc::Sender<ChangeEvent>) -> Result<(), DirectoryError> {
        let mut listener = PgListener::connect_with(self.repo.pool())
            .await
            .map_err(directory_error)?;
        listener
            .listen(GUEST_CHANGES_CHANNEL)
            .await
            .map_err(directory_error)?;
        info!(channel = GUEST_CHANGES_CHANNEL, "Listening for guest changes");

        loop {
            tokio::select! {
                _ = sink.closed() => return Ok(()),
                notification = listener.recv() => {
                    let notification = notification.map_err(|e| {
                        warn!(error = %e, "Guest change listener failed");
                        directory_error(e)
                    })?;
                    let event = parse_payload(notification.payload());
                    if sink.send(event).await.is_err() {
                        return Ok(());
                    }
                }
            }
        }
    }
}
