//! Guest directory abstraction.
//!
//! The directory is the external store of guest records. The RSVP services
//! receive it as an injected trait object so tests and the offline backend
//! can substitute [`InMemoryDirectory`].

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc, RwLock};
use uuid::Uuid;

use crate::errors::DirectoryError;
use crate::models::{Guest, GuestFields};

/// CRUD access to guest records.
#[async_trait::async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Lists every guest, oldest first.
    async fn list_guests(&self) -> Result<Vec<Guest>, DirectoryError>;

    /// Creates a guest. The directory assigns the id and defaults the status to Pending.
    async fn create_guest(&self, fields: GuestFields) -> Result<Guest, DirectoryError>;

    /// Applies a partial update. The directory stamps `updated_at`.
    async fn update_guest(&self, id: Uuid, fields: GuestFields) -> Result<Guest, DirectoryError>;

    /// Permanently removes a guest. Only used by admin tooling.
    async fn delete_guest(&self, id: Uuid) -> Result<(), DirectoryError>;

    /// Checks that the directory is reachable.
    async fn ping(&self) -> Result<(), DirectoryError> {
        self.list_guests().await.map(|_| ())
    }
}

/// Kind of row change reported by the change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "insert",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        }
    }
}

impl FromStr for ChangeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "insert" => Ok(ChangeKind::Insert),
            "update" => Ok(ChangeKind::Update),
            "delete" => Ok(ChangeKind::Delete),
            _ => Err(format!("Invalid change kind: {}", s)),
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// "Something changed, re-fetch." The guest id is informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub guest_id: Option<Uuid>,
}

/// Subscription to guest table changes.
#[async_trait::async_trait]
pub trait ChangeFeed: Send + Sync {
    /// Forwards change events into `sink` until the sink is closed or the
    /// underlying stream is lost.
    ///
    /// Returns `Ok(())` when the receiver went away and an error when the
    /// stream itself dropped.
    async fn forward_changes(&self, sink: mpsc::Sender<ChangeEvent>) -> Result<(), DirectoryError>;
}

/// In-memory guest directory.
///
/// Used as the offline backend and as the fake directory in tests. Failure
/// injection helpers simulate an unreachable store, rejected rows, and a
/// dropped change stream.
#[derive(Clone)]
pub struct InMemoryDirectory {
    inner: Arc<InMemoryState>,
}

struct InMemoryState {
    guests: RwLock<Vec<Guest>>,
    feed: Mutex<Option<broadcast::Sender<ChangeEvent>>>,
    unavailable: AtomicBool,
    rejected_ids: Mutex<HashSet<Uuid>>,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::with_guests(Vec::new())
    }

    /// Create a directory seeded with existing guests.
    pub fn with_guests(guests: Vec<Guest>) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(InMemoryState {
                guests: RwLock::new(guests),
                feed: Mutex::new(Some(tx)),
                unavailable: AtomicBool::new(false),
                rejected_ids: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Simulate the store being unreachable (or reachable again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make every write to the given guest fail.
    pub fn reject_writes_for(&self, id: Uuid) {
        if let Ok(mut ids) = self.inner.rejected_ids.lock() {
            ids.insert(id);
        }
    }

    /// Close the change stream, as if the connection carrying it dropped.
    pub fn close_feed(&self) {
        if let Ok(mut feed) = self.inner.feed.lock() {
            feed.take();
        }
    }

    /// Current rows, bypassing availability checks.
    pub async fn snapshot(&self) -> Vec<Guest> {
        self.inner.guests.read().await.clone()
    }

    fn check_available(&self) -> Result<(), DirectoryError> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            Err(DirectoryError::Unavailable(
                "in-memory directory is offline".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    fn check_writable(&self, id: Uuid) -> Result<(), DirectoryError> {
        let rejected = self
            .inner
            .rejected_ids
            .lock()
            .map(|ids| ids.contains(&id))
            .unwrap_or(false);
        if rejected {
            Err(DirectoryError::Rejected(format!("write to guest {} rejected", id)))
        } else {
            Ok(())
        }
    }

    fn publish(&self, kind: ChangeKind, guest_id: Uuid) {
        if let Ok(feed) = self.inner.feed.lock() {
            if let Some(tx) = feed.as_ref() {
                // No receivers is fine
                let _ = tx.send(ChangeEvent {
                    kind,
                    guest_id: Some(guest_id),
                });
            }
        }
    }
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DirectoryClient for InMemoryDirectory {
    async fn list_guests(&self) -> Result<Vec<Guest>, DirectoryError> {
        self.check_available()?;
        Ok(self.inner.guests.read().await.clone())
    }

    async fn create_guest(&self, fields: GuestFields) -> Result<Guest, DirectoryError> {
        self.check_available()?;
        let id = Uuid::new_v4();
        let guest = Guest::from_fields(id, &fields, Utc::now()).ok_or_else(|| {
            DirectoryError::Rejected("first_name and last_name are required".to_string())
        })?;

        self.inner.guests.write().await.push(guest.clone());
        self.publish(ChangeKind::Insert, id);
        Ok(guest)
    }

    async fn update_guest(&self, id: Uuid, fields: GuestFields) -> Result<Guest, DirectoryError> {
        self.check_available()?;
        self.check_writable(id)?;

        let updated = {
            let mut guests = self.inner.guests.write().await;
            let guest = guests
                .iter_mut()
                .find(|g| g.id == id)
                .ok_or(DirectoryError::NotFound(id))?;
            guest.apply(&fields, Utc::now());
            guest.clone()
        };

        self.publish(ChangeKind::Update, id);
        Ok(updated)
    }

    async fn delete_guest(&self, id: Uuid) -> Result<(), DirectoryError> {
        self.check_available()?;
        {
            let mut guests = self.inner.guests.write().await;
            let before = guests.len();
            guests.retain(|g| g.id != id);
            if guests.len() == before {
                return Err(DirectoryError::NotFound(id));
            }
        }
        self.publish(ChangeKind::Delete, id);
        Ok(())
    }
}

#[async_trait::async_trait]
impl ChangeFeed for InMemoryDirectory {
    async fn forward_changes(&self, sink: mpsc::Sender<ChangeEvent>) -> Result<(), DirectoryError> {
        let mut rx = match self.inner.feed.lock() {
            Ok(feed) => match feed.as_ref() {
                Some(tx) => tx.subscribe(),
                None => {
                    return Err(DirectoryError::Unavailable(
                        "change feed closed".to_string(),
                    ))
                }
            },
            Err(_) => {
                return Err(DirectoryError::Unavailable(
                    "change feed poisoned".to_string(),
                ))
            }
        };

        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped = skipped, "Change feed lagged, forcing refresh");
                    ChangeEvent {
                        kind: ChangeKind::Update,
                        guest_id: None,
                    }
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(DirectoryError::Unavailable(
                        "change feed closed".to_string(),
                    ));
                }
            };

            if sink.send(event).await.is_err() {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RsvpStatus;

    fn named(first: &str, last: &str) -> GuestFields {
        GuestFields {
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_assigns_id_and_pending() {
        let dir = InMemoryDirectory::new();
        let guest = dir.create_guest(named("Tony", "Stark")).await.unwrap();
        assert_eq!(guest.rsvp_status, RsvpStatus::Pending);
        assert_eq!(dir.list_guests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_requires_names() {
        let dir = InMemoryDirectory::new();
        let result = dir.create_guest(GuestFields::default()).await;
        assert!(matches!(result, Err(DirectoryError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_update_unknown_guest() {
        let dir = InMemoryDirectory::new();
        let id = Uuid::new_v4();
        let result = dir.update_guest(id, GuestFields::default()).await;
        assert_eq!(result, Err(DirectoryError::NotFound(id)));
    }

    #[tokio::test]
    async fn test_update_applies_fields() {
        let dir = InMemoryDirectory::new();
        let guest = dir.create_guest(named("Tony", "Stark")).await.unwrap();
        let updated = dir
            .update_guest(
                guest.id,
                GuestFields {
                    rsvp_status: Some(RsvpStatus::Attending),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.rsvp_status, RsvpStatus::Attending);
        assert!(updated.updated_at >= guest.updated_at);
    }

    #[tokio::test]
    async fn test_unavailable_fails_everything() {
        let dir = InMemoryDirectory::new();
        dir.set_unavailable(true);
        assert!(dir.list_guests().await.unwrap_err().is_unavailable());
        assert!(dir.ping().await.is_err());
        dir.set_unavailable(false);
        assert!(dir.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_rejected_writes() {
        let dir = InMemoryDirectory::new();
        let guest = dir.create_guest(named("Tony", "Stark")).await.unwrap();
        dir.reject_writes_for(guest.id);
        let result = dir.update_guest(guest.id, GuestFields::default()).await;
        assert!(matches!(result, Err(DirectoryError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = InMemoryDirectory::new();
        let guest = dir.create_guest(named("Tony", "Stark")).await.unwrap();
        dir.delete_guest(guest.id).await.unwrap();
        assert!(dir.snapshot().await.is_empty());
        assert_eq!(
            dir.delete_guest(guest.id).await,
            Err(DirectoryError::NotFound(guest.id))
        );
    }

    #[tokio::test]
    async fn test_change_feed_forwards_events() {
        let dir = InMemoryDirectory::new();
        let (tx, mut rx) = mpsc::channel(8);
        let feed = dir.clone();
        let handle = tokio::spawn(async move { feed.forward_changes(tx).await });

        // Give the forwarder a moment to subscribe
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let guest = dir.create_guest(named("Tony", "Stark")).await.unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, ChangeKind::Insert);
        assert_eq!(event.guest_id, Some(guest.id));

        drop(rx);
        dir.create_guest(named("Pepper", "Potts")).await.unwrap();
        assert_eq!(handle.await.unwrap(), Ok(()));
    }

    #[tokio::test]
    async fn test_closed_feed_reports_loss() {
        let dir = InMemoryDirectory::new();
        dir.close_feed();
        let (tx, _rx) = mpsc::channel(8);
        let result = dir.forward_changes(tx).await;
        assert!(matches!(result, Err(DirectoryError::Unavailable(_))));
    }

    #[test]
    fn test_change_kind_parse() {
        assert_eq!("INSERT".parse::<ChangeKind>(), Ok(ChangeKind::Insert));
        assert_eq!("delete".parse::<ChangeKind>(), Ok(ChangeKind::Delete));
        assert!("truncate".parse::<ChangeKind>().is_err());
        assert_eq!(ChangeKind::Update.to_string(), "update");
    }
}
