//! Live in-memory guest list kept fresh by the directory change feed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::RsvpError;
use crate::models::{Guest, MemberId};
use crate::services::directory::{ChangeFeed, DirectoryClient};
use crate::services::editor::UpdateIntent;

/// What caused a guest list refresh. Used as a metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Startup,
    ChangeFeed,
    Submission,
    Manual,
}

impl RefreshTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshTrigger::Startup => "startup",
            RefreshTrigger::ChangeFeed => "change_feed",
            RefreshTrigger::Submission => "submission",
            RefreshTrigger::Manual => "manual",
        }
    }
}

/// Whether the list follows the change feed or only refreshes on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    Live,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuestListStatus {
    pub mode: RefreshMode,
    pub guest_count: usize,
    pub last_refreshed: Option<DateTime<Utc>>,
}

/// Shared snapshot of the whole guest directory.
///
/// Every refresh replaces the full list; there is no incremental merge.
#[derive(Clone)]
pub struct LiveGuestList {
    inner: Arc<LiveState>,
}

struct LiveState {
    directory: Arc<dyn DirectoryClient>,
    guests: RwLock<Vec<Guest>>,
    last_refreshed: RwLock<Option<DateTime<Utc>>>,
    live: AtomicBool,
}

impl LiveGuestList {
    pub fn new(directory: Arc<dyn DirectoryClient>) -> Self {
        Self {
            inner: Arc::new(LiveState {
                directory,
                guests: RwLock::new(Vec::new()),
                last_refreshed: RwLock::new(None),
                live: AtomicBool::new(false),
            }),
        }
    }

    /// Re-fetches the directory and replaces the snapshot.
    ///
    /// On failure the previous snapshot is kept.
    pub async fn refresh(&self, trigger: RefreshTrigger) -> Result<usize, RsvpError> {
        let guests = self.inner.directory.list_guests().await?;
        let count = guests.len();

        *self.inner.guests.write().await = guests;
        *self.inner.last_refreshed.write().await = Some(Utc::now());

        metrics::counter!(
            "guest_list_refreshes_total",
            "trigger" => trigger.as_str()
        )
        .increment(1);
        debug!(trigger = trigger.as_str(), guests = count, "Guest list refreshed");

        Ok(count)
    }

    pub async fn snapshot(&self) -> Vec<Guest> {
        self.inner.guests.read().await.clone()
    }

    pub async fn get(&self, id: Uuid) -> Option<Guest> {
        self.inner
            .guests
            .read()
            .await
            .iter()
            .find(|g| g.id == id)
            .cloned()
    }

    /// Applies update intents to the local snapshot without the directory.
    ///
    /// Stored ids are updated in place; registered ids are appended as new
    /// guests. Returns the number of intents applied.
    pub async fn merge_optimistic(&self, intents: &[UpdateIntent]) -> usize {
        let now = Utc::now();
        let mut guests = self.inner.guests.write().await;
        let mut applied = 0;

        for intent in intents {
            match intent.id {
                MemberId::PlusOne(_) => continue,
                id => {
                    let uuid = id.uuid();
                    if let Some(guest) = guests.iter_mut().find(|g| g.id == uuid) {
                        guest.apply(&intent.fields, now);
                        applied += 1;
                    } else if let MemberId::Registered(_) = id {
                        if let Some(guest) = Guest::from_fields(uuid, &intent.fields, now) {
                            guests.push(guest);
                            applied += 1;
                        }
                    }
                }
            }
        }

        applied
    }

    pub fn is_live(&self) -> bool {
        self.inner.live.load(Ordering::SeqCst)
    }

    pub fn set_live(&self, live: bool) {
        self.inner.live.store(live, Ordering::SeqCst);
    }

    pub async fn status(&self) -> GuestListStatus {
        GuestListStatus {
            mode: if self.is_live() {
                RefreshMode::Live
            } else {
                RefreshMode::Manual
            },
            guest_count: self.inner.guests.read().await.len(),
            last_refreshed: *self.inner.last_refreshed.read().await,
        }
    }
}

/// Background task refreshing a [`LiveGuestList`] on every change event.
pub struct GuestListSubscription {
    list: LiveGuestList,
    feed: Arc<dyn ChangeFeed>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    handle: Option<JoinHandle<()>>,
}

impl GuestListSubscription {
    pub fn new(list: LiveGuestList, feed: Arc<dyn ChangeFeed>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            list,
            feed,
            shutdown_tx,
            shutdown_rx,
            handle: None,
        }
    }

    /// Starts listening. Calling `start` on a running subscription is a no-op.
    pub fn start(&mut self) {
        if self.handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let list = self.list.clone();
        let feed = Arc::clone(&self.feed);
        let mut shutdown_rx = self.shutdown_rx.clone();
        let (tx, mut rx) = mpsc::channel(32);

        list.set_live(true);
        info!("Guest change subscription started");

        let handle = tokio::spawn(async move {
            let forward = feed.forward_changes(tx);
            tokio::pin!(forward);

            loop {
                tokio::select! {
                    result = &mut forward => {
                        if let Err(e) = result {
                            let err = RsvpError::SubscriptionLost(e.to_string());
                            warn!(error = %err, "Falling back to manual guest list refresh");
                        }
                        break;
                    }
                    Some(event) = rx.recv() => {
                        // Collapse a burst of events into one refresh
                        let mut coalesced = 0usize;
                        while rx.try_recv().is_ok() {
                            coalesced += 1;
                        }
                        debug!(
                            kind = %event.kind,
                            guest_id = ?event.guest_id,
                            coalesced = coalesced,
                            "Guest change received"
                        );
                        if let Err(e) = list.refresh(RefreshTrigger::ChangeFeed).await {
                            warn!(error = %e, "Guest list refresh after change failed");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            info!("Guest change subscription stopping");
                            break;
                        }
                    }
                }
            }

            list.set_live(false);
        });

        self.handle = Some(handle);
    }

    /// Signals the task to stop and waits for it to exit.
    pub async fn stop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Guest change subscription task panicked: {}", e);
            }
        }
        self.list.set_live(false);
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GuestFields, RsvpStatus};
    use crate::services::directory::InMemoryDirectory;
    use std::time::Duration;

    fn named(first: &str, last: &str) -> GuestFields {
        GuestFields {
            first_name: Some(first.to_string()),
            last_name: Some(last.to_string()),
            ..Default::default()
        }
    }

    async fn wait_for<F: Fn() -> bool>(check: F) {
        for _ in 0..100 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_refresh_replaces_snapshot() {
        let dir = Arc::new(InMemoryDirectory::new());
        let list = LiveGuestList::new(dir.clone());
        dir.create_guest(named("Tony", "Stark")).await.unwrap();

        assert_eq!(list.refresh(RefreshTrigger::Manual).await.unwrap(), 1);
        assert_eq!(list.snapshot().await.len(), 1);
        assert!(list.status().await.last_refreshed.is_some());
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_snapshot() {
        let dir = Arc::new(InMemoryDirectory::new());
        let list = LiveGuestList::new(dir.clone());
        dir.create_guest(named("Tony", "Stark")).await.unwrap();
        list.refresh(RefreshTrigger::Startup).await.unwrap();

        dir.set_unavailable(true);
        let err = list.refresh(RefreshTrigger::Manual).await.unwrap_err();
        assert!(matches!(err, RsvpError::DirectoryUnavailable(_)));
        assert_eq!(list.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_merge_optimistic() {
        let dir = Arc::new(InMemoryDirectory::new());
        let tony = dir.create_guest(named("Tony", "Stark")).await.unwrap();
        let list = LiveGuestList::new(dir.clone());
        list.refresh(RefreshTrigger::Startup).await.unwrap();

        let registered = Uuid::new_v4();
        let intents = vec![
            UpdateIntent {
                id: MemberId::Stored(tony.id),
                fields: GuestFields {
                    rsvp_status: Some(RsvpStatus::Attending),
                    ..Default::default()
                },
            },
            UpdateIntent {
                id: MemberId::Registered(registered),
                fields: named("Peter", "Parker"),
            },
            UpdateIntent {
                id: MemberId::PlusOne(Uuid::new_v4()),
                fields: named("Jane", "Doe"),
            },
        ];

        assert_eq!(list.merge_optimistic(&intents).await, 2);
        assert_eq!(
            list.get(tony.id).await.unwrap().rsvp_status,
            RsvpStatus::Attending
        );
        assert!(list.get(registered).await.is_some());
        assert_eq!(list.snapshot().await.len(), 2);
    }

    #[tokio::test]
    async fn test_subscription_refreshes_on_change() {
        let dir = InMemoryDirectory::new();
        let list = LiveGuestList::new(Arc::new(dir.clone()));
        let mut subscription = GuestListSubscription::new(list.clone(), Arc::new(dir.clone()));
        subscription.start();
        assert!(list.is_live());

        tokio::time::sleep(Duration::from_millis(20)).await;
        dir.create_guest(named("Tony", "Stark")).await.unwrap();

        for _ in 0..100 {
            if list.snapshot().await.len() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(list.snapshot().await.len(), 1);

        subscription.stop().await;
        assert!(!list.is_live());
        assert!(!subscription.is_running());
    }

    #[tokio::test]
    async fn test_lost_feed_degrades_to_manual() {
        let dir = InMemoryDirectory::new();
        let list = LiveGuestList::new(Arc::new(dir.clone()));
        let mut subscription = GuestListSubscription::new(list.clone(), Arc::new(dir.clone()));
        subscription.start();

        tokio::time::sleep(Duration::from_millis(20)).await;
        dir.close_feed();

        let watched = list.clone();
        wait_for(|| !watched.is_live()).await;
        assert!(!list.is_live());
        assert_eq!(list.status().await.mode, RefreshMode::Manual);

        // Manual refresh still works
        dir.create_guest(named("Tony", "Stark")).await.unwrap();
        assert_eq!(list.refresh(RefreshTrigger::Manual).await.unwrap(), 1);
    }
}
