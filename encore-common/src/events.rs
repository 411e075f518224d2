//! Row change notifications
//!
//! Every successful datastore write publishes a [`ChangeEvent`] on the
//! [`ChangeBus`]. Consumers call [`ChangeBus::subscribe`] with a table and an
//! event filter and receive matching events on their own channel until the
//! returned [`Subscription`] is canceled or dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Buffered events per subscription channel
const SUBSCRIPTION_BUFFER: usize = 64;

/// Datastore tables that publish changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Posts,
    Playlists,
    PlaylistItems,
    Follows,
    Comments,
    Profiles,
    UserFavorites,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Posts => "posts",
            Table::Playlists => "playlists",
            Table::PlaylistItems => "playlist_items",
            Table::Follows => "follows",
            Table::Comments => "comments",
            Table::Profiles => "profiles",
            Table::UserFavorites => "user_favorites",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "posts" => Ok(Table::Posts),
            "playlists" => Ok(Table::Playlists),
            "playlist_items" => Ok(Table::PlaylistItems),
            "follows" => Ok(Table::Follows),
            "comments" => Ok(Table::Comments),
            "profiles" => Ok(Table::Profiles),
            "user_favorites" => Ok(Table::UserFavorites),
            other => Err(format!("Unknown table: {}", other)),
        }
    }
}

/// Kind of row change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Insert => "INSERT",
            ChangeKind::Update => "UPDATE",
            ChangeKind::Delete => "DELETE",
        }
    }
}

/// Which change kinds a subscriber wants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    All,
    Only(ChangeKind),
}

impl EventFilter {
    pub fn matches(&self, kind: ChangeKind) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Only(wanted) => *wanted == kind,
        }
    }
}

impl FromStr for EventFilter {
    type Err = String;

    /// Accepts `*`, `INSERT`, `UPDATE` or `DELETE` (any case)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "*" => Ok(EventFilter::All),
            "INSERT" => Ok(EventFilter::Only(ChangeKind::Insert)),
            "UPDATE" => Ok(EventFilter::Only(ChangeKind::Update)),
            "DELETE" => Ok(EventFilter::Only(ChangeKind::Delete)),
            other => Err(format!("Unknown event filter: {}", other)),
        }
    }
}

/// One committed row change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    /// Primary key of the changed row
    pub row_id: String,
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(table: Table, kind: ChangeKind, row_id: impl Into<String>) -> Self {
        Self {
            table,
            kind,
            row_id: row_id.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Fan-out of change events to filtered subscriptions
#[derive(Clone)]
pub struct ChangeBus {
    tx: broadcast::Sender<ChangeEvent>,
    capacity: usize,
}

impl ChangeBus {
    /// Create a bus buffering `capacity` events for slow subscribers
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Publish an event; having no subscribers is not an error
    pub fn publish(&self, event: ChangeEvent) {
        debug!(table = %event.table, kind = event.kind.as_str(), row_id = %event.row_id, "Change published");
        let _ = self.tx.send(event);
    }

    /// Subscribe to changes of one table
    ///
    /// Must be called inside a Tokio runtime: a forwarding task moves matching
    /// events onto the subscription's channel until it is canceled.
    pub fn subscribe(&self, table: Table, filter: EventFilter) -> Subscription {
        let mut source = self.tx.subscribe();
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    received = source.recv() => match received {
                        Ok(event) => {
                            if event.table != table || !filter.matches(event.kind) {
                                continue;
                            }
                            if tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(table = %table, skipped, "Change subscription lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            debug!(table = %table, "Change subscription ended");
        });

        Subscription { rx, cancel }
    }

    /// Current number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Cancelable handle delivering one table's matching changes
pub struct Subscription {
    rx: mpsc::Receiver<ChangeEvent>,
    cancel: CancellationToken,
}

impl Subscription {
    /// Next matching event; `None` once canceled or the bus is gone
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }

    /// Stop delivery
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_subscription_receives_matching_table() {
        let bus = ChangeBus::new(16);
        let mut sub = bus.subscribe(Table::Posts, EventFilter::All);

        bus.publish(ChangeEvent::new(Table::Playlists, ChangeKind::Insert, "pl-1"));
        bus.publish(ChangeEvent::new(Table::Posts, ChangeKind::Update, "post-1"));

        let event = timeout(Duration::from_secs(1), sub.recv())
            .await
            .expect("event within timeout")
            .expect("subscription open");
        assert_eq!(event.table, Table::Posts);
        assert_eq!(event.row_id, "post-1");
    }

    #[tokio::test]
    async fn test_event_filter_applies() {
        let bus = ChangeBus::new(16);
        let mut sub = bus.subscribe(Table::Posts, EventFilter::Only(ChangeKind::Insert));

        bus.publish(ChangeEvent::new(Table::Posts, ChangeKind::Update, "skipped"));
        bus.publish(ChangeEvent::new(Table::Posts, ChangeKind::Insert, "kept"));

        let event = timeout(Duration::from_secs(1), sub.recv()).await.unwrap().unwrap();
        assert_eq!(event.row_id, "kept");
        assert_eq!(event.kind, ChangeKind::Insert);
    }

    #[tokio::test]
    async fn test_cancel_ends_delivery() {
        let bus = ChangeBus::new(16);
        let mut sub = bus.subscribe(Table::Follows, EventFilter::All);

        sub.cancel();
        assert!(sub.is_canceled());

        let next = timeout(Duration::from_secs(1), sub.recv()).await.unwrap();
        assert!(next.is_none());
    }

    #[test]
    fn test_filter_and_table_parsing() {
        assert_eq!("*".parse::<EventFilter>().unwrap(), EventFilter::All);
        assert_eq!(
            "insert".parse::<EventFilter>().unwrap(),
            EventFilter::Only(ChangeKind::Insert)
        );
        assert!("UPSERT".parse::<EventFilter>().is_err());

        assert_eq!("playlist_items".parse::<Table>().unwrap(), Table::PlaylistItems);
        assert!("users".parse::<Table>().is_err());
    }

    #[test]
    fn test_event_serialization() {
        let event = ChangeEvent::new(Table::UserFavorites, ChangeKind::Delete, "x");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["table"], "user_favorites");
        assert_eq!(json["kind"], "DELETE");
    }
}
