/// Live event feed
///
/// A process-wide `tokio::sync::broadcast` channel carrying small
/// notification events (new guestbook messages, analytics pings) to any
/// number of SSE subscribers. Delivery is best-effort: publishing never
/// blocks, there are no ordering guarantees across publishers, and a
/// subscriber that falls behind the channel capacity skips ahead and keeps
/// going.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Channel capacity; slow subscribers lag past this many buffered events
const CHANNEL_CAPACITY: usize = 256;

/// An event published to live subscribers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveEvent {
    /// A guestbook message was posted and approved
    GuestbookMessage {
        entry_id: Uuid,
        name: String,
        excerpt: String,
        posted_at: DateTime<Utc>,
    },

    /// A visitor activity ping (page views and similar)
    VisitorActivity {
        event_type: String,
        page_path: Option<String>,
        recorded_at: DateTime<Utc>,
    },
}

impl LiveEvent {
    /// SSE event name for this variant
    pub fn event_name(&self) -> &'static str {
        match self {
            LiveEvent::GuestbookMessage { .. } => "guestbook_message",
            LiveEvent::VisitorActivity { .. } => "visitor_activity",
        }
    }
}

/// Handle to the broadcast channel, cloned into application state
#[derive(Debug, Clone)]
pub struct LiveFeed {
    tx: broadcast::Sender<LiveEvent>,
}

impl LiveFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Publishes an event to all current subscribers
    ///
    /// Never fails: with no subscribers the event is simply dropped.
    pub fn publish(&self, event: LiveEvent) {
        let receivers = self.tx.receiver_count();
        if self.tx.send(event).is_ok() {
            tracing::debug!(subscribers = receivers, "Published live event");
        }
    }

    /// Opens a new subscription starting from the next published event
    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.tx.subscribe()
    }

    /// Number of currently connected subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for LiveFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> LiveEvent {
        LiveEvent::GuestbookMessage {
            entry_id: Uuid::new_v4(),
            name: "visitor".to_string(),
            excerpt: "hello".to_string(),
            posted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let feed = LiveFeed::new();
        let mut rx = feed.subscribe();

        feed.publish(sample_event());

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_name(), "guestbook_message");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let feed = LiveFeed::new();
        feed.publish(sample_event());
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_skips_ahead() {
        let feed = LiveFeed::new();
        let mut rx = feed.subscribe();

        for _ in 0..(CHANNEL_CAPACITY + 10) {
            feed.publish(sample_event());
        }

        // First recv reports the lag, the next delivers a live event
        match rx.recv().await {
            Err(broadcast::error::RecvError::Lagged(skipped)) => assert!(skipped >= 10),
            other => panic!("Expected lag, got {:?}", other),
        }
        assert!(rx.recv().await.is_ok());
    }

    #[test]
    fn test_event_serialization_is_tagged() {
        let json = serde_json::to_value(sample_event()).unwrap();
        assert_eq!(json["type"], "guestbook_message");
    }
}
