//! # Dispute Sessions
//!
//! Realtime fan-out of bid events to the participants of a dispute. Every
//! dispute has its own session channel, named `dispute-<id>`, backed by a
//! `tokio::sync::broadcast` channel created on first subscription.
//!
//! Delivery is best effort. A participant that is not connected when an
//! event is published never sees it, and a participant that falls more than
//! the channel capacity behind skips the missed events. In both cases the
//! client is expected to re-fetch the dispute, which is authoritative.
//!
//! The [`SessionHub`] is an ordinary value constructed at startup and
//! carried in application state. The gateway only sees it through the
//! [`Notifier`] trait so tests can substitute a recording fake.

use std::sync::Arc;

use dashmap::DashMap;
use parley_core::{BidId, DisputeId};
use parley_state::Bid;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use utoipa::ToSchema;

/// Kind of committed mutation a [`BidEvent`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BidEventType {
    /// A new bid was placed (possibly voiding the previous one).
    BidPlaced,
    /// A pending bid was accepted and the dispute settled.
    BidAccepted,
    /// A pending bid was rejected.
    BidRejected,
}

impl BidEventType {
    /// Wire name of the event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BidPlaced => "BID_PLACED",
            Self::BidAccepted => "BID_ACCEPTED",
            Self::BidRejected => "BID_REJECTED",
        }
    }
}

impl std::fmt::Display for BidEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event broadcast on a dispute's session channel after a commit.
///
/// Serialized as `{"type":"BID_PLACED","dispute_id":1,"bid_id":2}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BidEvent {
    /// What happened.
    #[serde(rename = "type")]
    pub kind: BidEventType,
    /// Dispute whose session receives the event.
    #[schema(value_type = i64)]
    pub dispute_id: DisputeId,
    /// Bid the mutation touched.
    #[schema(value_type = i64)]
    pub bid_id: BidId,
}

impl BidEvent {
    fn for_bid(kind: BidEventType, bid: &Bid) -> Self {
        Self {
            kind,
            dispute_id: bid.dispute_id,
            bid_id: bid.id,
        }
    }

    /// `BID_PLACED` for a freshly inserted bid.
    pub fn placed(bid: &Bid) -> Self {
        Self::for_bid(BidEventType::BidPlaced, bid)
    }

    /// `BID_ACCEPTED` for a settled bid.
    pub fn accepted(bid: &Bid) -> Self {
        Self::for_bid(BidEventType::BidAccepted, bid)
    }

    /// `BID_REJECTED` for a rejected bid.
    pub fn rejected(bid: &Bid) -> Self {
        Self::for_bid(BidEventType::BidRejected, bid)
    }
}

/// Outbound side of the realtime collaborator.
///
/// Called only after a mutation has committed. Implementations must not
/// block and must not fail the caller: a dropped notification is recovered
/// by the client re-fetching state.
pub trait Notifier: Send + Sync + std::fmt::Debug {
    /// Publish `event` on the session channel of `event.dispute_id`.
    fn notify(&self, event: BidEvent);
}

type ChannelTable = Arc<DashMap<DisputeId, broadcast::Sender<BidEvent>>>;

/// Registry of per-dispute broadcast channels.
///
/// A channel lives while at least one participant is subscribed; the last
/// [`SessionStream`] to drop removes it.
#[derive(Debug, Clone)]
pub struct SessionHub {
    channels: ChannelTable,
    capacity: usize,
}

impl SessionHub {
    /// Default number of events buffered per dispute for slow subscribers.
    pub const DEFAULT_CAPACITY: usize = 64;

    /// Create a hub whose channels buffer `capacity` events each.
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Join the session of `dispute_id`. Events published from now on are
    /// delivered to the returned stream.
    pub fn subscribe(&self, dispute_id: DisputeId) -> SessionStream {
        let rx = self
            .channels
            .entry(dispute_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        tracing::debug!(channel = %dispute_id.session_channel(), "session subscriber joined");
        SessionStream {
            channel: dispute_id.session_channel(),
            rx,
            _membership: Membership {
                channels: Arc::clone(&self.channels),
                dispute_id,
            },
        }
    }

    /// Publish an event, returning how many subscribers it reached.
    ///
    /// A session nobody listens to is dropped from the registry.
    pub fn publish(&self, event: BidEvent) -> usize {
        let sent = self
            .channels
            .get(&event.dispute_id)
            .map(|tx| tx.send(event).unwrap_or(0))
            .unwrap_or(0);

        if sent == 0 {
            self.channels
                .remove_if(&event.dispute_id, |_, tx| tx.receiver_count() == 0);
        }

        tracing::debug!(
            channel = %event.dispute_id.session_channel(),
            event = %event.kind,
            bid_id = event.bid_id.get(),
            receivers = sent,
            "session event published"
        );
        sent
    }

    /// Number of participants currently connected to a dispute's session.
    pub fn subscriber_count(&self, dispute_id: DisputeId) -> usize {
        self.channels
            .get(&dispute_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Number of sessions with a live channel.
    pub fn session_count(&self) -> usize {
        self.channels.len()
    }
}

impl Default for SessionHub {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl Notifier for SessionHub {
    fn notify(&self, event: BidEvent) {
        self.publish(event);
    }
}

/// A participant's view of one dispute session.
#[derive(Debug)]
pub struct SessionStream {
    channel: String,
    // Declared before the membership so the receiver is gone when the
    // membership counts the remaining ones.
    rx: broadcast::Receiver<BidEvent>,
    _membership: Membership,
}

#[derive(Debug)]
struct Membership {
    channels: ChannelTable,
    dispute_id: DisputeId,
}

impl Drop for Membership {
    fn drop(&mut self) {
        let removed = self
            .channels
            .remove_if(&self.dispute_id, |_, tx| tx.receiver_count() == 0)
            .is_some();
        if removed {
            tracing::debug!(
                channel = %self.dispute_id.session_channel(),
                "session closed after last subscriber left"
            );
        }
    }
}

impl SessionStream {
    /// Session channel name (`dispute-<id>`).
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Wait for the next event. Returns `None` once the session is closed.
    ///
    /// If the subscriber fell behind, the skipped events are logged and the
    /// stream resumes with the oldest event still buffered.
    pub async fn next(&mut self) -> Option<BidEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        channel = %self.channel,
                        skipped,
                        "session subscriber lagged; client must re-fetch"
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
