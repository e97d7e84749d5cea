//! # Dispute Session Gateway
//!
//! Translates raw requests into [`BidEngine`] calls. Identifiers and amounts
//! arrive unvalidated and are checked here, so malformed input never
//! reaches the engine.
//!
//! After a mutation commits, the gateway publishes exactly one [`BidEvent`]
//! on the dispute's session channel. Failed operations publish nothing.

use std::sync::Arc;

use parley_core::{Amount, BidId, DisputeId};
use parley_state::{Bid, BidEngine, BidError, Dispute, DisputeLedger, Resolution};

use crate::session::{BidEvent, Notifier};

/// Request/response facade over the bid engine and the session notifier.
#[derive(Debug, Clone)]
pub struct DisputeGateway {
    engine: BidEngine,
    notifier: Arc<dyn Notifier>,
}

impl DisputeGateway {
    /// Wire a gateway to an engine and the notifier it reports commits to.
    pub fn new(engine: BidEngine, notifier: Arc<dyn Notifier>) -> Self {
        Self { engine, notifier }
    }

    /// The underlying engine.
    pub fn engine(&self) -> &BidEngine {
        &self.engine
    }

    /// CreateDispute: open a new dispute with a server-assigned identifier.
    pub async fn create_dispute(&self) -> Result<Dispute, BidError> {
        self.engine.create_dispute().await
    }

    /// GetDispute: the dispute with its bids, most recent first.
    ///
    /// A missing dispute is reported as [`BidError::DisputeNotFound`].
    pub async fn get_dispute(&self, dispute_id: i64) -> Result<DisputeLedger, BidError> {
        self.engine.dispute(DisputeId::new(dispute_id)?).await
    }

    /// The dispute's negotiation head, if any bid was placed.
    pub async fn current_bid(&self, dispute_id: i64) -> Result<Option<Bid>, BidError> {
        self.engine
            .negotiation_head(DisputeId::new(dispute_id)?)
            .await
    }

    /// PlaceBid: supersede the open bid (if any) and record a new one.
    pub async fn place_bid(&self, dispute_id: i64, amount: i64) -> Result<Bid, BidError> {
        let dispute_id = DisputeId::new(dispute_id)?;
        let amount = Amount::new(amount)?;
        let bid = self.engine.place_bid(dispute_id, amount).await?;

        metrics::counter!("parley_bids_total", "transition" => "placed").increment(1);
        self.notifier.notify(BidEvent::placed(&bid));
        Ok(bid)
    }

    /// AcceptBid: settle a pending bid and close its dispute.
    pub async fn accept_bid(&self, bid_id: i64) -> Result<Bid, BidError> {
        self.resolve(bid_id, Resolution::Accept).await
    }

    /// RejectBid: decline a pending bid.
    pub async fn reject_bid(&self, bid_id: i64) -> Result<Bid, BidError> {
        self.resolve(bid_id, Resolution::Reject).await
    }

    async fn resolve(&self, bid_id: i64, resolution: Resolution) -> Result<Bid, BidError> {
        let bid_id = BidId::new(bid_id)?;
        let (bid, event) = match resolution {
            Resolution::Accept => {
                let bid = self.engine.accept_bid(bid_id).await?;
                (bid, BidEvent::accepted(&bid))
            }
            Resolution::Reject => {
                let bid = self.engine.reject_bid(bid_id).await?;
                (bid, BidEvent::rejected(&bid))
            }
        };

        metrics::counter!("parley_bids_total", "transition" => resolution.past_tense())
            .increment(1);
        self.notifier.notify(event);
        Ok(bid)
    }
}
