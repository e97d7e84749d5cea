//! # API Route Modules
//!
//! - `disputes`: CreateDispute, GetDispute, the current negotiation head,
//!   and PlaceBid.
//! - `bids`: AcceptBid and RejectBid, addressed by bid identifier.
//! - `session`: WebSocket upgrade streaming a dispute's bid events.

pub mod bids;
pub mod disputes;
pub mod session;
