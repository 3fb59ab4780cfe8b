//! rtbedge Bid Types
//!
//! This module defines the canonical bid request handed to the campaign
//! selector and the decision produced for it.

use serde::{Deserialize, Serialize};

/// A single inbound opportunity to bid, in canonical form.
///
/// Exchange adapters turn the raw exchange payload into this shape. The
/// `payload` is kept as JSON so the selector can inspect exchange fields
/// without this crate knowing their schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BidOpportunity {
    /// Exchange-assigned identifier, unique per opportunity
    pub id: String,
    /// Name of the exchange adapter that parsed the payload
    pub exchange: String,
    /// Opaque exchange payload
    pub payload: serde_json::Value,
}

impl BidOpportunity {
    pub fn new(
        id: impl Into<String>,
        exchange: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            exchange: exchange.into(),
            payload,
        }
    }

    /// Floor price of the first impression, `0.0` when the exchange sent none.
    pub fn bid_floor(&self) -> f64 {
        self.payload
            .pointer("/imp/0/bidfloor")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0)
    }

    /// Identifier of the first impression, if any.
    pub fn impression_id(&self) -> Option<&str> {
        self.payload.pointer("/imp/0/id").and_then(|v| v.as_str())
    }
}

/// A committed bid produced by the campaign selector.
///
/// `body` is the exchange-facing bid response and is written to the wire
/// verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BidResponse {
    pub campaign_id: String,
    pub price: f64,
    pub creative: String,
    pub body: serde_json::Value,
}

/// The body returned when the bidder declines an opportunity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NoBid {
    pub id: String,
    pub reason: String,
}

impl NoBid {
    pub fn new(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// Outcome of dispatching one opportunity. Exactly one is produced per
/// opportunity.
#[derive(Debug, Clone, PartialEq)]
pub enum BidDecision {
    Bid(BidResponse),
    NoBid(NoBid),
}

impl BidDecision {
    pub fn no_bid(id: impl Into<String>, reason: impl Into<String>) -> Self {
        BidDecision::NoBid(NoBid::new(id, reason))
    }

    pub fn is_bid(&self) -> bool {
        matches!(self, BidDecision::Bid(_))
    }

    /// The no-bid reason, if this is a no-bid.
    pub fn reason(&self) -> Option<&str> {
        match self {
            BidDecision::Bid(_) => None,
            BidDecision::NoBid(nb) => Some(&nb.reason),
        }
    }

    /// HTTP status code for this decision.
    pub fn status_code(&self) -> u16 {
        match self {
            BidDecision::Bid(_) => super::BID_CODE,
            BidDecision::NoBid(_) => super::NOBID_CODE,
        }
    }

    /// Serializes the decision to its wire form.
    ///
    /// A bid is its selector-provided body; a no-bid is `{"id", "reason"}`.
    pub fn to_json(&self) -> String {
        match self {
            BidDecision::Bid(resp) => resp.body.to_string(),
            BidDecision::NoBid(nb) => {
                serde_json::json!({ "id": nb.id, "reason": nb.reason }).to_string()
            }
        }
    }
}
