//! Tests for the protocol module
//!
//! These cover the wire form of bid decisions and the canonical request
//! helpers used by the selector.

use super::*;
use serde_json::json;

fn sample_bid() -> BidResponse {
    BidResponse {
        campaign_id: "camp-1".into(),
        price: 1.25,
        creative: "<a href='x'>ad</a>".into(),
        body: json!({"id": "req-1", "seatbid": [{"bid": [{"price": 1.25}]}]}),
    }
}

#[test]
fn test_no_bid_wire_form() {
    let decision = BidDecision::no_bid("req-9", "server stopped");
    let value: serde_json::Value = serde_json::from_str(&decision.to_json()).unwrap();
    assert_eq!(value, json!({"id": "req-9", "reason": "server stopped"}));
}

#[test]
fn test_bid_body_is_verbatim() {
    let bid = sample_bid();
    let decision = BidDecision::Bid(bid.clone());
    let value: serde_json::Value = serde_json::from_str(&decision.to_json()).unwrap();
    assert_eq!(value, bid.body);
}

#[test]
fn test_status_codes() {
    assert_eq!(BidDecision::Bid(sample_bid()).status_code(), 200);
    assert_eq!(BidDecision::no_bid("", "x").status_code(), 204);
    assert_eq!(BID_CODE, 200);
    assert_eq!(NOBID_CODE, 204);
}

#[test]
fn test_reason_only_on_no_bid() {
    assert_eq!(BidDecision::Bid(sample_bid()).reason(), None);
    assert_eq!(
        BidDecision::no_bid("a", "no matching campaign").reason(),
        Some("no matching campaign")
    );
}

#[test]
fn test_bid_floor_defaults_to_zero() {
    let opp = BidOpportunity::new("r1", "nexage", json!({"id": "r1"}));
    assert_eq!(opp.bid_floor(), 0.0);
    assert_eq!(opp.impression_id(), None);

    let opp = BidOpportunity::new(
        "r2",
        "nexage",
        json!({"id": "r2", "imp": [{"id": "1", "bidfloor": 0.75}]}),
    );
    assert_eq!(opp.bid_floor(), 0.75);
    assert_eq!(opp.impression_id(), Some("1"));
}
