//! Win notifications
//!
//! Exchanges call `/rtb/win/<exchange>/<bid id>/<price>/...` when one of our
//! bids wins. The bidder only acknowledges the notice; billing is handled
//! downstream from the logs.

use serde::Serialize;

pub const WIN_PREFIX: &str = "/rtb/win/";

/// A parsed win notification.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WinNotice {
    pub exchange: String,
    pub bid_id: Option<String>,
    pub price: Option<f64>,
    /// Any further path segments, passed through unparsed
    pub extra: Vec<String>,
}

impl WinNotice {
    /// Parses a win target. Returns `None` if `target` is not a win path.
    pub fn from_target(target: &str) -> Option<Self> {
        let path = target.split('?').next().unwrap_or(target);
        let rest = path.strip_prefix(WIN_PREFIX)?;
        let mut segments = rest.split('/').filter(|s| !s.is_empty());

        let exchange = segments.next()?.to_string();
        let bid_id = segments.next().map(str::to_string);
        let price = segments.next().and_then(|p| p.parse::<f64>().ok());
        let extra = segments.map(str::to_string).collect();

        Some(Self {
            exchange,
            bid_id,
            price,
            extra,
        })
    }

    /// Acknowledgement body returned to the exchange.
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "status": "ack",
            "exchange": self.exchange,
            "bid_id": self.bid_id,
            "price": self.price,
        })
        .to_string()
    }
}
