//! Campaign Selection
//!
//! The dispatcher only needs to know whether any campaigns are loaded and,
//! for an admitted opportunity, which campaign (if any) bids on it. That
//! contract is [`CampaignSelector`]. [`CampaignBook`] is the bundled
//! implementation: a flat list of fixed-price campaigns with JSON-pointer
//! equality constraints, loaded from a JSON file.

use rtbedge_common::{BidOpportunity, BidResponse, Result, RtbError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use tracing::info;

/// Decides what, if anything, to bid on an opportunity.
///
/// Implementations are called synchronously from the dispatch path and must
/// not block on I/O.
pub trait CampaignSelector: Send + Sync {
    /// Number of currently loaded campaigns.
    fn campaign_count(&self) -> usize;

    /// Identifiers of the loaded campaigns, for the status snapshot.
    fn campaign_ids(&self) -> Vec<String>;

    /// Picks a bid for `opportunity`.
    ///
    /// `Ok(None)` means no campaign matched. An error means the opportunity
    /// could not be evaluated at all.
    fn select(&self, opportunity: &BidOpportunity) -> Result<Option<BidResponse>>;
}

/// Equality test against one field of the exchange payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Constraint {
    /// JSON pointer into the payload, e.g. `/device/geo/country`
    pub pointer: String,
    pub equals: Value,
}

impl Constraint {
    pub fn matches(&self, payload: &Value) -> bool {
        payload.pointer(&self.pointer) == Some(&self.equals)
    }
}

/// A fixed-price campaign.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Campaign {
    pub id: String,
    pub price: f64,
    pub creative: String,
    #[serde(default)]
    pub seat: Option<String>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

impl Campaign {
    /// Whether this campaign may bid on `opportunity` at its price.
    pub fn accepts(&self, opportunity: &BidOpportunity) -> bool {
        self.price >= opportunity.bid_floor()
            && self
                .constraints
                .iter()
                .all(|c| c.matches(&opportunity.payload))
    }

    fn respond(&self, opportunity: &BidOpportunity) -> BidResponse {
        let impid = opportunity.impression_id().unwrap_or("1");
        let body = json!({
            "id": opportunity.id,
            "seatbid": [{
                "seat": self.seat.as_deref().unwrap_or(&self.id),
                "bid": [{
                    "id": format!("{}-{}", opportunity.id, self.id),
                    "impid": impid,
                    "price": self.price,
                    "adid": self.id,
                    "crid": self.creative,
                }]
            }],
            "cur": "USD"
        });

        BidResponse {
            campaign_id: self.id.clone(),
            price: self.price,
            creative: self.creative.clone(),
            body,
        }
    }
}

/// In-memory campaign list; the highest-priced accepting campaign wins.
#[derive(Debug, Default)]
pub struct CampaignBook {
    campaigns: Vec<Campaign>,
}

impl CampaignBook {
    pub fn new(campaigns: Vec<Campaign>) -> Self {
        Self { campaigns }
    }

    /// Loads a JSON array of campaigns.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read(path)?;
        let campaigns: Vec<Campaign> = serde_json::from_slice(&raw)?;
        info!("Loaded {} campaigns from {}", campaigns.len(), path.display());
        Ok(Self::new(campaigns))
    }
}

impl CampaignSelector for CampaignBook {
    fn campaign_count(&self) -> usize {
        self.campaigns.len()
    }

    fn campaign_ids(&self) -> Vec<String> {
        self.campaigns.iter().map(|c| c.id.clone()).collect()
    }

    fn select(&self, opportunity: &BidOpportunity) -> Result<Option<BidResponse>> {
        let has_impressions = opportunity
            .payload
            .get("imp")
            .and_then(Value::as_array)
            .is_some_and(|imps| !imps.is_empty());
        if !has_impressions {
            return Err(RtbError::Selection(format!(
                "bid request {} has no impressions",
                opportunity.id
            )));
        }

        let winner = self
            .campaigns
            .iter()
            .filter(|c| c.accepts(opportunity))
            .fold(None::<&Campaign>, |best, c| match best {
                Some(b) if b.price >= c.price => Some(b),
                _ => Some(c),
            });

        Ok(winner.map(|c| c.respond(opportunity)))
    }
}
