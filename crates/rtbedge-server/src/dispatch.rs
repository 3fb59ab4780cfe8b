//! Dispatch Pipeline
//!
//! Turns one inbound request into a response. Bid submissions go through
//! admission control, which is applied strictly in this order:
//!
//! 1. no campaigns loaded
//! 2. server stopped
//! 3. throttle gate
//! 4. campaign selection (no match, or a bid)
//!
//! Only step 4 touches the bid/no-bid counters. Parse and selection errors
//! become no-bids carrying the error text, and a panicking selector becomes
//! an uncounted no-bid; nothing on the bid path ever surfaces as a transport
//! error.

use hyper::Method;
use rtbedge_common::{BidDecision, BidOpportunity, Result, RtbError};
use rtbedge_pool::{list_members, MembershipStore, PoolConfig};
use serde::Serialize;
use serde_json::json;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::assets::AssetServer;
use crate::exchange::ExchangeRegistry;
use crate::route::Route;
use crate::selector::CampaignSelector;
use crate::state::ServingState;
use crate::win::WinNotice;

pub const NO_CAMPAIGNS: &str = "no campaigns loaded";
pub const SERVER_STOPPED: &str = "server stopped";
pub const SERVER_THROTTLED: &str = "server throttled";
pub const NO_MATCH: &str = "no matching campaign";
pub const SELECTION_PANICKED: &str = "campaign selection panicked";

const JSON: &str = "application/json;charset=utf-8";
const HTML: &str = "text/html";
const JAVASCRIPT: &str = "text/javascript;charset=utf-8";
const TEXT: &str = "text/plain";

/// Reason given for any path the bidder does not serve.
pub fn wrong_target(target: &str) -> String {
    format!("wrong target: {}", target)
}

/// What the listener writes back for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResult {
    pub status: u16,
    pub body: Vec<u8>,
    pub content_type: &'static str,
    /// Set on bid-path responses
    pub elapsed_ms: Option<u64>,
    /// Set on no-bids
    pub reason: Option<String>,
}

impl DispatchResult {
    fn new(status: u16, content_type: &'static str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
            content_type,
            elapsed_ms: None,
            reason: None,
        }
    }

    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::new(status, JSON, body),
            Err(e) => Self::error(500, &e.to_string()),
        }
    }

    fn error(status: u16, message: &str) -> Self {
        Self::new(status, JSON, json!({ "error": message }).to_string())
    }

    fn decision(decision: &BidDecision, elapsed_ms: u64) -> Self {
        let mut result = Self::new(decision.status_code(), JSON, decision.to_json());
        result.elapsed_ms = Some(elapsed_ms);
        result.reason = decision.reason().map(str::to_string);
        result
    }

    /// Body parsed as JSON, for callers that inspect results.
    pub fn json_body(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Read access to the shared bidder pool for the ops surface.
#[derive(Clone)]
struct PoolView {
    store: Arc<dyn MembershipStore>,
    config: PoolConfig,
}

/// The per-request pipeline.
///
/// Cheap to share: hold it in an `Arc` and call [`Dispatcher::dispatch`] from
/// as many connection tasks as needed.
pub struct Dispatcher {
    state: Arc<ServingState>,
    selector: Arc<dyn CampaignSelector>,
    exchanges: ExchangeRegistry,
    assets: AssetServer,
    pool: Option<PoolView>,
}

impl Dispatcher {
    /// Dispatcher with the default exchange registry and asset root.
    pub fn new(state: Arc<ServingState>, selector: Arc<dyn CampaignSelector>) -> Self {
        Self {
            state,
            selector,
            exchanges: ExchangeRegistry::default(),
            assets: AssetServer::default(),
            pool: None,
        }
    }

    pub fn with_exchanges(mut self, exchanges: ExchangeRegistry) -> Self {
        self.exchanges = exchanges;
        self
    }

    pub fn with_assets(mut self, assets: AssetServer) -> Self {
        self.assets = assets;
        self
    }

    /// Enables `GET /rtb/pool` against the given membership store.
    pub fn with_pool(mut self, store: Arc<dyn MembershipStore>, config: PoolConfig) -> Self {
        self.pool = Some(PoolView { store, config });
        self
    }

    pub fn state(&self) -> &Arc<ServingState> {
        &self.state
    }

    /// Handles one request end to end.
    pub async fn dispatch(&self, method: &Method, target: &str, body: &[u8]) -> DispatchResult {
        match Route::classify(method, target) {
            Route::Favicon => DispatchResult::new(200, TEXT, Vec::new()),
            Route::Simulator => match self.assets.simulator_page().await {
                Ok(page) => DispatchResult::new(200, HTML, page),
                Err(e) => self.asset_error(target, e),
            },
            Route::WebAsset(rel) => match self.assets.web_file(rel).await {
                Ok(file) => DispatchResult::new(200, JAVASCRIPT, file),
                Err(e) => self.asset_error(target, e),
            },
            Route::Win(notice) => self.win(notice),
            Route::Status => DispatchResult::json(200, &self.status()),
            Route::Pool => self.pool_members().await,
            Route::Throttle(raw) => self.throttle(raw),
            Route::Stop => self.set_stopped(true),
            Route::Start => self.set_stopped(false),
            Route::Bid(exchange) => self.timed(|| self.bid(exchange, target, body)),
            Route::WrongTarget => {
                self.timed(|| BidDecision::no_bid("", wrong_target(target)))
            }
        }
    }

    /// Parses and admits one bid submission for a named exchange.
    ///
    /// Synchronous: no suspension point between receipt and decision.
    pub fn bid(&self, exchange: &str, target: &str, body: &[u8]) -> BidDecision {
        let Some(adapter) = self.exchanges.get(exchange) else {
            return BidDecision::no_bid("", wrong_target(target));
        };

        match adapter.parse(body) {
            Ok(opportunity) => self.admit(&opportunity),
            Err(e) => BidDecision::no_bid("", e.to_string()),
        }
    }

    /// Runs admission control and selection for a parsed opportunity.
    pub fn admit(&self, opportunity: &BidOpportunity) -> BidDecision {
        let id = opportunity.id.as_str();

        if self.selector.campaign_count() == 0 {
            return BidDecision::no_bid(id, NO_CAMPAIGNS);
        }
        if self.state.is_stopped() {
            return BidDecision::no_bid(id, SERVER_STOPPED);
        }
        if !self.state.admit() {
            return BidDecision::no_bid(id, SERVER_THROTTLED);
        }

        let selected = catch_unwind(AssertUnwindSafe(|| self.selector.select(opportunity)));
        match selected {
            Ok(Ok(Some(bid))) => {
                self.state.record_bid();
                BidDecision::Bid(bid)
            }
            Ok(Ok(None)) => {
                self.state.record_no_bid();
                BidDecision::no_bid(id, NO_MATCH)
            }
            Ok(Err(e)) => BidDecision::no_bid(id, e.to_string()),
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .copied()
                    .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
                    .unwrap_or("unknown panic");
                warn!("Campaign selection panicked for {}: {}", id, message);
                BidDecision::no_bid(id, SELECTION_PANICKED)
            }
        }
    }

    pub fn status(&self) -> rtbedge_common::StatusSnapshot {
        self.state.snapshot(self.selector.campaign_ids())
    }

    fn timed(&self, decide: impl FnOnce() -> BidDecision) -> DispatchResult {
        let started = Instant::now();
        let decision = decide();
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &decision {
            BidDecision::Bid(bid) => {
                debug!(campaign = %bid.campaign_id, price = bid.price, elapsed_ms, "Bid");
            }
            BidDecision::NoBid(nb) => {
                debug!(id = %nb.id, reason = %nb.reason, elapsed_ms, "No bid");
            }
        }
        DispatchResult::decision(&decision, elapsed_ms)
    }

    fn win(&self, notice: WinNotice) -> DispatchResult {
        info!(
            exchange = %notice.exchange,
            bid_id = notice.bid_id.as_deref().unwrap_or(""),
            price = notice.price.unwrap_or(0.0),
            "Win notice"
        );
        DispatchResult::new(200, JSON, notice.to_json())
    }

    async fn pool_members(&self) -> DispatchResult {
        let Some(pool) = &self.pool else {
            return DispatchResult::json(200, &json!({ "members": [] }));
        };

        match list_members(pool.store.as_ref(), &pool.config).await {
            Ok(members) => DispatchResult::json(200, &json!({ "members": members })),
            Err(e) => {
                warn!("Failed to list bidder pool: {}", e);
                DispatchResult::error(503, &e.to_string())
            }
        }
    }

    fn throttle(&self, raw: &str) -> DispatchResult {
        let applied = raw
            .parse::<u8>()
            .map_err(|_| RtbError::InvalidRequest(format!("invalid throttle value: {}", raw)))
            .and_then(|percent| self.state.set_throttle(percent).map(|_| percent));

        match applied {
            Ok(percent) => {
                info!("Throttle set to {}%", percent);
                DispatchResult::json(200, &self.status())
            }
            Err(e) => DispatchResult::error(400, &e.to_string()),
        }
    }

    fn set_stopped(&self, stopped: bool) -> DispatchResult {
        self.state.set_stopped(stopped);
        if stopped {
            info!("Bidding stopped");
        } else {
            info!("Bidding started");
        }
        DispatchResult::json(200, &self.status())
    }

    fn asset_error(&self, target: &str, e: RtbError) -> DispatchResult {
        debug!("Asset {} not served: {}", target, e);
        DispatchResult::error(404, &format!("not found: {}", target))
    }
}
