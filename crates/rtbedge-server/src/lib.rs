//! rtbedge Bidder Server
//!
//! The request side of a bidder: route classification, admission control,
//! campaign selection and the hyper listener that fronts them.
//!
//! # Components
//!
//! - [`ServingState`]: throttle, stop flag and bid/no-bid counters
//! - [`Dispatcher`]: the per-request pipeline
//! - [`CampaignSelector`] / [`CampaignBook`]: what to bid
//! - [`ExchangeAdapter`] / [`ExchangeRegistry`]: exchange payload parsing
//! - [`HttpServer`]: HTTP/1.1 listener

pub mod assets;
pub mod dispatch;
pub mod exchange;
pub mod http_server;
pub mod route;
pub mod selector;
pub mod state;
pub mod win;

pub use assets::AssetServer;
pub use dispatch::{DispatchResult, Dispatcher};
pub use exchange::{ExchangeAdapter, ExchangeRegistry, OpenRtbAdapter};
pub use http_server::HttpServer;
pub use route::Route;
pub use selector::{Campaign, CampaignBook, CampaignSelector, Constraint};
pub use state::ServingState;
pub use win::WinNotice;
