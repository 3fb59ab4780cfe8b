pub mod bid;
pub mod error;
pub mod status;

#[cfg(test)]
mod tests;

pub use bid::{BidDecision, BidOpportunity, BidResponse, NoBid};
pub use error::{Result, RtbError};
pub use status::StatusSnapshot;

/// HTTP status returned with a committed bid.
pub const BID_CODE: u16 = 200;

/// HTTP status returned with a no-bid.
pub const NOBID_CODE: u16 = 204;
