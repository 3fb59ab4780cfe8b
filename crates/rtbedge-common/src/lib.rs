// Copyright 2025 rtbedge Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! rtbedge Common Types and Transport
//!
//! This crate provides the protocol definitions and HTTP helpers shared by the
//! bidder, the pool membership service and the command-line tools.
//!
//! # Overview
//!
//! rtbedge is the edge component of a real-time-bidding participant. It admits
//! or rejects inbound bid opportunities under throttling and shutdown
//! constraints, and tracks which bidder instances of the fleet are alive. This
//! crate contains the pieces every other crate needs:
//!
//! - **Protocol Layer**: bid opportunities, bid decisions, no-bid bodies and the
//!   status snapshot exposed to monitoring
//! - **Transport Layer**: conversions from dispatch results into hyper responses
//! - **Errors**: the single [`RtbError`] enum used across the workspace
//!
//! # Example
//!
//! ```
//! use rtbedge_common::{BidDecision, NoBid};
//!
//! let decision = BidDecision::NoBid(NoBid::new("req-1", "server throttled"));
//! assert!(!decision.is_bid());
//! assert!(decision.to_json().contains("server throttled"));
//! ```

pub mod protocol;
pub mod transport;

pub use protocol::*;
