//! rtbedge Transport Layer
//!
//! HTTP helpers shared by the bidder listener and its tests.
//!
//! # Components
//!
//! - **[`HttpTransport`]**: builds hyper responses for dispatch results
//! - **[`HyperRequest`]** / **[`HyperResponse`]**: hyper type aliases
//! - Header names carried on every bid-path response

pub mod http;

pub use http::{HttpTransport, HyperRequest, HyperResponse, REASON_HEADER, TIME_HEADER};
