//! HTTP Transport Utilities
//!
//! This module turns dispatch outcomes into hyper responses.
//!
//! # Headers
//!
//! - `X-TIME`: elapsed milliseconds spent admitting and selecting, set on
//!   every bid-path response
//! - `X-Reason`: the no-bid reason. A 204 response has no body on the wire,
//!   so the reason travels in this header as well.
//!
//! # Example
//!
//! ```
//! use rtbedge_common::transport::HttpTransport;
//! use hyper::StatusCode;
//!
//! let response = HttpTransport::json_response(StatusCode::OK, r#"{"ok":true}"#);
//! assert_eq!(response.status(), StatusCode::OK);
//! ```

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::{Request, Response, StatusCode};

/// Type alias for Hyper incoming requests
pub type HyperRequest = Request<Incoming>;

/// Type alias for Hyper responses with full body
pub type HyperResponse = Response<Full<Bytes>>;

/// Elapsed processing milliseconds.
pub const TIME_HEADER: &str = "x-time";

/// No-bid reason.
pub const REASON_HEADER: &str = "x-reason";

const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";

/// HTTP transport utility functions
pub struct HttpTransport;

impl HttpTransport {
    /// Create a response with the given status, content type and body.
    ///
    /// Content types that are not valid header values fall back to
    /// `application/octet-stream`.
    pub fn response(
        status: StatusCode,
        content_type: &str,
        body: impl Into<Bytes>,
    ) -> HyperResponse {
        let mut response = Response::new(Full::new(body.into()));
        *response.status_mut() = status;
        let content_type = HeaderValue::from_str(content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
        response.headers_mut().insert(CONTENT_TYPE, content_type);
        response
    }

    /// Create a JSON response.
    pub fn json_response(status: StatusCode, body: impl Into<Bytes>) -> HyperResponse {
        Self::response(status, JSON_CONTENT_TYPE, body)
    }

    /// Set a header, ignoring values that cannot be carried in HTTP.
    ///
    /// Reasons derived from error messages may contain control characters;
    /// those are dropped rather than failing the response.
    pub fn with_header(mut response: HyperResponse, name: &'static str, value: &str) -> HyperResponse {
        let sanitized: String = value.chars().filter(|c| !c.is_control()).collect();
        if let Ok(value) = HeaderValue::from_str(&sanitized) {
            response
                .headers_mut()
                .insert(HeaderName::from_static(name), value);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_response_headers() {
        let response = HttpTransport::json_response(StatusCode::OK, "{}");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json;charset=utf-8"
        );
    }

    #[test]
    fn test_with_header_sets_value() {
        let response = HttpTransport::json_response(StatusCode::OK, "{}");
        let response = HttpTransport::with_header(response, TIME_HEADER, "3");
        assert_eq!(response.headers().get("X-TIME").unwrap(), "3");
    }

    #[test]
    fn test_with_header_strips_control_characters() {
        let response = HttpTransport::json_response(StatusCode::NO_CONTENT, "{}");
        let response = HttpTransport::with_header(response, REASON_HEADER, "bad\njson");
        assert_eq!(response.headers().get(REASON_HEADER).unwrap(), "badjson");
    }

    #[test]
    fn test_response_with_custom_content_type() {
        let response = HttpTransport::response(StatusCode::OK, "text/html", "<html></html>");
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "text/html");
    }
}
