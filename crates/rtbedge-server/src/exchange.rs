//! Exchange adapters
//!
//! Each exchange posts its own dialect of bid request. An adapter turns the
//! raw body into a [`BidOpportunity`]; the dispatcher looks adapters up by
//! the `<exchange>` segment of `/rtb/bids/<exchange>`.

use rtbedge_common::{BidOpportunity, Result, RtbError};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Exchange name registered by default.
pub const DEFAULT_EXCHANGE: &str = "nexage";

/// Parses one exchange's bid request payloads.
pub trait ExchangeAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn parse(&self, body: &[u8]) -> Result<BidOpportunity>;
}

/// Adapter for exchanges speaking plain OpenRTB JSON.
///
/// Requires a JSON object with a non-empty string `id`; everything else is
/// passed through to the selector untouched.
#[derive(Debug, Clone)]
pub struct OpenRtbAdapter {
    name: String,
}

impl OpenRtbAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl ExchangeAdapter for OpenRtbAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn parse(&self, body: &[u8]) -> Result<BidOpportunity> {
        let payload: Value = serde_json::from_slice(body)
            .map_err(|e| RtbError::Parse(format!("{} bid request: {}", self.name, e)))?;

        let id = match payload.get("id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                return Err(RtbError::Parse(format!(
                    "{} bid request without an id",
                    self.name
                )))
            }
        };

        Ok(BidOpportunity::new(id, self.name.clone(), payload))
    }
}

/// Adapters by exchange name.
#[derive(Clone)]
pub struct ExchangeRegistry {
    adapters: HashMap<String, Arc<dyn ExchangeAdapter>>,
}

impl Default for ExchangeRegistry {
    /// Registry with the OpenRTB adapter under [`DEFAULT_EXCHANGE`].
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(OpenRtbAdapter::new(DEFAULT_EXCHANGE)));
        registry
    }
}

impl ExchangeRegistry {
    pub fn empty() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Registers an adapter under its own name, replacing any previous one.
    pub fn register(&mut self, adapter: Arc<dyn ExchangeAdapter>) {
        self.adapters.insert(adapter.name().to_string(), adapter);
    }

    pub fn get(&self, exchange: &str) -> Option<&Arc<dyn ExchangeAdapter>> {
        self.adapters.get(exchange)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_has_nexage() {
        let registry = ExchangeRegistry::default();
        assert!(registry.get("nexage").is_some());
        assert!(registry.get("smaato").is_none());
    }

    #[test]
    fn test_register_additional_exchange() {
        let mut registry = ExchangeRegistry::default();
        registry.register(Arc::new(OpenRtbAdapter::new("smaato")));
        assert_eq!(registry.get("smaato").unwrap().name(), "smaato");
        assert!(registry.get("nexage").is_some());
    }

    #[test]
    fn test_parse_valid_request() {
        let adapter = OpenRtbAdapter::new("nexage");
        let opp = adapter
            .parse(br#"{"id": "abc", "imp": [{"id": "1", "bidfloor": 0.2}]}"#)
            .unwrap();

        assert_eq!(opp.id, "abc");
        assert_eq!(opp.exchange, "nexage");
        assert_eq!(opp.bid_floor(), 0.2);
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        let adapter = OpenRtbAdapter::new("nexage");
        let err = adapter.parse(b"{\"id\":").unwrap_err();
        assert!(matches!(err, RtbError::Parse(_)));
        assert!(err.to_string().contains("nexage bid request"));
    }

    #[test]
    fn test_parse_requires_id() {
        let adapter = OpenRtbAdapter::new("nexage");
        assert!(adapter.parse(br#"{"imp": []}"#).is_err());
        assert!(adapter.parse(br#"{"id": ""}"#).is_err());
        assert!(adapter.parse(br#"{"id": 7}"#).is_err());
        assert!(adapter.parse(b"[]").is_err());
    }
}
