//! HTTP client for a shared membership store.
//!
//! Talks to a [`StoreServer`](crate::StoreServer) so that bidders running in
//! separate processes share one pool. Every failure (connect error, timeout,
//! non-2xx status, undecodable body) surfaces as a store error, which pool
//! nodes treat as fatal.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Url};
use rtbedge_common::{Result, RtbError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::store::MembershipStore;

/// Remote store client configuration.
#[derive(Debug, Clone)]
pub struct RemoteStoreConfig {
    /// Per-call timeout; expiry is a store failure
    pub timeout: Duration,
}

impl Default for RemoteStoreConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(2000),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct UpsertBody {
    pub member: String,
    pub score: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct MembersBody {
    pub members: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RemovedCount {
    pub removed: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct RemovedFlag {
    pub removed: bool,
}

/// Membership store reached over HTTP.
#[derive(Debug, Clone)]
pub struct RemoteStore {
    base: Url,
    client: Client,
}

impl RemoteStore {
    /// Creates a client for the store at `base_url` (e.g. `http://127.0.0.1:7379`).
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(base_url, RemoteStoreConfig::default())
    }

    pub fn with_config(base_url: &str, config: RemoteStoreConfig) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| RtbError::InvalidRequest(format!("Invalid store URL {}: {}", base_url, e)))?;
        if base.scheme() != "http" || base.cannot_be_a_base() {
            return Err(RtbError::InvalidRequest(format!(
                "Invalid store URL {}: not an http URL",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RtbError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { base, client })
    }

    /// Builds `<base>/sets/<set>/<tail...>` with each segment percent-encoded.
    fn url(&self, set: &str, tail: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                RtbError::InvalidRequest(format!("Invalid store URL {}", self.base))
            })?;
            segments.pop_if_empty().push("sets").push(set);
            for segment in tail {
                segments.push(segment);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client.request(method, url)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| RtbError::StoreUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RtbError::StoreUnavailable(format!(
                "store answered with HTTP {}",
                status
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| RtbError::MalformedStoreResponse(e.to_string()))
    }
}

#[async_trait]
impl MembershipStore for RemoteStore {
    async fn upsert_score(&self, set: &str, member: &str, score: i64) -> Result<()> {
        let url = self.url(set, &["members"])?;
        let body = UpsertBody {
            member: member.to_string(),
            score,
        };
        let _: serde_json::Value = self.send(self.request(Method::POST, url).json(&body)).await?;
        Ok(())
    }

    async fn range_by_score(&self, set: &str, min: i64, max: i64) -> Result<Vec<String>> {
        let url = self.url(set, &["range"])?;
        let request = self
            .request(Method::GET, url)
            .query(&[("min", min), ("max", max)]);
        let body: MembersBody = self.send(request).await?;
        Ok(body.members)
    }

    async fn remove_range_by_score(&self, set: &str, min: i64, max: i64) -> Result<u64> {
        let url = self.url(set, &["range"])?;
        let request = self
            .request(Method::DELETE, url)
            .query(&[("min", min), ("max", max)]);
        let body: RemovedCount = self.send(request).await?;
        Ok(body.removed)
    }

    async fn remove_member(&self, set: &str, member: &str) -> Result<bool> {
        let url = self.url(set, &["members", member])?;
        let body: RemovedFlag = self.send(self.request(Method::DELETE, url)).await?;
        Ok(body.removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_store_config_default() {
        let config = RemoteStoreConfig::default();
        assert_eq!(config.timeout, Duration::from_millis(2000));
    }

    #[test]
    fn test_rejects_invalid_url() {
        assert!(matches!(
            RemoteStore::new("not a url"),
            Err(RtbError::InvalidRequest(_))
        ));
        assert!(matches!(
            RemoteStore::new("mailto:ops@example.com"),
            Err(RtbError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_rejects_https_url() {
        assert!(matches!(
            RemoteStore::new("https://127.0.0.1:7379"),
            Err(RtbError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_url_building_encodes_segments() {
        let store = RemoteStore::new("http://127.0.0.1:7379/").unwrap();
        let url = store.url("bidderspool", &["members", "bidder a/1"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:7379/sets/bidderspool/members/bidder%20a%2F1"
        );
    }

    #[tokio::test]
    async fn test_unreachable_store_is_store_failure() {
        // port 9 (discard) is not listening on loopback in test environments
        let store = RemoteStore::with_config(
            "http://127.0.0.1:9",
            RemoteStoreConfig {
                timeout: Duration::from_millis(500),
            },
        )
        .unwrap();

        let err = store.upsert_score("pool", "a", 1).await.unwrap_err();
        assert!(
            matches!(err, RtbError::StoreUnavailable(_)),
            "unexpected error: {}",
            err
        );
    }
}
