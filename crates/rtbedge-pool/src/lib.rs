//! rtbedge Bidder Pool
//!
//! Fleet membership for bidder instances. Every participant heartbeats its
//! own timestamp into a shared score-ordered set and sweeps out members
//! whose last heartbeat is older than twice the TTL interval. A member that
//! is not in the set is considered down.
//!
//! # Components
//!
//! - [`MembershipStore`]: the score-ordered set primitive the protocol needs
//! - [`InMemoryStore`]: process-local store, also backing [`StoreServer`]
//! - [`RemoteStore`]: HTTP client for a shared [`StoreServer`]
//! - [`BidderPoolNode`]: one participant, worker (named) or coordinator
//!
//! # Example
//!
//! ```no_run
//! use rtbedge_pool::{BidderPoolNode, InMemoryStore, PoolConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> rtbedge_common::Result<()> {
//! let store = Arc::new(InMemoryStore::new());
//! let config = PoolConfig::default();
//!
//! let coordinator = BidderPoolNode::join(None, store.clone(), config.clone()).await?;
//! let worker = BidderPoolNode::join(Some("bidder-a".into()), store.clone(), config.clone()).await?;
//!
//! let members = rtbedge_pool::list_members(store.as_ref(), &config).await?;
//! assert_eq!(members, vec!["bidder-a".to_string()]);
//!
//! worker.leave(true).await?;
//! coordinator.leave(false).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod cycle;
pub mod memory_store;
pub mod node;
pub mod remote_store;
pub mod store;
pub mod store_server;

pub use config::{now_millis, PoolConfig, LIST_HORIZON};
pub use cycle::{run_cycle, CycleReport};
pub use memory_store::InMemoryStore;
pub use node::{list_members, remove_member, BidderPoolNode, NodeState, Role};
pub use remote_store::{RemoteStore, RemoteStoreConfig};
pub use store::MembershipStore;
pub use store_server::StoreServer;
