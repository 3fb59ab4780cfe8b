use rtbedge_common::{Result, RtbError};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::{now_millis, PoolConfig, LIST_HORIZON};
use crate::cycle::run_cycle;
use crate::store::MembershipStore;

/// Role of a pool participant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// Unnamed node: sweeps, never registers itself
    Coordinator,
    /// Named bidder instance: heartbeats and sweeps
    Worker(String),
}

impl Role {
    pub fn from_name(name: Option<String>) -> Self {
        match name {
            Some(name) => Role::Worker(name),
            None => Role::Coordinator,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Role::Coordinator => None,
            Role::Worker(name) => Some(name),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Coordinator => write!(f, "Master"),
            Role::Worker(name) => write!(f, "{}", name),
        }
    }
}

/// Lifecycle of a pool node.
///
/// `Joining -> Ready` happens exactly once, at the end of the first pass.
/// `Stopped` follows a graceful leave; `Terminated` follows any store error
/// and is final for the process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeState {
    Joining,
    Ready,
    Running,
    Stopped,
    Terminated(String),
}

impl NodeState {
    pub fn is_final(&self) -> bool {
        matches!(self, NodeState::Stopped | NodeState::Terminated(_))
    }
}

/// A participant in the bidder pool.
///
/// Each node runs its own heartbeat/sweep loop on a dedicated task; nodes
/// never talk to each other, only to the store. Dropping the node stops the
/// loop like `leave(false)`.
pub struct BidderPoolNode {
    role: Role,
    store: Arc<dyn MembershipStore>,
    config: PoolConfig,
    state: watch::Receiver<NodeState>,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl BidderPoolNode {
    /// Joins the pool and waits for the first heartbeat/sweep pass.
    ///
    /// A `None` name joins as coordinator. When this returns `Ok`, the store
    /// has been touched at least once by this node.
    ///
    /// # Errors
    ///
    /// Returns the store error if the first pass fails; the node is then
    /// already `Terminated`.
    pub async fn join(
        name: Option<String>,
        store: Arc<dyn MembershipStore>,
        config: PoolConfig,
    ) -> Result<Self> {
        let role = Role::from_name(name);
        let (state_tx, state_rx) = watch::channel(NodeState::Joining);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (ready_tx, ready_rx) = oneshot::channel();

        let pool_loop = PoolLoop {
            role: role.clone(),
            store: store.clone(),
            config: config.clone(),
            state: state_tx,
            shutdown: shutdown_rx,
            ready: Some(ready_tx),
        };
        let handle = pool_loop.spawn();

        match ready_rx.await {
            Ok(Ok(())) => {
                info!(node = %role, pool = %config.pool_name, "Joined bidder pool");
                Ok(Self {
                    role,
                    store,
                    config,
                    state: state_rx,
                    shutdown: shutdown_tx,
                    handle,
                })
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(RtbError::NodeTerminated(format!(
                "{} exited before its first cycle",
                role
            ))),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.role.name()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> NodeState {
        self.state.borrow().clone()
    }

    /// Resolves with the failure reason once the node is `Terminated`.
    ///
    /// Never resolves for a node that stops gracefully. Hosting binaries race
    /// this against their server and exit the process when it fires.
    pub async fn terminated(&self) -> String {
        let mut state = self.state.clone();
        loop {
            if let NodeState::Terminated(reason) = &*state.borrow_and_update() {
                return reason.clone();
            }
            if state.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }

    /// Leaves the pool.
    ///
    /// Interrupts the loop between passes (a pass in flight finishes first),
    /// then removes this node's own record when `remove_self` is set.
    pub async fn leave(self, remove_self: bool) -> Result<()> {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.handle.await {
            warn!(node = %self.role, "Pool loop ended abnormally: {}", e);
        }

        if remove_self {
            if let Some(name) = self.role.name() {
                self.store
                    .remove_member(&self.config.pool_name, name)
                    .await?;
                info!(node = %self.role, "Removed self from bidder pool");
            }
        }
        Ok(())
    }

    /// Stops the loop immediately without leaving.
    ///
    /// The record stays until another node's sweep ages it out, exactly as
    /// if the process had died.
    pub fn abandon(self) {
        self.handle.abort();
    }
}

/// Background heartbeat/sweep loop owned by a single node.
struct PoolLoop {
    role: Role,
    store: Arc<dyn MembershipStore>,
    config: PoolConfig,
    state: watch::Sender<NodeState>,
    shutdown: watch::Receiver<bool>,
    ready: Option<oneshot::Sender<Result<()>>>,
}

impl PoolLoop {
    fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(mut self) {
        loop {
            let now = now_millis();
            match run_cycle(self.store.as_ref(), &self.config, self.role.name(), now).await {
                Ok(_) => self.mark_alive(),
                Err(e) => {
                    error!(node = %self.role, "INTERRUPT: membership store failure: {}", e);
                    self.state.send_replace(NodeState::Terminated(e.to_string()));
                    if let Some(ready) = self.ready.take() {
                        let _ = ready.send(Err(e));
                    }
                    return;
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.pause) => {}
                _ = self.shutdown.changed() => {
                    self.state.send_replace(NodeState::Stopped);
                    info!(node = %self.role, "Left bidder pool");
                    return;
                }
            }
        }
    }

    /// Publishes `Ready` after the first pass and `Running` after the second.
    fn mark_alive(&mut self) {
        if let Some(ready) = self.ready.take() {
            self.state.send_replace(NodeState::Ready);
            let _ = ready.send(Ok(()));
        } else {
            self.state.send_if_modified(|state| {
                if *state == NodeState::Ready {
                    *state = NodeState::Running;
                    true
                } else {
                    false
                }
            });
        }
    }
}

/// Names of every member not yet past the staleness threshold, oldest
/// heartbeat first.
pub async fn list_members(store: &dyn MembershipStore, config: &PoolConfig) -> Result<Vec<String>> {
    let horizon = now_millis() + LIST_HORIZON.as_millis() as i64;
    store.range_by_score(&config.pool_name, 0, horizon).await
}

/// Removes a member from the pool on an operator's behalf.
pub async fn remove_member(store: &dyn MembershipStore, config: &PoolConfig, name: &str) -> Result<bool> {
    info!("Removing bidder from pool: {}", name);
    store.remove_member(&config.pool_name, name).await
}
