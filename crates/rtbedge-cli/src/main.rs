//! # rtbedge CLI Entry Point
//!
//! Main binary for rtbedge. Starts bidders, the shared membership store and
//! pool coordinators, and inspects the bidder pool.
//!
//! ## Usage
//!
//! ```bash
//! # Start the shared membership store
//! rtbedge store -b 0.0.0.0:7379
//!
//! # Start a coordinator that only sweeps stale members
//! rtbedge coordinator --store http://127.0.0.1:7379
//!
//! # Start a bidder that joins the pool as "bidder-a"
//! rtbedge bidder -b 0.0.0.0:8080 -c campaigns.json --name bidder-a --store http://127.0.0.1:7379
//!
//! # List live pool members (outputs raw JSON)
//! rtbedge members --store http://127.0.0.1:7379
//! ```
//!
//! `--store` falls back to `RTBEDGE_STORE_URL` and `--name` to
//! `RTBEDGE_NODE_NAME`.

use anyhow::Result;
use argh::FromArgs;
use rtbedge_pool::{
    BidderPoolNode, InMemoryStore, MembershipStore, PoolConfig, RemoteStore, StoreServer,
};
use rtbedge_server::{AssetServer, CampaignBook, Dispatcher, HttpServer, ServingState};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

const STORE_URL_ENV: &str = "RTBEDGE_STORE_URL";
const NODE_NAME_ENV: &str = "RTBEDGE_NODE_NAME";

/// Validates that a URL string starts with http://
///
/// The store client speaks plain HTTP only.
fn validate_http_url(url: &str, description: &str) -> Result<()> {
    if url.starts_with("http://") {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Invalid {}: '{}' must start with http://",
            description,
            url
        ))
    }
}

/// Flag value if given, otherwise the environment value. Blank values count
/// as unset.
fn resolve_setting(flag: Option<String>, env: Option<String>) -> Option<String> {
    let nonblank = |v: &String| !v.trim().is_empty();
    flag.filter(nonblank).or_else(|| env.filter(nonblank))
}

fn parse_bind(bind: &str) -> Result<SocketAddr> {
    bind.parse()
        .map_err(|e| anyhow::anyhow!("Invalid bind address {}: {}", bind, e))
}

fn pool_config(pool: &str, interval_ms: u64, pause_ms: u64) -> PoolConfig {
    PoolConfig {
        pool_name: pool.to_string(),
        interval: Duration::from_millis(interval_ms),
        pause: Duration::from_millis(pause_ms),
    }
}

fn remote_store(flag: Option<String>) -> Result<Option<Arc<dyn MembershipStore>>> {
    match resolve_setting(flag, std::env::var(STORE_URL_ENV).ok()) {
        Some(url) => {
            validate_http_url(&url, "store URL")?;
            tracing::info!("Using membership store at {}", url);
            Ok(Some(Arc::new(RemoteStore::new(&url)?)))
        }
        None => Ok(None),
    }
}

fn require_store(flag: Option<String>) -> Result<Arc<dyn MembershipStore>> {
    remote_store(flag)?.ok_or_else(|| {
        anyhow::anyhow!("No membership store given; use --store or {}", STORE_URL_ENV)
    })
}

#[derive(FromArgs)]
/// rtbedge - real-time bidding edge server
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Bidder(BidderArgs),
    Store(StoreArgs),
    Coordinator(CoordinatorArgs),
    Members(MembersArgs),
}

/// Arguments for starting a bidder.
///
/// A bidder answers bid submissions on `/rtb/bids/<exchange>`. With a
/// `--name` it also joins the bidder pool and exits with status 1 as soon
/// as it can no longer heartbeat into the store.
#[derive(FromArgs)]
#[argh(subcommand, name = "bidder")]
/// start a bidder
struct BidderArgs {
    /// address to bind the bidder's HTTP server to
    #[argh(option, short = 'b', default = "\"0.0.0.0:8080\".into()")]
    bind: String,

    /// JSON file with the campaigns to load; none are loaded by default
    #[argh(option, short = 'c')]
    campaigns: Option<String>,

    /// directory holding the simulator page and its scripts
    #[argh(option, long = "web-root", default = "\"web\".into()")]
    web_root: String,

    /// name this bidder registers under in the pool
    #[argh(option, long = "name")]
    name: Option<String>,

    /// membership store URL; without one the pool is process-local
    #[argh(option, long = "store")]
    store: Option<String>,

    /// percentage of opportunities admitted past the throttle gate
    #[argh(option, long = "throttle", default = "100")]
    throttle: u8,

    /// start with bidding stopped
    #[argh(switch, long = "stopped")]
    stopped: bool,

    /// name of the pool's sorted set
    #[argh(option, long = "pool", default = "\"bidderspool\".into()")]
    pool: String,

    /// TTL window in milliseconds; members silent for twice this are swept
    #[argh(option, long = "interval-ms", default = "30000")]
    interval_ms: u64,

    /// milliseconds between heartbeat/sweep passes
    #[argh(option, long = "pause-ms", default = "5000")]
    pause_ms: u64,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "store")]
/// start the shared membership store
struct StoreArgs {
    /// address to bind the store's HTTP server to
    #[argh(option, short = 'b', default = "\"0.0.0.0:7379\".into()")]
    bind: String,
}

/// Arguments for a coordinator.
///
/// A coordinator never registers itself; it only sweeps stale members so the
/// pool stays clean even when every bidder is down.
#[derive(FromArgs)]
#[argh(subcommand, name = "coordinator")]
/// run an unnamed pool node that sweeps stale members
struct CoordinatorArgs {
    /// membership store URL
    #[argh(option, long = "store")]
    store: Option<String>,

    /// name of the pool's sorted set
    #[argh(option, long = "pool", default = "\"bidderspool\".into()")]
    pool: String,

    /// TTL window in milliseconds
    #[argh(option, long = "interval-ms", default = "30000")]
    interval_ms: u64,

    /// milliseconds between sweep passes
    #[argh(option, long = "pause-ms", default = "5000")]
    pause_ms: u64,
}

#[derive(FromArgs)]
#[argh(subcommand, name = "members")]
/// list live pool members as JSON
struct MembersArgs {
    /// membership store URL
    #[argh(option, long = "store")]
    store: Option<String>,

    /// name of the pool's sorted set
    #[argh(option, long = "pool", default = "\"bidderspool\".into()")]
    pool: String,

    /// remove this member instead of listing
    #[argh(option, long = "remove")]
    remove: Option<String>,
}

/// How a long-running command ended.
enum Outcome {
    Finished,
    Interrupted,
    Terminated(String),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // members prints JSON; keep stdout clean
    if !matches!(cli.command, Commands::Members(_)) {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    match cli.command {
        Commands::Bidder(args) => run_bidder(args).await,
        Commands::Store(args) => {
            let addr = parse_bind(&args.bind)?;
            let server = StoreServer::new(Arc::new(InMemoryStore::new()));
            server.run(addr).await?;
            Ok(())
        }
        Commands::Coordinator(args) => run_coordinator(args).await,
        Commands::Members(args) => run_members(args).await,
    }
}

async fn run_bidder(args: BidderArgs) -> Result<()> {
    let addr = parse_bind(&args.bind)?;
    let config = pool_config(&args.pool, args.interval_ms, args.pause_ms);

    let state = Arc::new(ServingState::new());
    state.set_throttle(args.throttle)?;
    state.set_stopped(args.stopped);

    let book = match &args.campaigns {
        Some(path) => CampaignBook::from_file(path)?,
        None => {
            tracing::warn!("No campaigns loaded; every opportunity will be declined");
            CampaignBook::default()
        }
    };

    let store: Arc<dyn MembershipStore> = match remote_store(args.store)? {
        Some(store) => store,
        None => Arc::new(InMemoryStore::new()),
    };

    let dispatcher = Dispatcher::new(state, Arc::new(book))
        .with_assets(AssetServer::new(&args.web_root))
        .with_pool(store.clone(), config.clone());
    let server = HttpServer::new(Arc::new(dispatcher));

    let name = resolve_setting(args.name, std::env::var(NODE_NAME_ENV).ok());
    let Some(name) = name else {
        tracing::info!("No bidder name given; not joining the bidder pool");
        server.run(addr).await?;
        return Ok(());
    };

    let node = BidderPoolNode::join(Some(name), store, config).await?;

    let outcome = tokio::select! {
        res = server.run(addr) => {
            res?;
            Outcome::Finished
        }
        reason = node.terminated() => Outcome::Terminated(reason),
        _ = tokio::signal::ctrl_c() => Outcome::Interrupted,
    };

    match outcome {
        Outcome::Terminated(reason) => {
            tracing::error!("Lost bidder pool membership, shutting down: {}", reason);
            std::process::exit(1);
        }
        Outcome::Interrupted => {
            tracing::info!("Interrupted, leaving bidder pool");
            node.leave(true).await?;
        }
        Outcome::Finished => node.leave(true).await?,
    }
    Ok(())
}

async fn run_coordinator(args: CoordinatorArgs) -> Result<()> {
    let store = require_store(args.store)?;
    let config = pool_config(&args.pool, args.interval_ms, args.pause_ms);
    let node = BidderPoolNode::join(None, store, config).await?;

    let outcome = tokio::select! {
        reason = node.terminated() => Outcome::Terminated(reason),
        _ = tokio::signal::ctrl_c() => Outcome::Interrupted,
    };

    match outcome {
        Outcome::Terminated(reason) => {
            tracing::error!("Membership store lost, shutting down: {}", reason);
            std::process::exit(1);
        }
        Outcome::Interrupted | Outcome::Finished => {
            node.leave(false).await?;
            Ok(())
        }
    }
}

async fn run_members(args: MembersArgs) -> Result<()> {
    let store = require_store(args.store)?;
    let config = PoolConfig {
        pool_name: args.pool,
        ..PoolConfig::default()
    };

    match args.remove {
        Some(name) => {
            let removed = rtbedge_pool::remove_member(store.as_ref(), &config, &name).await?;
            println!("{}", serde_json::json!({ "removed": removed }));
        }
        None => {
            let members = rtbedge_pool::list_members(store.as_ref(), &config).await?;
            println!("{}", serde_json::to_string(&members)?);
        }
    }
    Ok(())
}
