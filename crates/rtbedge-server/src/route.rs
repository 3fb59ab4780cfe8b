//! Route classification for the bidder listener.
//!
//! Only the path takes part; the query string is dropped before any
//! matching. Order matters: asset paths are matched by substring first,
//! exactly like the simulator expects, then win notices, ops routes and bid
//! submissions. Anything left over is a wrong target.

use hyper::Method;

use crate::win::WinNotice;

pub const SIMULATOR_URL: &str = "/xrtb/simulator/exchange";
pub const BID_PREFIX: &str = "/rtb/bids/";
pub const STATUS_PATH: &str = "/rtb/status";
pub const POOL_PATH: &str = "/rtb/pool";
pub const THROTTLE_PREFIX: &str = "/rtb/admin/throttle/";
pub const STOP_PATH: &str = "/rtb/admin/stop";
pub const START_PATH: &str = "/rtb/admin/start";

#[derive(Debug, Clone, PartialEq)]
pub enum Route<'a> {
    Favicon,
    Simulator,
    /// Path of the asset relative to the web root
    WebAsset(&'a str),
    Win(WinNotice),
    Status,
    Pool,
    /// Raw throttle value, validated by the dispatcher
    Throttle(&'a str),
    Stop,
    Start,
    /// Exchange name from the bid path
    Bid(&'a str),
    WrongTarget,
}

impl<'a> Route<'a> {
    pub fn classify(method: &Method, target: &'a str) -> Route<'a> {
        let path = strip_query(target);
        if path.contains("favicon") {
            return Route::Favicon;
        }
        if path.contains(SIMULATOR_URL) {
            return Route::Simulator;
        }
        if let Some(i) = path.find("web/") {
            return Route::WebAsset(&path[i + "web/".len()..]);
        }
        if let Some(notice) = WinNotice::from_target(path) {
            return Route::Win(notice);
        }

        match path {
            STATUS_PATH if *method == Method::GET => return Route::Status,
            POOL_PATH if *method == Method::GET => return Route::Pool,
            STOP_PATH => return Route::Stop,
            START_PATH => return Route::Start,
            _ => {}
        }
        if let Some(value) = path.strip_prefix(THROTTLE_PREFIX) {
            return Route::Throttle(value.trim_end_matches('/'));
        }
        if let Some(exchange) = path.strip_prefix(BID_PREFIX) {
            let exchange = exchange.trim_end_matches('/');
            if !exchange.is_empty() && !exchange.contains('/') {
                return Route::Bid(exchange);
            }
        }
        Route::WrongTarget
    }
}

fn strip_query(target: &str) -> &str {
    target.split('?').next().unwrap_or(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(target: &str) -> Route<'_> {
        Route::classify(&Method::GET, target)
    }

    fn post(target: &str) -> Route<'_> {
        Route::classify(&Method::POST, target)
    }

    #[test]
    fn test_asset_routes() {
        assert_eq!(get("/favicon.ico"), Route::Favicon);
        assert_eq!(get("/xrtb/simulator/exchange"), Route::Simulator);
        assert_eq!(get("/web/js/jquery.js?v=2"), Route::WebAsset("js/jquery.js"));
    }

    #[test]
    fn test_win_route() {
        match get("/rtb/win/nexage/req-1/0.5") {
            Route::Win(notice) => assert_eq!(notice.exchange, "nexage"),
            other => panic!("unexpected route: {:?}", other),
        }
    }

    #[test]
    fn test_ops_routes() {
        assert_eq!(get("/rtb/status"), Route::Status);
        assert_eq!(get("/rtb/pool"), Route::Pool);
        assert_eq!(post("/rtb/status"), Route::WrongTarget);
        assert_eq!(post("/rtb/admin/throttle/40"), Route::Throttle("40"));
        assert_eq!(get("/rtb/admin/stop"), Route::Stop);
        assert_eq!(get("/rtb/admin/start"), Route::Start);
    }

    #[test]
    fn test_bid_route() {
        assert_eq!(post("/rtb/bids/nexage"), Route::Bid("nexage"));
        assert_eq!(post("/rtb/bids/nexage/"), Route::Bid("nexage"));
        assert_eq!(post("/rtb/bids/nexage?debug=1"), Route::Bid("nexage"));
    }

    #[test]
    fn test_query_string_does_not_select_asset_routes() {
        assert_eq!(post("/rtb/bids/nexage?cb=favicon"), Route::Bid("nexage"));
        assert_eq!(post("/rtb/bids/nexage?ref=web/x.js"), Route::Bid("nexage"));
        assert_eq!(
            post("/rtb/bids/nexage?from=/xrtb/simulator/exchange"),
            Route::Bid("nexage")
        );
        assert_eq!(get("/rtb/status?favicon=1"), Route::Status);
        assert_eq!(post("/unknown?web/x.js"), Route::WrongTarget);
    }

    #[test]
    fn test_wrong_targets() {
        assert_eq!(post("/unknown/path"), Route::WrongTarget);
        assert_eq!(post("/rtb/bids/"), Route::WrongTarget);
        assert_eq!(post("/rtb/bids/a/b"), Route::WrongTarget);
        assert_eq!(post("/"), Route::WrongTarget);
    }

    #[test]
    fn test_assets_win_over_later_routes() {
        assert_eq!(post("/rtb/bids/favicon"), Route::Favicon);
    }
}
