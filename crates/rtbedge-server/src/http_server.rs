//! HTTP Server for the bidder
//!
//! hyper HTTP/1.1 listener in front of the [`Dispatcher`].
//!
//! # Architecture
//!
//! The server:
//! - Listens on a TCP socket for incoming HTTP connections
//! - Spawns a tokio task for each connection
//! - Hands method, target and body to the dispatcher
//! - Writes the dispatch result back with `X-TIME` and `X-Reason` headers
//!
//! # Example
//!
//! ```no_run
//! use rtbedge_server::{CampaignBook, Dispatcher, HttpServer, ServingState};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let dispatcher = Dispatcher::new(
//!         Arc::new(ServingState::new()),
//!         Arc::new(CampaignBook::default()),
//!     );
//!     let server = HttpServer::new(Arc::new(dispatcher));
//!     server.run("127.0.0.1:8080".parse().unwrap()).await.unwrap();
//! }
//! ```

use http_body_util::BodyExt;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::StatusCode;
use hyper_util::rt::TokioIo;
use rtbedge_common::transport::{HttpTransport, HyperRequest, HyperResponse, REASON_HEADER, TIME_HEADER};
use rtbedge_common::{Result, RtbError};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::dispatch::{DispatchResult, Dispatcher};

/// HTTP server for one bidder process.
pub struct HttpServer {
    dispatcher: Arc<Dispatcher>,
}

impl HttpServer {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Binds `addr` and serves until the listener fails.
    pub async fn run(self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RtbError::Transport(format!("Failed to bind to {}: {}", addr, e)))?;
        self.serve(listener).await
    }

    /// Serves on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        info!(
            "Bidder listening on {}",
            listener
                .local_addr()
                .map_err(|e| RtbError::Transport(format!("Failed to get local address: {}", e)))?
        );

        loop {
            let (stream, _) = listener
                .accept()
                .await
                .map_err(|e| RtbError::Transport(format!("Failed to accept connection: {}", e)))?;

            let io = TokioIo::new(stream);
            let dispatcher = self.dispatcher.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let dispatcher = dispatcher.clone();
                    async move { Ok::<_, Infallible>(Self::handle_request(dispatcher, req).await) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection: {}", err);
                }
            });
        }
    }

    async fn handle_request(dispatcher: Arc<Dispatcher>, req: HyperRequest) -> HyperResponse {
        let method = req.method().clone();
        let target = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| req.uri().path().to_string());

        // a broken body reads as empty and fails to parse into a no-bid
        let body = match req.into_body().collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                warn!("Failed to read request body for {}: {}", target, e);
                Bytes::new()
            }
        };

        let result = dispatcher.dispatch(&method, &target, &body).await;
        Self::into_response(result)
    }

    fn into_response(result: DispatchResult) -> HyperResponse {
        let status = StatusCode::from_u16(result.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = HttpTransport::response(status, result.content_type, result.body);

        if let Some(elapsed) = result.elapsed_ms {
            response = HttpTransport::with_header(response, TIME_HEADER, &elapsed.to_string());
        }
        if let Some(reason) = result.reason {
            response = HttpTransport::with_header(response, REASON_HEADER, &reason);
        }
        response
    }
}
