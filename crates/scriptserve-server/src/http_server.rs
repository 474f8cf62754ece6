//! HTTP front end
//!
//! Accept loop and per-connection plumbing. Each connection runs on its
//! own tokio task; each request is snapshotted into a [`RequestAdapter`]
//! and handed to the dispatcher, which always produces a response. The
//! service layer itself is infallible, so a misbehaving script can fail
//! its own request but never the connection loop.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::BodyExt;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::StatusCode;
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, ToSocketAddrs};

use scriptserve_common::error::Result;
use scriptserve_common::http::{status_response, HyperRequest, HyperResponse};

use crate::dispatcher::RouteDispatcher;
use crate::request::RequestAdapter;

/// HTTP/1.1 server front end over a [`RouteDispatcher`].
pub struct HttpServer {
    dispatcher: Arc<RouteDispatcher>,
}

impl HttpServer {
    pub fn new(dispatcher: RouteDispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    /// Binds the address and serves until the process exits.
    pub async fn run(self, addr: impl ToSocketAddrs) -> Result<()> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "listening");
        self.serve(listener).await
    }

    /// Serves connections from an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let dispatcher = self.dispatcher.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let dispatcher = dispatcher.clone();
                    async move { Self::handle_request(dispatcher, req, remote_addr).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    tracing::debug!(%remote_addr, error = %err, "connection ended with error");
                }
            });
        }
    }

    async fn handle_request(
        dispatcher: Arc<RouteDispatcher>,
        req: HyperRequest,
        remote_addr: SocketAddr,
    ) -> std::result::Result<HyperResponse, Infallible> {
        let (parts, body) = req.into_parts();

        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) => {
                tracing::warn!(%remote_addr, error = %err, "failed to read request body");
                return Ok(status_response(StatusCode::BAD_REQUEST));
            }
        };

        let adapter = RequestAdapter::new(
            &parts.method,
            &parts.uri,
            parts.version,
            &parts.headers,
            body,
            remote_addr.to_string(),
        );

        Ok(dispatcher.dispatch(adapter).await)
    }
}
