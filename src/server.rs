//! HTTP server wrapper: configuration, install hooks, and the serve loop.
//!
//! # Lifecycle
//!
//! ```text
//! Server::new(name, config)     ← fresh, empty Router
//!        ↓ install([hook, …])   ← each hook registers routes / services
//!        ↓ run().await          ← defaults applied, bind, serve
//! ```
//!
//! # Graceful shutdown and Kubernetes
//!
//! On **SIGTERM** or Ctrl-C the loop stops accepting, lets every in-flight
//! connection finish, and returns. Set `terminationGracePeriodSeconds`
//! longer than your slowest request.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_READ_TIMEOUT: u64 = 30;
pub const DEFAULT_WRITE_TIMEOUT: u64 = 30;

/// Largest request head accepted, in bytes.
pub const MAX_HEADER_BYTES: usize = 1 << 20;

/// Listener settings. Timeouts are in seconds.
///
/// A zero field means "use the default"; the substitution happens each time
/// the server runs, not when the config is built.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    pub read_timeout: u64,
    pub write_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }
}

impl ServerConfig {
    /// Replaces every zero field with its default; non-zero fields are kept.
    pub fn with_defaults(self) -> Self {
        Self {
            port: if self.port == 0 { DEFAULT_PORT } else { self.port },
            read_timeout: if self.read_timeout == 0 { DEFAULT_READ_TIMEOUT } else { self.read_timeout },
            write_timeout: if self.write_timeout == 0 { DEFAULT_WRITE_TIMEOUT } else { self.write_timeout },
        }
    }

    fn timeouts(&self) -> Timeouts {
        Timeouts {
            read: Duration::from_secs(self.read_timeout),
            write: Duration::from_secs(self.write_timeout),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Timeouts {
    /// Reading the request head, then the body.
    read: Duration,
    /// Producing the response once the request is read.
    write: Duration,
}

/// A named HTTP server owning its [`Router`].
///
/// ```rust,no_run
/// use routekit::{health::Probes, Router, Server, ServerConfig, Service};
///
/// #[tokio::main]
/// async fn main() {
///     let mut server = Server::new("api", Some(ServerConfig { port: 3000, ..Default::default() }));
///     server.install([|router: &mut Router| Service::new(Probes, false).bind(router)]);
///     server.run().await;
/// }
/// ```
pub struct Server {
    name: String,
    router: Router,
    config: Option<ServerConfig>,
}

impl Server {
    pub fn new(name: impl Into<String>, config: Option<ServerConfig>) -> Self {
        Self { name: name.into(), router: Router::new(), config }
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn set_name(&mut self, name: impl Into<String>) { self.name = name.into(); }

    pub fn router(&self) -> &Router { &self.router }
    pub fn router_mut(&mut self) -> &mut Router { &mut self.router }
    pub fn set_router(&mut self, router: Router) { self.router = router; }

    pub fn config(&self) -> Option<&ServerConfig> { self.config.as_ref() }
    pub fn set_config(&mut self, config: Option<ServerConfig>) { self.config = config; }

    /// Calls each hook with the router, in order.
    pub fn install<I, F>(&mut self, hooks: I)
    where
        I: IntoIterator<Item = F>,
        F: FnOnce(&mut Router),
    {
        for hook in hooks {
            hook(&mut self.router);
        }
    }

    /// The config the server runs with: the stored one (or the default when
    /// none is set) with zero fields defaulted. The result is stored back.
    pub fn effective_config(&mut self) -> ServerConfig {
        let config = self.config.unwrap_or_default().with_defaults();
        self.config = Some(config);
        config
    }

    /// Binds `0.0.0.0:<port>` and serves until shutdown.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound or fails while serving. There
    /// is no retry; use [`serve`](Server::serve) to handle the error instead.
    pub async fn run(self) {
        if let Err(e) = self.serve().await {
            let msg = format!("server run failed Err: {e}");
            error!("{msg}");
            panic!("{msg}");
        }
    }

    /// Like [`run`](Server::run), returning the error instead of panicking.
    pub async fn serve(mut self) -> Result<(), Error> {
        let config = self.effective_config();
        info!(server = %self.name, port = config.port, "server run on port: {}", config.port);

        let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], config.port))).await?;
        self.serve_with_shutdown(listener, shutdown_signal()).await
    }

    /// Serves on an already-bound listener until `signal` resolves, then
    /// drains in-flight connections.
    ///
    /// The read timeout bounds the request head only on HTTP/1 connections
    /// (hyper's `header_read_timeout`). HTTP/2 has no head deadline; its
    /// requests are bounded by the body read timeout (408) and the write
    /// timeout on the handler (503) only.
    pub async fn serve_with_shutdown<F>(mut self, listener: TcpListener, signal: F) -> Result<(), Error>
    where
        F: Future<Output = ()>,
    {
        let timeouts = self.effective_config().timeouts();
        let router = Arc::new(self.router);

        let mut conn = ConnBuilder::new(TokioExecutor::new());
        conn.http1()
            .timer(TokioTimer::new())
            .header_read_timeout(timeouts.read)
            .max_buf_size(MAX_HEADER_BYTES);
        conn.http2().max_header_list_size(MAX_HEADER_BYTES as u32);

        debug!(server = %self.name, addr = ?listener.local_addr().ok(), "accepting connections");

        let mut tasks = tokio::task::JoinSet::new();
        tokio::pin!(signal);

        loop {
            tokio::select! {
                biased;

                () = &mut signal => {
                    info!(server = %self.name, in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, peer) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let router = Arc::clone(&router);
                    let conn = conn.clone();
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| dispatch(Arc::clone(&router), timeouts, req));
                        if let Err(e) = conn.serve_connection(io, svc).await {
                            debug!(peer = %peer, "connection error: {e}");
                        }
                    });
                }

                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!(server = %self.name, "server stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Routes one request and produces one response. Every failure becomes an
/// HTTP status, so hyper never sees an error.
async fn dispatch(
    router: Arc<Router>,
    timeouts: Timeouts,
    req: hyper::Request<Incoming>,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let (parts, body) = req.into_parts();
    let method = parts.method.clone();
    let path = parts.uri.path().to_owned();

    let response = match router.lookup(&method, &path) {
        None => Response::status(StatusCode::NOT_FOUND),
        Some((handler, params)) => match timeout(timeouts.read, body.collect()).await {
            Err(_) => {
                warn!(method = %method, path = %path, "request body not read within read timeout");
                Response::status(StatusCode::REQUEST_TIMEOUT)
            }
            Ok(Err(e)) => {
                warn!(method = %method, path = %path, "failed to read request body: {e}");
                Response::status(StatusCode::BAD_REQUEST)
            }
            Ok(Ok(body)) => {
                let req = Request::new(parts, body.to_bytes(), params);
                match timeout(timeouts.write, handler.call(req)).await {
                    Ok(res) => res,
                    Err(_) => {
                        warn!(method = %method, path = %path, "handler exceeded write timeout");
                        Response::status(StatusCode::SERVICE_UNAVAILABLE)
                    }
                }
            }
        },
    };

    debug!(
        method = %method,
        path = %path,
        status = response.status_code().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request",
    );
    Ok(response.into_inner())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on SIGTERM or Ctrl-C (Ctrl-C only on non-Unix). A signal that
/// cannot be listened for never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c  => {}
        () = sigterm => {}
    }
}
