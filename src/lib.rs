//! # routekit
//!
//! A thin layer over hyper for services that declare their routes as
//! methods on a handler object.
//!
//! - [`Server`] owns a [`Router`] and a [`ServerConfig`], runs install hooks
//!   against the router, and serves it with read/write timeouts and a 1 MiB
//!   header limit.
//! - [`Service`] takes a handler object declared with [`routes!`], calls each
//!   public argument-free method once to get its [`Route`] (verb + handler),
//!   and binds it under a path derived from the method name:
//!   `GetStatus` → `/get_status`.
//!
//! Routing itself is matchit's radix tree, one per HTTP method. TLS, rate
//! limiting and body-size limits belong to the proxy in front.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use routekit::{routes, Request, Response, Route, Router, Server, ServerConfig, Service};
//!
//! struct Status;
//!
//! async fn status(_req: Request) -> Response {
//!     Response::text("ok")
//! }
//!
//! routes! {
//!     impl Status {
//!         #[allow(non_snake_case)]
//!         pub fn GetStatus(&self) -> Route { Route::get(status) }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut server = Server::new("status", Some(ServerConfig { port: 3000, ..Default::default() }));
//!     server.install([|router: &mut Router| Service::new(Status, true).bind(router)]);
//!     server.run().await;
//! }
//! ```

mod case;
mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;
mod service;
mod verb;

pub mod health;

pub use case::camel_to_snake;
pub use error::Error;
pub use handler::{BoxedHandler, Handler};
pub use http::StatusCode;
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::{Group, Router, Routes};
pub use server::{
    DEFAULT_PORT, DEFAULT_READ_TIMEOUT, DEFAULT_WRITE_TIMEOUT, MAX_HEADER_BYTES, Server,
    ServerConfig,
};
pub use service::{MethodDecl, Routable, Route, RouteEntry, Service, Skip, SkipReason};
pub use verb::Verb;
