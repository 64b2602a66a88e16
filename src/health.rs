//! Built-in Kubernetes health-check routes.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? Failure → pulled from load-balancer. |
//!
//! [`Probes`] is an ordinary handler object, so it goes through
//! [`Service`](crate::Service) like any other:
//!
//! ```rust
//! use routekit::{health::Probes, Router, Service};
//!
//! let mut router = Router::new();
//! Service::new(Probes, false).bind(&mut router);
//! ```
//!
//! Gate readiness on your own dependencies by declaring a handler object
//! with a `readyz` method of its own.

use crate::{Request, Response, Route};

/// Handler object serving `GET /healthz` and `GET /readyz`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Probes;

crate::routes! {
    impl Probes {
        pub fn healthz(&self) -> Route {
            Route::get(liveness)
        }

        pub fn readyz(&self) -> Route {
            Route::get(readiness)
        }
    }
}

/// Always `200 OK` with body `"ok"`. If the process can answer HTTP at all,
/// it is alive.
pub async fn liveness(_req: Request) -> Response {
    Response::text("ok")
}

/// `200 OK` with body `"ready"`.
pub async fn readiness(_req: Request) -> Response {
    Response::text("ready")
}
