//! Request-handler callables and their type erasure.
//!
//! Route methods hand back handlers of many different concrete types, and
//! the router keeps all of them in one table per HTTP method. The handler is
//! erased once, when a [`Route`](crate::Route) is built:
//!
//! ```text
//! async fn status(req: Request) -> Response { … }
//!        ↓ Route::get(status)
//! status.into_boxed_handler()        ← blanket impl below
//!        ↓
//! Arc<FnHandler(status)>             ← stored as BoxedHandler
//!        ↓
//! handler.call(req)                  ← once per request, one vtable call
//! ```
//!
//! `BoxedHandler` is an `Arc`, so the same handler can be bound under
//! several methods (`Verb::Any`) or on several routers without copying.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A boxed future resolving to the handler's [`Response`].
#[doc(hidden)]
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Object-safe dispatch interface behind [`BoxedHandler`].
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A type-erased request handler, shared between routes and connections.
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for every valid route handler.
///
/// Satisfied automatically by any function or closure shaped like
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// Sealed: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}
