//! Radix-tree request router and the [`Routes`] registration interface.
//!
//! One matchit tree per HTTP method. O(path-length) lookup. Anything that
//! accepts registrations implements [`Routes`]: the [`Router`] itself and
//! the prefixed [`Group`]s carved out of it. [`Service::bind`] and install
//! hooks only ever talk to that trait.
//!
//! [`Service::bind`]: crate::Service::bind

use std::collections::HashMap;
use std::sync::Arc;

use http::Method;
use matchit::Router as MatchitRouter;

use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::verb::Verb;

/// A table that route registrations can be made against.
///
/// Implementors provide [`handle`](Routes::handle), the single-method
/// insert; the verb-level calls are derived from it.
pub trait Routes {
    /// Registers `handler` for exactly one HTTP method.
    fn handle(&mut self, method: Method, path: &str, handler: BoxedHandler) -> Result<(), Error>;

    /// Registers `handler` under every method `verb` covers.
    ///
    /// The default stops at the first method the table refuses, leaving the
    /// methods before it registered. [`Router`] and [`Group`] override it so
    /// that a refused verb registers nothing.
    fn try_route(&mut self, verb: Verb, path: &str, handler: BoxedHandler) -> Result<(), Error> {
        for method in verb.methods() {
            self.handle(method, path, Arc::clone(&handler))?;
        }
        Ok(())
    }

    /// Registers `handler` under `verb`.
    ///
    /// # Panics
    ///
    /// Panics if the path is malformed or conflicts with an existing route.
    fn route(&mut self, verb: Verb, path: &str, handler: impl Handler) -> &mut Self
    where
        Self: Sized,
    {
        if let Err(e) = self.try_route(verb, path, handler.into_boxed_handler()) {
            panic!("{e}");
        }
        self
    }

    fn get(&mut self, path: &str, handler: impl Handler) -> &mut Self where Self: Sized {
        self.route(Verb::Get, path, handler)
    }

    fn delete(&mut self, path: &str, handler: impl Handler) -> &mut Self where Self: Sized {
        self.route(Verb::Delete, path, handler)
    }

    fn put(&mut self, path: &str, handler: impl Handler) -> &mut Self where Self: Sized {
        self.route(Verb::Put, path, handler)
    }

    fn patch(&mut self, path: &str, handler: impl Handler) -> &mut Self where Self: Sized {
        self.route(Verb::Patch, path, handler)
    }

    fn post(&mut self, path: &str, handler: impl Handler) -> &mut Self where Self: Sized {
        self.route(Verb::Post, path, handler)
    }

    fn options(&mut self, path: &str, handler: impl Handler) -> &mut Self where Self: Sized {
        self.route(Verb::Options, path, handler)
    }

    /// Registers `handler` under every common HTTP method.
    fn any(&mut self, path: &str, handler: impl Handler) -> &mut Self where Self: Sized {
        self.route(Verb::Any, path, handler)
    }

    fn head(&mut self, path: &str, handler: impl Handler) -> &mut Self where Self: Sized {
        self.route(Verb::Head, path, handler)
    }
}

/// The application router.
///
/// Paths are rooted: `get_status` and `/get_status` register the same route.
/// Path parameters use `{name}` syntax and are read back with
/// [`Request::param`](crate::Request::param).
///
/// ```rust
/// use routekit::{Request, Response, Router, Routes, Verb};
///
/// async fn get_user(req: Request) -> Response {
///     Response::text(req.param("id").unwrap_or_default().to_owned())
/// }
/// async fn list_users(_: Request) -> &'static str { "[]" }
///
/// let mut router = Router::new().on(Verb::Get, "/users/{id}", get_user);
/// router.group("/v2").get("users", list_users);
/// ```
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a verb + path pair. Returns `self` for chaining.
    ///
    /// # Panics
    ///
    /// Panics if the path is malformed or conflicts with an existing route.
    pub fn on(mut self, verb: Verb, path: &str, handler: impl Handler) -> Self {
        self.route(verb, path, handler);
        self
    }

    /// A view of this router that prefixes every registration with `prefix`.
    pub fn group(&mut self, prefix: &str) -> Group<'_> {
        Group { prefix: join_paths("", prefix), router: self }
    }

    /// Whether a request for `method` + `path` would reach a handler.
    pub fn matches(&self, method: &Method, path: &str) -> bool {
        self.lookup(method, path).is_some()
    }

    pub(crate) fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

impl Routes for Router {
    fn handle(&mut self, method: Method, path: &str, handler: BoxedHandler) -> Result<(), Error> {
        let path = join_paths("", path);
        self.routes
            .entry(method)
            .or_default()
            .insert(path.clone(), handler)
            .map_err(|source| Error::Route { path, source })
    }

    /// All or nothing: every method's insert is tried on a copy of its tree,
    /// and the copies replace the live trees only once all of them succeed.
    fn try_route(&mut self, verb: Verb, path: &str, handler: BoxedHandler) -> Result<(), Error> {
        let path = join_paths("", path);
        let mut staged = Vec::new();
        for method in verb.methods() {
            let mut tree = self.routes.get(&method).cloned().unwrap_or_default();
            if let Err(source) = tree.insert(path.clone(), Arc::clone(&handler)) {
                return Err(Error::Route { path, source });
            }
            staged.push((method, tree));
        }
        self.routes.extend(staged);
        Ok(())
    }
}

/// A route group: registrations made through it land on the parent router
/// under the group's prefix.
pub struct Group<'r> {
    router: &'r mut Router,
    prefix: String,
}

impl Group<'_> {
    pub fn prefix(&self) -> &str { &self.prefix }

    /// A nested group; its prefix is appended to this group's.
    pub fn group(&mut self, prefix: &str) -> Group<'_> {
        Group { prefix: join_paths(&self.prefix, prefix), router: &mut *self.router }
    }
}

impl Routes for Group<'_> {
    fn handle(&mut self, method: Method, path: &str, handler: BoxedHandler) -> Result<(), Error> {
        self.router.handle(method, &join_paths(&self.prefix, path), handler)
    }

    fn try_route(&mut self, verb: Verb, path: &str, handler: BoxedHandler) -> Result<(), Error> {
        self.router.try_route(verb, &join_paths(&self.prefix, path), handler)
    }
}

/// Joins `prefix` and `path` into one rooted path with single separators.
/// A trailing slash on `path` is kept.
fn join_paths(prefix: &str, path: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let path = path.trim_start_matches('/');
    let mut out = String::with_capacity(prefix.len() + path.len() + 2);
    out.push('/');
    out.push_str(prefix);
    if !prefix.is_empty() && !path.is_empty() {
        out.push('/');
    }
    out.push_str(path);
    out
}
