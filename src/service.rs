//! Route registration from a handler object's declared methods.
//!
//! A handler object is any type implementing [`Routable`]: it lists its
//! methods, and every public, argument-free one returns a [`Route`], the
//! verb plus the request handler. [`Service::new`] calls each such method
//! once, derives the path from the method name with
//! [`camel_to_snake`](crate::camel_to_snake), and [`Service::bind`] installs
//! the result on any [`Routes`] table.
//!
//! The [`routes!`](crate::routes) macro writes the `Routable` impl for you:
//!
//! ```rust
//! use routekit::{routes, Request, Route, Router, Service};
//!
//! struct Users;
//!
//! async fn list(_: Request) -> &'static str { "[]" }
//! async fn create(_: Request) -> &'static str { "created" }
//!
//! routes! {
//!     impl Users {
//!         pub fn list_users(&self) -> Route { Route::get(list) }
//!         pub fn create_user(&self) -> Route { Route::post(create) }
//!     }
//! }
//!
//! let mut router = Router::new();
//! Service::new(Users, false).bind(&mut router);
//! assert!(router.matches(&http::Method::GET, "/list_users"));
//! ```

use std::any::type_name;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::case::camel_to_snake;
use crate::handler::{BoxedHandler, Handler};
use crate::router::Routes;
use crate::verb::Verb;

/// What a route method returns: the verb to bind under and the handler.
#[derive(Clone)]
pub struct Route {
    verb: Verb,
    handler: BoxedHandler,
}

impl Route {
    pub fn new(verb: Verb, handler: impl Handler) -> Self {
        Self { verb, handler: handler.into_boxed_handler() }
    }

    pub fn get(handler: impl Handler) -> Self { Self::new(Verb::Get, handler) }
    pub fn delete(handler: impl Handler) -> Self { Self::new(Verb::Delete, handler) }
    pub fn put(handler: impl Handler) -> Self { Self::new(Verb::Put, handler) }
    pub fn patch(handler: impl Handler) -> Self { Self::new(Verb::Patch, handler) }
    pub fn post(handler: impl Handler) -> Self { Self::new(Verb::Post, handler) }
    pub fn options(handler: impl Handler) -> Self { Self::new(Verb::Options, handler) }
    pub fn any(handler: impl Handler) -> Self { Self::new(Verb::Any, handler) }
    pub fn head(handler: impl Handler) -> Self { Self::new(Verb::Head, handler) }

    pub fn verb(&self) -> Verb { self.verb }
}

/// One method declared on a handler type `H`.
pub struct MethodDecl<H> {
    name: &'static str,
    public: bool,
    arity: usize,
    call: Option<fn(&H) -> Route>,
}

impl<H> MethodDecl<H> {
    /// An argument-free method producing a [`Route`].
    pub fn route(name: &'static str, public: bool, call: fn(&H) -> Route) -> Self {
        Self { name, public, arity: 0, call: Some(call) }
    }

    /// A method taking `arity` arguments besides the receiver. Never routed.
    pub fn with_args(name: &'static str, public: bool, arity: usize) -> Self {
        Self { name, public, arity, call: None }
    }

    /// A method that is not `pub`. Never routed, whatever its signature.
    pub fn unexported(name: &'static str) -> Self {
        Self { name, public: false, arity: 0, call: None }
    }

    pub fn name(&self) -> &'static str { self.name }
}

/// A handler object: a type that can list its route methods.
///
/// Usually implemented through [`routes!`](crate::routes); write it by
/// hand when the method list is built some other way.
pub trait Routable: Sized {
    /// Every declared method, in declaration order.
    fn methods() -> Vec<MethodDecl<Self>>;
}

/// Why a declared method did not become a route.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SkipReason {
    /// The method is not `pub`.
    NotExported,
    /// The method takes `count` arguments besides `&self`.
    TakesArguments { count: usize },
}

/// A declared method that was left out of the route table.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Skip {
    pub method: &'static str,
    pub reason: SkipReason,
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason {
            SkipReason::NotExported => write!(f, "fn: {} needs to be exported", self.method),
            SkipReason::TakesArguments { count } => {
                write!(f, "fn: {} ins needs to be empty, takes {count}", self.method)
            }
        }
    }
}

/// A resolved route: verb, rooted-relative path and handler.
#[derive(Clone)]
pub struct RouteEntry {
    pub verb: Verb,
    pub path: String,
    pub handler: BoxedHandler,
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("verb", &self.verb)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// The route table built from one handler object. Fixed once constructed.
pub struct Service {
    name: String,
    methods: HashMap<String, RouteEntry>,
    skipped: Vec<Skip>,
}

impl Service {
    /// Builds the route table for `handler`.
    ///
    /// Each public, argument-free method is called exactly once, here.
    /// Everything else is recorded in [`skipped`](Service::skipped) and,
    /// when `verbose` is set, logged.
    pub fn new<H: Routable>(handler: H, verbose: bool) -> Self {
        let name = short_type_name::<H>();
        let mut methods = HashMap::new();
        let mut skipped = Vec::new();

        for decl in H::methods() {
            let call = match decl.call {
                _ if !decl.public => Err(SkipReason::NotExported),
                Some(call) if decl.arity == 0 => Ok(call),
                _ => Err(SkipReason::TakesArguments { count: decl.arity }),
            };
            let call = match call {
                Ok(call) => call,
                Err(reason) => {
                    let skip = Skip { method: decl.name, reason };
                    if verbose {
                        info!(handler = %name, "handler: {name} {skip}");
                    }
                    skipped.push(skip);
                    continue;
                }
            };

            let Route { verb, handler: fn_handler } = call(&handler);
            let path = camel_to_snake(decl.name);
            methods.insert(decl.name.to_owned(), RouteEntry { verb, path, handler: fn_handler });
        }

        Self { name, methods, skipped }
    }

    pub fn name(&self) -> &str { &self.name }

    /// The route table, keyed by method name.
    pub fn methods(&self) -> &HashMap<String, RouteEntry> { &self.methods }

    /// Declared methods that were not turned into routes, in declaration order.
    pub fn skipped(&self) -> &[Skip] { &self.skipped }

    /// Registers every entry on `routes`, one verb-level call per entry.
    ///
    /// An entry the table refuses (malformed path, or one that collides
    /// with an existing route) is logged and skipped; the rest still bind.
    /// Order across entries is unspecified.
    pub fn bind<R: Routes>(&self, routes: &mut R) {
        for (method, entry) in &self.methods {
            if let Err(e) = routes.try_route(entry.verb, &entry.path, Arc::clone(&entry.handler)) {
                warn!(
                    service = %self.name,
                    method = %method,
                    verb = %entry.verb,
                    "service name: {} method: {} not registered: {e}",
                    self.name,
                    method,
                );
            }
        }
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.name)
            .field("methods", &self.methods)
            .field("skipped", &self.skipped)
            .finish()
    }
}

/// `my_app::api::Users` → `Users`.
fn short_type_name<T>() -> String {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_owned()
}

/// Declares a handler object's methods and implements [`Routable`] for it.
///
/// The block is emitted unchanged as an inherent `impl`. Only `pub`
/// argument-free methods become routes, under the path
/// [`camel_to_snake`](crate::camel_to_snake) derives from their name, and
/// those must return [`Route`] (checked at compile time). Methods that are
/// not `pub` are listed as unexported whatever their signature, and are
/// never called.
///
/// # Accepted method shape
///
/// ```text
/// #[attr]*  pub fn Name(&self) -> Route { .. }           // a route
/// #[attr]*  pub fn name(&self, a: A, b: B) -> T { .. }   // skipped: takes arguments
/// #[attr]*  pub(..) fn name(..) -> T { .. }              // skipped: not exported
/// #[attr]*  fn name(..) -> T { .. }                      // skipped: not exported
/// ```
///
/// A `pub` method must take `&self` and return a value; `&mut self`,
/// `async fn`, generic parameters and `where` clauses are rejected with a
/// compile error for `pub` methods. Put such helpers in a separate `impl`
/// block, or make them private.
///
/// ```rust
/// use routekit::{routes, Request, Route, Service, SkipReason};
///
/// struct Orders { region: &'static str }
///
/// async fn list(_: Request) -> &'static str { "[]" }
///
/// routes! {
///     impl Orders {
///         #[allow(non_snake_case)]
///         pub fn ListOrders(&self) -> Route { Route::get(list) }
///
///         fn audit(&self) -> usize { self.region.len() }
///
///         pub fn by_region(&self, region: &str) -> bool { self.region == region }
///     }
/// }
///
/// let service = Service::new(Orders { region: "eu" }, false);
/// assert_eq!(service.methods()["ListOrders"].path, "list_orders");
/// assert_eq!(service.skipped()[0].reason, SkipReason::NotExported);
/// assert_eq!(service.skipped()[1].reason, SkipReason::TakesArguments { count: 1 });
/// ```
#[macro_export]
macro_rules! routes {
    (@collect $ty:ident $decls:ident) => {};
    (
        @collect $ty:ident $decls:ident
        $(#[$meta:meta])* pub fn $name:ident(&self) -> $ret:ty $body:block
        $($rest:tt)*
    ) => {
        $decls.push($crate::MethodDecl::<$ty>::route(
            ::core::stringify!($name),
            true,
            |this: &$ty| this.$name(),
        ));
        $crate::routes!(@collect $ty $decls $($rest)*);
    };
    (
        @collect $ty:ident $decls:ident
        $(#[$meta:meta])* pub fn $name:ident(&self, $($arg:ident: $arg_ty:ty),+ $(,)?)
            $(-> $ret:ty)? $body:block
        $($rest:tt)*
    ) => {
        $decls.push($crate::MethodDecl::<$ty>::with_args(
            ::core::stringify!($name),
            true,
            [$(::core::stringify!($arg)),+].len(),
        ));
        $crate::routes!(@collect $ty $decls $($rest)*);
    };
    (
        @collect $ty:ident $decls:ident
        $(#[$meta:meta])* pub($($scope:tt)+) fn $name:ident($($params:tt)*)
            $(-> $ret:ty)? $body:block
        $($rest:tt)*
    ) => {
        $decls.push($crate::MethodDecl::<$ty>::unexported(::core::stringify!($name)));
        $crate::routes!(@collect $ty $decls $($rest)*);
    };
    (@collect $ty:ident $decls:ident $(#[$meta:meta])* pub $($rest:tt)*) => {
        ::core::compile_error!(::core::concat!(
            "routes!: unsupported `pub` method in `impl ", ::core::stringify!($ty), "`; ",
            "expected `pub fn name(&self) -> Route { .. }` or ",
            "`pub fn name(&self, arg: Type, ..) -> Type { .. }` ",
            "(no `&mut self`, `async`, generics or `where` clauses)",
        ));
    };
    (
        @collect $ty:ident $decls:ident
        $(#[$meta:meta])* fn $name:ident($($params:tt)*) $(-> $ret:ty)? $body:block
        $($rest:tt)*
    ) => {
        $decls.push($crate::MethodDecl::<$ty>::unexported(::core::stringify!($name)));
        $crate::routes!(@collect $ty $decls $($rest)*);
    };
    (@collect $ty:ident $decls:ident $($rest:tt)*) => {
        ::core::compile_error!(::core::concat!(
            "routes!: unsupported item in `impl ", ::core::stringify!($ty), "`; ",
            "only `fn` items with a body are accepted",
        ));
    };
    (impl $ty:ident { $($items:tt)* }) => {
        impl $ty {
            $($items)*
        }

        impl $crate::Routable for $ty {
            fn methods() -> ::std::vec::Vec<$crate::MethodDecl<Self>> {
                #[allow(unused_mut)]
                let mut decls = ::std::vec::Vec::new();
                $crate::routes!(@collect $ty decls $($items)*);
                decls
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::Error;
    use crate::request::Request;
    use http::Method;

    async fn ok(_: Request) -> &'static str { "ok" }

    #[derive(Default)]
    struct Counted {
        calls: AtomicUsize,
    }

    routes! {
        impl Counted {
            #[allow(non_snake_case)]
            pub fn GetUser(&self) -> Route {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Route::get(ok)
            }

            pub fn list_all_items(&self) -> Route {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Route::post(ok)
            }

            #[allow(dead_code)]
            fn hidden(&self) -> Route {
                Route::get(ok)
            }

            #[allow(dead_code)]
            pub(crate) fn crate_only(&self) -> Route {
                Route::get(ok)
            }

            #[allow(dead_code)]
            fn weight(&self) -> u32 {
                self.calls.fetch_add(1, Ordering::SeqCst);
                7
            }

            pub fn lookup(&self, id: u32, name: &str) -> String {
                format!("{id}:{name}")
            }
        }
    }

    #[test]
    fn keeps_exported_zero_argument_methods() {
        let service = Service::new(Counted::default(), false);
        assert_eq!(service.name(), "Counted");

        let mut names: Vec<_> = service.methods().keys().cloned().collect();
        names.sort();
        assert_eq!(names, ["GetUser", "list_all_items"]);

        let entry = &service.methods()["GetUser"];
        assert_eq!(entry.verb, Verb::Get);
        assert_eq!(entry.path, "get_user");
        assert_eq!(service.methods()["list_all_items"].verb, Verb::Post);
    }

    #[test]
    fn records_skips_in_declaration_order() {
        let service = Service::new(Counted::default(), true);
        assert_eq!(
            service.skipped(),
            [
                Skip { method: "hidden", reason: SkipReason::NotExported },
                Skip { method: "crate_only", reason: SkipReason::NotExported },
                Skip { method: "weight", reason: SkipReason::NotExported },
                Skip { method: "lookup", reason: SkipReason::TakesArguments { count: 2 } },
            ]
        );
    }

    struct Helpers {
        calls: Arc<AtomicUsize>,
    }

    routes! {
        impl Helpers {
            pub fn status(&self) -> Route {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Route::get(ok)
            }

            #[allow(dead_code)]
            fn helper(&self) -> u32 {
                self.calls.fetch_add(1, Ordering::SeqCst);
                7
            }

            #[allow(dead_code)]
            pub(crate) fn size(&self) -> Option<usize> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                None
            }
        }
    }

    #[test]
    fn unexported_methods_keep_any_return_type_and_are_never_called() {
        let calls = Arc::new(AtomicUsize::new(0));
        let service = Service::new(Helpers { calls: Arc::clone(&calls) }, false);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.methods().len(), 1);
        assert_eq!(
            service.skipped(),
            [
                Skip { method: "helper", reason: SkipReason::NotExported },
                Skip { method: "size", reason: SkipReason::NotExported },
            ]
        );
    }

    #[test]
    fn route_methods_run_once_at_construction() {
        struct Tally(Arc<Counted>);
        let shared = Arc::new(Counted::default());
        impl Routable for Tally {
            fn methods() -> Vec<MethodDecl<Self>> {
                vec![MethodDecl::route("GetUser", true, |t: &Tally| t.0.GetUser())]
            }
        }

        let service = Service::new(Tally(Arc::clone(&shared)), false);
        assert_eq!(shared.calls.load(Ordering::SeqCst), 1);

        let mut router = crate::Router::new();
        service.bind(&mut router);
        service.bind(&mut crate::Router::new());
        assert_eq!(shared.calls.load(Ordering::SeqCst), 1);
        assert!(router.matches(&Method::GET, "/get_user"));
    }

    #[test]
    fn short_type_name_strips_paths_and_generics() {
        assert_eq!(short_type_name::<Counted>(), "Counted");
        assert_eq!(short_type_name::<Vec<String>>(), "Vec");
    }

    /// Records verb-level calls instead of routing.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<(Verb, String)>,
        reject: Option<&'static str>,
    }

    impl Routes for Recorder {
        fn handle(&mut self, _: Method, _: &str, _: BoxedHandler) -> Result<(), Error> {
            unreachable!("bind goes through try_route")
        }

        fn try_route(&mut self, verb: Verb, path: &str, _: BoxedHandler) -> Result<(), Error> {
            if self.reject == Some(path) {
                let mut taken = matchit::Router::new();
                taken.insert("/taken", ()).unwrap();
                let source = taken.insert("/taken", ()).unwrap_err();
                return Err(Error::Route { path: path.to_owned(), source });
            }
            self.calls.push((verb, path.to_owned()));
            Ok(())
        }
    }

    struct EveryVerb;

    routes! {
        impl EveryVerb {
            pub fn a_get(&self) -> Route { Route::get(ok) }
            pub fn a_delete(&self) -> Route { Route::delete(ok) }
            pub fn a_put(&self) -> Route { Route::put(ok) }
            pub fn a_patch(&self) -> Route { Route::patch(ok) }
            pub fn a_post(&self) -> Route { Route::post(ok) }
            pub fn a_options(&self) -> Route { Route::options(ok) }
            pub fn a_any(&self) -> Route { Route::any(ok) }
            pub fn a_head(&self) -> Route { Route::head(ok) }
        }
    }

    #[test]
    fn bind_issues_one_call_per_entry() {
        let mut recorder = Recorder::default();
        Service::new(EveryVerb, false).bind(&mut recorder);

        recorder.calls.sort_by(|a, b| a.1.cmp(&b.1));
        assert_eq!(
            recorder.calls,
            [
                (Verb::Any, "a_any".to_owned()),
                (Verb::Delete, "a_delete".to_owned()),
                (Verb::Get, "a_get".to_owned()),
                (Verb::Head, "a_head".to_owned()),
                (Verb::Options, "a_options".to_owned()),
                (Verb::Patch, "a_patch".to_owned()),
                (Verb::Post, "a_post".to_owned()),
                (Verb::Put, "a_put".to_owned()),
            ]
        );
    }

    #[test]
    fn rejected_entry_is_skipped_and_the_rest_bind() {
        let mut recorder = Recorder { reject: Some("a_put"), ..Default::default() };
        Service::new(EveryVerb, false).bind(&mut recorder);

        assert_eq!(recorder.calls.len(), 7);
        assert!(recorder.calls.iter().all(|(_, path)| path != "a_put"));
    }
}
