//! Request routing: map an HTTP method and URL path to a handler.
//!
//! [`Router`] keeps an ordered list of routes. Each route pairs a [`Method`] with a
//! [`Matcher`] (normally a compiled [`PathMatcher`]) and a type-erased handler.
//! Resolution walks the list in registration order and the first route whose
//! method and matcher both accept the request wins.
//!
//! A path that matches no pattern and a path that matches only under a different
//! method both resolve to `None`; callers answer both with 404.

mod matcher;

use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;

pub use matcher::{Matcher, PathMatcher};

use crate::context::{Context, PathParams};
use crate::dispatch::ApiError;
use crate::{Method, Response};

/// What a handler produces: a response, or an error the dispatcher maps to one.
pub type HandlerResult = Result<Response, ApiError>;

/// Boxed future returned by every stored handler.
pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send + 'static>>;

/// Type-erased, cheaply cloneable async handler.
///
/// Handlers are stored behind `Arc<dyn Fn(…)>` so a resolved handler can be moved
/// onto its own task without borrowing the router.
pub type Handler = Arc<dyn Fn(Context) -> HandlerFuture + Send + Sync + 'static>;

/// Errors raised while registering a route. These are startup configuration errors.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error("route pattern `{pattern}` must start with `/`")]
    NotAbsolute { pattern: String },

    #[error("route pattern `{pattern}` has a parameter without a name")]
    EmptyParam { pattern: String },

    #[error("route pattern `{pattern}` declares parameter `{name}` more than once")]
    DuplicateParam { pattern: String, name: String },
}

/// Conversion trait for async handler functions.
///
/// Any `Fn(Context) -> impl Future<Output = HandlerResult> + Send` that is also
/// `Send + Sync + 'static` implements this trait through the blanket impl below.
pub trait IntoHandler: Send + Sync + 'static {
    /// Call the handler with the given context, boxing the returned future.
    fn call(&self, ctx: Context) -> HandlerFuture;
}

impl<T, F> IntoHandler for T
where
    T: Fn(Context) -> F + Send + Sync + 'static,
    F: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, ctx: Context) -> HandlerFuture {
        Box::pin((self)(ctx))
    }
}

// A single registered route binding a method + matcher to a handler.
struct Route {
    method: Method,
    matcher: Box<dyn Matcher>,
    handler: Handler,
}

/// Ordered route table with first-match-wins resolution.
///
/// # Examples
///
/// ```
/// use todos_service::{Method, Response, StatusCode};
/// use todos_service::context::Context;
/// use todos_service::dispatch::ApiError;
/// use todos_service::router::Router;
///
/// let mut router = Router::new();
/// router
///     .get("/todos/:id", |ctx: Context| async move {
///         let id = ctx.params().get("id").unwrap_or_default().to_owned();
///         Ok::<_, ApiError>(Response::text(StatusCode::Ok, id))
///     })
///     .unwrap();
///
/// let (_handler, params) = router.resolve(&Method::Get, "/todos/7").unwrap();
/// assert_eq!(params.get("id"), Some("7"));
/// assert!(router.resolve(&Method::Post, "/todos/7").is_none());
/// ```
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Compile `pattern` and append a route for `method`.
    ///
    /// # Errors
    ///
    /// Returns a [`RouteError`] when the pattern does not compile; the route table
    /// is left unchanged.
    pub fn route(
        &mut self,
        method: Method,
        pattern: &str,
        handler: impl IntoHandler,
    ) -> Result<&mut Self, RouteError> {
        let matcher = PathMatcher::compile(pattern)?;
        Ok(self.route_with(method, matcher, handler))
    }

    /// Append a route using an already-built matcher.
    pub fn route_with(
        &mut self,
        method: Method,
        matcher: impl Matcher,
        handler: impl IntoHandler,
    ) -> &mut Self {
        let handler: Handler = Arc::new(move |ctx: Context| handler.call(ctx));
        self.routes.push(Route {
            method,
            matcher: Box::new(matcher),
            handler,
        });
        self
    }

    pub fn get(&mut self, pattern: &str, handler: impl IntoHandler) -> Result<&mut Self, RouteError> {
        self.route(Method::Get, pattern, handler)
    }

    pub fn post(&mut self, pattern: &str, handler: impl IntoHandler) -> Result<&mut Self, RouteError> {
        self.route(Method::Post, pattern, handler)
    }

    pub fn put(&mut self, pattern: &str, handler: impl IntoHandler) -> Result<&mut Self, RouteError> {
        self.route(Method::Put, pattern, handler)
    }

    pub fn delete(&mut self, pattern: &str, handler: impl IntoHandler) -> Result<&mut Self, RouteError> {
        self.route(Method::Delete, pattern, handler)
    }

    pub fn patch(&mut self, pattern: &str, handler: impl IntoHandler) -> Result<&mut Self, RouteError> {
        self.route(Method::Patch, pattern, handler)
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find the first route accepting `method` and `path`.
    ///
    /// `path` must already have its query string removed.
    pub fn resolve(&self, method: &Method, path: &str) -> Option<(Handler, PathParams)> {
        self.routes
            .iter()
            .filter(|route| &route.method == method)
            .find_map(|route| {
                route
                    .matcher
                    .matches(path)
                    .map(|params| (Arc::clone(&route.handler), params))
            })
    }
}
