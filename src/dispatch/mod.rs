//! Top-level request entry point.
//!
//! [`RequestDispatcher::handle`] resolves the route, runs the handler on its own
//! task and turns whatever comes back into a [`Response`]. Nothing a handler does,
//! panicking included, escapes past this point.

use std::any::Any;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, warn};

use crate::context::Context;
use crate::database::StoreError;
use crate::router::Router;
use crate::{Request, Response, StatusCode};

/// Body sent when no route matches.
pub const NOT_FOUND_BODY: &str = "Not Found";

/// Body sent for 500s when diagnostics are masked.
const INTERNAL_ERROR_BODY: &str = "Internal Server Error";

/// Failures a handler can report instead of building a response itself.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or missing input.
    #[error("{0}")]
    Validation(String),

    /// The request was well-formed but names nothing that exists.
    #[error("{0}")]
    NotFound(&'static str),

    /// The store failed while serving a read.
    #[error("failed to read todos: {0}")]
    Read(#[source] StoreError),

    /// The store rejected or failed a write.
    #[error("failed to write todo: {0}")]
    Write(#[source] StoreError),

    /// Anything else that should not have happened.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// The status this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Write(_) => StatusCode::BadRequest,
            Self::NotFound(_) => StatusCode::NotFound,
            Self::Read(_) | Self::Internal(_) => StatusCode::InternalServerError,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("failed to encode response: {err}"))
    }
}

/// Resolves requests against a [`Router`] and maps handler outcomes to responses.
pub struct RequestDispatcher {
    router: Arc<Router>,
    expose_diagnostics: bool,
}

impl RequestDispatcher {
    /// A dispatcher that includes failure text in 500 bodies.
    pub fn new(router: Router) -> Self {
        Self {
            router: Arc::new(router),
            expose_diagnostics: true,
        }
    }

    /// Whether 500 bodies carry the failure text (`true`) or a fixed message.
    #[must_use]
    pub fn expose_diagnostics(mut self, expose: bool) -> Self {
        self.expose_diagnostics = expose;
        self
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Produce the response for `request`.
    pub async fn handle(&self, request: Request) -> Response {
        let method = request.method().clone();
        let path = request.path().to_owned();

        let Some((handler, params)) = self.router.resolve(&method, &path) else {
            debug!(%method, %path, "no route");
            return Response::text(StatusCode::NotFound, NOT_FOUND_BODY);
        };

        let ctx = Context::new(request, params);
        let outcome = match tokio::spawn(handler(ctx)).await {
            Ok(result) => result,
            Err(join_err) if join_err.is_panic() => {
                let message = panic_message(join_err.into_panic());
                error!(%method, %path, %message, "handler panicked");
                Err(ApiError::Internal(message))
            }
            Err(join_err) => Err(ApiError::Internal(join_err.to_string())),
        };

        match outcome {
            Ok(response) => {
                debug!(%method, %path, status = response.status().as_u16(), "handled");
                response
            }
            Err(err) => self.error_response(&method, &path, err),
        }
    }

    fn error_response(&self, method: &crate::Method, path: &str, err: ApiError) -> Response {
        let status = err.status();
        if status == StatusCode::InternalServerError {
            error!(%method, path, error = %err, "request failed");
            let body = if self.expose_diagnostics {
                err.to_string()
            } else {
                INTERNAL_ERROR_BODY.to_owned()
            };
            return Response::text(status, body);
        }

        warn!(%method, path, status = status.as_u16(), error = %err, "request rejected");
        Response::text(status, err.to_string())
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Method;
    use crate::router::HandlerResult;

    async fn ok(_ctx: Context) -> HandlerResult {
        Ok(Response::text(StatusCode::Ok, "fine"))
    }

    async fn invalid(_ctx: Context) -> HandlerResult {
        Err(ApiError::Validation("item is required".to_owned()))
    }

    async fn missing(_ctx: Context) -> HandlerResult {
        Err(ApiError::NotFound("Todo not found"))
    }

    async fn read_fails(_ctx: Context) -> HandlerResult {
        Err(ApiError::Read(StoreError::Unavailable("db down".to_owned())))
    }

    async fn write_fails(_ctx: Context) -> HandlerResult {
        Err(ApiError::Write(StoreError::Constraint("too long".to_owned())))
    }

    async fn panics(_ctx: Context) -> HandlerResult {
        panic!("boom")
    }

    async fn echo(ctx: Context) -> HandlerResult {
        let word = ctx.params().get("word").unwrap_or_default().to_owned();
        Ok(Response::text(StatusCode::Ok, word))
    }

    fn dispatcher() -> RequestDispatcher {
        let mut router = Router::new();
        router
            .get("/ok", ok)
            .and_then(|r| r.get("/invalid", invalid))
            .and_then(|r| r.get("/missing", missing))
            .and_then(|r| r.get("/read", read_fails))
            .and_then(|r| r.get("/write", write_fails))
            .and_then(|r| r.get("/panic", panics))
            .and_then(|r| r.get("/echo/:word", echo))
            .unwrap();
        RequestDispatcher::new(router)
    }

    async fn get(d: &RequestDispatcher, target: &str) -> Response {
        d.handle(Request::new(Method::Get, target, "")).await
    }

    #[tokio::test]
    async fn unmatched_route_is_generic_404() {
        let d = dispatcher();
        for method in [Method::Get, Method::Post, Method::Delete, Method::Custom("BREW".into())] {
            let res = d.handle(Request::new(method, "/unknown", "")).await;
            assert_eq!(res.status(), StatusCode::NotFound);
            assert_eq!(res.payload_text(), NOT_FOUND_BODY);
        }
    }

    #[tokio::test]
    async fn wrong_method_is_404_not_405() {
        let res = dispatcher().handle(Request::new(Method::Post, "/ok", "")).await;
        assert_eq!(res.status(), StatusCode::NotFound);
    }

    #[tokio::test]
    async fn query_string_is_ignored_for_matching() {
        let res = get(&dispatcher(), "/echo/hi?x=1").await;
        assert_eq!(res.status(), StatusCode::Ok);
        assert_eq!(res.payload_text(), "hi");
    }

    #[tokio::test]
    async fn error_kinds_map_to_statuses() {
        let d = dispatcher();
        let cases = [
            ("/ok", StatusCode::Ok),
            ("/invalid", StatusCode::BadRequest),
            ("/missing", StatusCode::NotFound),
            ("/read", StatusCode::InternalServerError),
            ("/write", StatusCode::BadRequest),
        ];
        for (path, status) in cases {
            assert_eq!(get(&d, path).await.status(), status, "{path}");
        }
        assert_eq!(get(&d, "/invalid").await.payload_text(), "item is required");
        assert_eq!(get(&d, "/missing").await.payload_text(), "Todo not found");
    }

    #[tokio::test]
    async fn internal_errors_expose_diagnostics_by_default() {
        let res = get(&dispatcher(), "/read").await;
        assert!(res.payload_text().contains("db down"));
    }

    #[tokio::test]
    async fn diagnostics_can_be_masked() {
        let d = dispatcher().expose_diagnostics(false);
        let res = get(&d, "/read").await;
        assert_eq!(res.status(), StatusCode::InternalServerError);
        assert_eq!(res.payload_text(), INTERNAL_ERROR_BODY);
    }

    #[tokio::test]
    async fn handler_panic_becomes_500() {
        let res = get(&dispatcher(), "/panic").await;
        assert_eq!(res.status(), StatusCode::InternalServerError);
        assert!(res.payload_text().contains("boom"));
    }
}
