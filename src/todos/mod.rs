//! The todos HTTP surface.
//!
//! | Method | Path         | Success                  |
//! |--------|--------------|--------------------------|
//! | GET    | `/`          | 200 greeting             |
//! | GET    | `/todos`     | 200 JSON array of todos  |
//! | GET    | `/todos/:id` | 200 JSON todo            |
//! | POST   | `/todos`     | 200 `OK`                 |
//! | DELETE | `/todos/:id` | 200 `OK`                 |

use std::sync::Arc;

use serde::Deserialize;
use tracing::info;

use crate::cache::CacheLayer;
use crate::context::Context;
use crate::database::{TodoId, TodoStore};
use crate::dispatch::ApiError;
use crate::router::{HandlerResult, RouteError, Router};
use crate::{Response, StatusCode};

pub const GREETING: &str = "Hello World!";

const TODO_NOT_FOUND: &str = "Todo not found";

// Request body for POST /todos.
#[derive(Debug, Deserialize)]
struct NewTodo {
    #[serde(default)]
    item: Option<String>,
}

/// Builds the route table for the todos API on top of `cache`.
///
/// # Errors
///
/// Only if one of the built-in patterns fails to compile.
pub fn routes<S: TodoStore>(cache: Arc<CacheLayer<S>>) -> Result<Router, RouteError> {
    let mut router = Router::new();

    router.get("/", |_ctx: Context| async { greet() })?;

    let c = Arc::clone(&cache);
    router.get("/todos", move |_ctx: Context| {
        let cache = Arc::clone(&c);
        async move { list(&cache).await }
    })?;

    let c = Arc::clone(&cache);
    router.get("/todos/:id", move |ctx: Context| {
        let cache = Arc::clone(&c);
        async move { show(&cache, &ctx).await }
    })?;

    let c = Arc::clone(&cache);
    router.post("/todos", move |ctx: Context| {
        let cache = Arc::clone(&c);
        async move { create(&cache, &ctx).await }
    })?;

    router.delete("/todos/:id", move |ctx: Context| {
        let cache = Arc::clone(&cache);
        async move { remove(&cache, &ctx).await }
    })?;

    Ok(router)
}

fn greet() -> HandlerResult {
    Ok(Response::text(StatusCode::Ok, GREETING))
}

async fn list<S: TodoStore>(cache: &CacheLayer<S>) -> HandlerResult {
    let todos = cache.list().await.map_err(ApiError::Read)?;
    Ok(Response::json(todos.as_slice())?)
}

async fn show<S: TodoStore>(cache: &CacheLayer<S>, ctx: &Context) -> HandlerResult {
    let Some(id) = todo_id(ctx) else {
        return Err(ApiError::NotFound(TODO_NOT_FOUND));
    };
    match cache.get_by_id(id).await.map_err(ApiError::Read)? {
        Some(todo) => Ok(Response::json(&todo)?),
        None => Err(ApiError::NotFound(TODO_NOT_FOUND)),
    }
}

async fn create<S: TodoStore>(cache: &CacheLayer<S>, ctx: &Context) -> HandlerResult {
    let body: NewTodo = ctx
        .json()
        .map_err(|e| ApiError::Validation(format!("Invalid JSON body: {e}")))?;

    let item = match body.item {
        Some(item) if !item.trim().is_empty() => item,
        _ => {
            return Err(ApiError::Validation(
                "Missing required field: item".to_owned(),
            ));
        }
    };

    let id = cache.insert(&item).await.map_err(ApiError::Write)?;
    info!(id, "todo created");
    Ok(Response::text(StatusCode::Ok, "OK"))
}

async fn remove<S: TodoStore>(cache: &CacheLayer<S>, ctx: &Context) -> HandlerResult {
    let Some(id) = todo_id(ctx) else {
        return Err(ApiError::NotFound(TODO_NOT_FOUND));
    };
    match cache.delete_by_id(id).await.map_err(ApiError::Write)? {
        0 => Err(ApiError::NotFound(TODO_NOT_FOUND)),
        _ => {
            info!(id, "todo deleted");
            Ok(Response::text(StatusCode::Ok, "OK"))
        }
    }
}

// Ids are numeric; anything else cannot name a stored todo.
fn todo_id(ctx: &Context) -> Option<TodoId> {
    ctx.params().get("id")?.parse().ok()
}
