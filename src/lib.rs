//! # todos-service
//!
//! A small async HTTP/1.1 service exposing CRUD over a single "todos" resource.
//!
//! Requests flow through four pieces:
//!
//! 1. [`router::PathMatcher`] compiles `/todos/:id`-style patterns.
//! 2. [`router::Router`] resolves method + path to a handler, first match wins.
//! 3. [`cache::CacheLayer`] memoizes store reads and invalidates them on writes.
//! 4. [`dispatch::RequestDispatcher`] runs the handler and maps its outcome to a response.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use todos_service::{cache::CacheLayer, database::MemoryStore, dispatch::RequestDispatcher};
//! use todos_service::{server::Server, todos};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache = Arc::new(CacheLayer::new(MemoryStore::new()));
//!     let dispatcher = Arc::new(RequestDispatcher::new(todos::routes(cache)?));
//!     Server::bind("127.0.0.1:3000").await?.serve(dispatcher).await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod database;
pub mod dispatch;
pub mod http;
pub mod router;
pub mod server;
pub mod todos;

pub use http::{Headers, Method, Request, Response, StatusCode};
pub use server::{Server, ServerError};
