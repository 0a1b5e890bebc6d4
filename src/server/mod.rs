//! Async TCP server using Tokio.
//!
//! Accepts TCP connections and feeds each HTTP/1.1 request to a handler function,
//! one task per connection. Persistent connections are kept open until the peer
//! closes them or asks for `Connection: close`.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{Buf, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::dispatch::RequestDispatcher;
use crate::http::{
    StatusCode,
    request::{Request, RequestError},
    response::Response,
};

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Largest request, head plus declared body, accepted on a connection (1 MiB).
const MAX_REQUEST_SIZE: usize = 1024 * 1024;

/// Initial read buffer capacity per connection.
const INITIAL_BUF_SIZE: usize = 4096;

/// A bound listener waiting to serve requests.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use todos_service::{cache::CacheLayer, database::MemoryStore, dispatch::RequestDispatcher};
/// use todos_service::{server::Server, todos};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let cache = Arc::new(CacheLayer::new(MemoryStore::new()));
///     let dispatcher = RequestDispatcher::new(todos::routes(cache)?);
///     Server::bind("127.0.0.1:3000").await?.serve(Arc::new(dispatcher)).await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Binds the server to the given TCP address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound.
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self, ServerError> {
        let addr = addr.as_ref();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.to_owned(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve every request through `dispatcher`.
    pub async fn serve(self, dispatcher: Arc<RequestDispatcher>) -> Result<(), ServerError> {
        self.run(move |request| {
            let dispatcher = Arc::clone(&dispatcher);
            async move { dispatcher.handle(request).await }
        })
        .await
    }

    /// Starts accepting connections and dispatching requests to `handler`.
    ///
    /// The handler is shared across all connection tasks. This method runs until
    /// the process is terminated.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Io`] if the TCP listener itself fails.
    pub async fn run<H, F>(self, handler: H) -> Result<(), ServerError>
    where
        H: Fn(Request) -> F + Send + Sync + 'static,
        F: Future<Output = Response> + Send + 'static,
    {
        let handler = Arc::new(handler);
        info!(address = %self.local_addr, "todos-service listening");

        loop {
            let (stream, peer_addr) = match self.listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            debug!(peer = %peer_addr, "connection accepted");
            let handler = Arc::clone(&handler);

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer_addr, handler).await {
                    warn!(peer = %peer_addr, error = %e, "connection closed with error");
                }
            });
        }
    }
}

/// What [`next_frame`] found at the front of the connection buffer.
enum Frame {
    /// A full request, and how many buffered bytes it spans.
    Ready(Request, usize),
    /// The peer hung up before a full request arrived.
    Closed,
    /// The request cannot be served. Answer with this and close.
    Reject(Response),
}

fn too_large() -> Response {
    Response::text(StatusCode::PayloadTooLarge, "Request entity too large")
}

/// Reads until `buf` holds one whole request.
///
/// A declared `Content-Length` that would push the request past
/// [`MAX_REQUEST_SIZE`] is refused as soon as the head is parsed, without
/// waiting for the body.
async fn next_frame(stream: &mut TcpStream, buf: &mut BytesMut) -> std::io::Result<Frame> {
    loop {
        if buf.len() > MAX_REQUEST_SIZE {
            return Ok(Frame::Reject(too_large()));
        }

        match Request::parse(buf) {
            Ok((request, body_offset)) => {
                let declared = request.content_length().unwrap_or(0);
                let Some(frame_len) = body_offset
                    .checked_add(declared)
                    .filter(|&len| len <= MAX_REQUEST_SIZE)
                else {
                    return Ok(Frame::Reject(too_large()));
                };
                if buf.len() >= frame_len {
                    return Ok(Frame::Ready(request, frame_len));
                }
            }
            Err(RequestError::Incomplete) => {}
            Err(e) => {
                let body = format!("Bad Request: {e}");
                return Ok(Frame::Reject(Response::text(StatusCode::BadRequest, body)));
            }
        }

        if stream.read_buf(buf).await? == 0 {
            return Ok(Frame::Closed);
        }
    }
}

/// Serves requests off one connection until the peer leaves or asks to close.
///
/// Pipelined requests already sitting in the buffer are answered in order
/// before the socket is read again.
async fn handle_connection<H, F>(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    handler: Arc<H>,
) -> Result<(), std::io::Error>
where
    H: Fn(Request) -> F + Send + Sync + 'static,
    F: Future<Output = Response> + Send + 'static,
{
    let mut buf = BytesMut::with_capacity(INITIAL_BUF_SIZE);

    loop {
        let (request, frame_len) = match next_frame(&mut stream, &mut buf).await? {
            Frame::Ready(request, frame_len) => (request, frame_len),
            Frame::Closed => {
                debug!(peer = %peer_addr, buffered = buf.len(), "peer closed connection");
                return Ok(());
            }
            Frame::Reject(response) => {
                warn!(peer = %peer_addr, status = %response.status(), "rejecting request");
                stream.write_all(&response.keep_alive(false).into_bytes()).await?;
                return stream.shutdown().await;
            }
        };

        let keep_alive = request.is_keep_alive();
        debug!(
            peer = %peer_addr,
            method = %request.method(),
            path = %request.path(),
            keep_alive,
            "dispatching request"
        );

        let response = handler(request).await.keep_alive(keep_alive);
        stream.write_all(&response.into_bytes()).await?;
        stream.flush().await?;
        buf.advance(frame_len);

        if !keep_alive {
            debug!(peer = %peer_addr, "client asked to close");
            return Ok(());
        }
    }
}
