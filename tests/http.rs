use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use todos_service::cache::CacheLayer;
use todos_service::database::{MemoryStore, Todo};
use todos_service::dispatch::RequestDispatcher;
use todos_service::server::Server;
use todos_service::todos;

async fn spawn_app() -> SocketAddr {
    let cache = Arc::new(CacheLayer::new(MemoryStore::new()));
    let dispatcher = Arc::new(RequestDispatcher::new(todos::routes(cache).unwrap()));
    let server = Server::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr();
    tokio::spawn(server.serve(dispatcher));
    addr
}

struct Reply {
    status: u16,
    body: String,
}

async fn send(addr: SocketAddr, method: &str, path: &str, body: &str) -> Reply {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "{method} {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();

    let (head, body) = raw.split_once("\r\n\r\n").unwrap();
    let status = head
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .unwrap();
    Reply {
        status,
        body: body.to_owned(),
    }
}

#[tokio::test]
async fn greeting_on_root() {
    let addr = spawn_app().await;
    let reply = send(addr, "GET", "/", "").await;
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, todos::GREETING);
}

#[tokio::test]
async fn todo_lifecycle() {
    let addr = spawn_app().await;

    let reply = send(addr, "POST", "/todos", r#"{"item":"buy milk"}"#).await;
    assert_eq!((reply.status, reply.body.as_str()), (200, "OK"));

    let reply = send(addr, "GET", "/todos?fresh=1", "").await;
    assert_eq!(reply.status, 200);
    let list: Vec<Todo> = serde_json::from_str(&reply.body).unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].item, "buy milk");
    let id = list[0].id;

    let reply = send(addr, "GET", &format!("/todos/{id}"), "").await;
    assert_eq!(reply.status, 200);
    let todo: Todo = serde_json::from_str(&reply.body).unwrap();
    assert_eq!(todo.item, "buy milk");

    let reply = send(addr, "DELETE", &format!("/todos/{id}"), "").await;
    assert_eq!((reply.status, reply.body.as_str()), (200, "OK"));

    assert_eq!(send(addr, "GET", &format!("/todos/{id}"), "").await.status, 404);
    assert_eq!(send(addr, "GET", "/todos", "").await.body, "[]");
}

#[tokio::test]
async fn invalid_bodies_are_rejected() {
    let addr = spawn_app().await;

    let reply = send(addr, "POST", "/todos", "{}").await;
    assert_eq!(reply.status, 400);
    assert!(reply.body.contains("item"));

    assert_eq!(send(addr, "POST", "/todos", "not json").await.status, 400);
}

#[tokio::test]
async fn unknown_routes_and_ids_are_404() {
    let addr = spawn_app().await;
    assert_eq!(send(addr, "DELETE", "/todos/999", "").await.status, 404);
    for method in ["GET", "POST", "PUT", "DELETE"] {
        let reply = send(addr, method, "/unknown", "").await;
        assert_eq!(reply.status, 404, "{method}");
        assert_eq!(reply.body, "Not Found");
    }
}

#[tokio::test]
async fn keep_alive_serves_pipelined_requests() {
    let addr = spawn_app().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let body = r#"{"item":"a"}"#;
    let requests = format!(
        "POST /todos HTTP/1.1\r\nContent-Length: {}\r\n\r\n{body}\
         GET /todos HTTP/1.1\r\nConnection: close\r\n\r\n",
        body.len()
    );
    stream.write_all(requests.as_bytes()).await.unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();
    assert_eq!(raw.matches("HTTP/1.1 200 OK").count(), 2);
    assert!(raw.ends_with(r#"[{"id":1,"item":"a"}]"#));
}

#[tokio::test]
async fn malformed_request_line_is_400() {
    let addr = spawn_app().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"\x01\x02 garbage\r\n\r\n").await.unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();
    assert!(raw.starts_with("HTTP/1.1 400 Bad Request"));
}

#[tokio::test]
async fn oversized_content_length_is_413() {
    let addr = spawn_app().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"POST /todos HTTP/1.1\r\nContent-Length: 18446744073709551615\r\n\r\n")
        .await
        .unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();
    assert!(raw.starts_with("HTTP/1.1 413 Payload Too Large"), "{raw}");
}

#[tokio::test]
async fn body_just_over_limit_is_refused_before_it_arrives() {
    let addr = spawn_app().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let head = format!("POST /todos HTTP/1.1\r\nContent-Length: {}\r\n\r\n", 1024 * 1024);
    stream.write_all(head.as_bytes()).await.unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();
    assert!(raw.starts_with("HTTP/1.1 413"), "{raw}");
    assert!(raw.contains("Connection: close"));
}
