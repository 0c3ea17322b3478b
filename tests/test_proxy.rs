//! Tests for host-based forwarding

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use gatehouse::proxy::routing::{Policy, RoutingTable, Targets};
use gatehouse::proxy::session::{extract_host, handle_client, read_request_head};
use gatehouse::proxy::upstream::{BACKEND_UNAVAILABLE, Upstream};
use gatehouse::server::listener;
use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

const FIXED_404: &str = "HTTP/1.1 404 Not Found\r\n\
Content-Type: text/plain\r\n\
Content-Length: 13\r\n\
Connection: close\r\n\
\r\n\
404 Not Found";

fn upstream() -> Upstream {
    Upstream::new(Duration::from_secs(1), Duration::from_secs(1))
}

/// Address nothing is listening on.
async fn refused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Backend that answers every connection with `body` and reports what it received.
async fn mock_backend(body: &'static str) -> (SocketAddr, mpsc::UnboundedReceiver<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let tx = tx.clone();
            tokio::spawn(async move {
                let received = read_request_head(&mut socket, Duration::from_secs(1)).await;
                let _ = tx.send(received);
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, rx)
}

async fn proxy_exchange(table: &RoutingTable, request: &[u8]) -> Vec<u8> {
    let (mut client, server) = duplex(64 * 1024);
    client.write_all(request).await.unwrap();

    handle_client(server, table, &upstream(), Duration::from_millis(500))
        .await
        .unwrap();

    let mut out = Vec::new();
    client.read_to_end(&mut out).await.unwrap();
    out
}

#[test]
fn test_extract_host() {
    assert_eq!(
        extract_host("GET / HTTP/1.1\r\nHost: app.local\r\n\r\n").as_deref(),
        Some("app.local")
    );
    assert_eq!(
        extract_host("GET / HTTP/1.1\r\nhOsT: app.local:8080\r\n\r\n").as_deref(),
        Some("app.local")
    );
    assert_eq!(extract_host("GET / HTTP/1.1\r\nAccept: */*\r\n\r\n"), None);
    assert_eq!(extract_host(""), None);
}

#[test]
fn test_fixed_404_literal() {
    assert_eq!(BACKEND_UNAVAILABLE, FIXED_404.as_bytes());
}

#[tokio::test]
async fn test_refused_backend_gives_fixed_404() {
    let addr = refused_addr().await;

    let response = upstream()
        .forward(
            "127.0.0.1",
            &addr.port().to_string(),
            b"GET / HTTP/1.1\r\nHost: a\r\n\r\n",
        )
        .await;

    assert_eq!(String::from_utf8_lossy(&response), FIXED_404);
}

#[tokio::test]
async fn test_forward_relays_verbatim() {
    let (addr, mut received) = mock_backend("hello from backend").await;
    let request = b"GET /path?q=1 HTTP/1.1\r\nHost: app.local\r\nX-Trace: abc\r\n\r\n";

    let response = upstream()
        .forward("127.0.0.1", &addr.port().to_string(), request)
        .await;

    assert_eq!(
        String::from_utf8_lossy(&response),
        "HTTP/1.1 200 OK\r\nContent-Length: 18\r\nConnection: close\r\n\r\nhello from backend"
    );
    assert_eq!(received.recv().await.unwrap(), request.to_vec());
}

#[tokio::test]
async fn test_session_forwards_by_host() {
    let (addr, mut received) = mock_backend("routed").await;
    let mut table = RoutingTable::new();
    table.insert("app.local", Targets::One(addr.to_string()), Policy::Single);

    let request = b"GET / HTTP/1.1\r\nHost: app.local:8080\r\n\r\n";
    let out = proxy_exchange(&table, request).await;

    assert!(String::from_utf8_lossy(&out).ends_with("\r\n\r\nrouted"));
    assert_eq!(received.recv().await.unwrap(), request.to_vec());
}

#[tokio::test]
async fn test_session_forwards_binary_body_unchanged() {
    let request: &[u8] = b"POST /up HTTP/1.1\r\nHost: bin.local\r\nContent-Length: 2\r\n\r\n\xff\xfe";
    let backend = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = backend.local_addr().unwrap();
    let (tx, mut received) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (mut socket, _) = backend.accept().await.unwrap();
        let mut buf = vec![0u8; request.len()];
        socket.read_exact(&mut buf).await.unwrap();
        let _ = tx.send(buf);
        socket
            .write_all(b"HTTP/1.1 204 No Content\r\n\r\n")
            .await
            .unwrap();
        socket.shutdown().await.unwrap();
    });

    let mut table = RoutingTable::new();
    table.insert("bin.local", Targets::One(addr.to_string()), Policy::Single);

    let out = proxy_exchange(&table, request).await;

    assert!(out.starts_with(b"HTTP/1.1 204"));
    let seen = received.recv().await.unwrap();
    assert_eq!(seen, request.to_vec());
    assert!(seen.ends_with(&[0xff, 0xfe]));
}

#[tokio::test]
async fn test_session_unreachable_backend() {
    let addr = refused_addr().await;
    let mut table = RoutingTable::new();
    table.insert("down.local", Targets::One(addr.to_string()), Policy::Single);

    let out = proxy_exchange(&table, b"GET / HTTP/1.1\r\nHost: down.local\r\n\r\n").await;
    assert_eq!(String::from_utf8_lossy(&out), FIXED_404);
}

#[tokio::test]
async fn test_session_empty_resolved_host() {
    let mut table = RoutingTable::new();
    table.insert("nohost.local", Targets::One(":8000".to_string()), Policy::Single);

    let out = proxy_exchange(&table, b"GET / HTTP/1.1\r\nHost: nohost.local\r\n\r\n").await;
    assert_eq!(String::from_utf8_lossy(&out), FIXED_404);
}

#[tokio::test]
async fn test_session_without_host_sends_nothing() {
    let table = RoutingTable::new();

    let out = proxy_exchange(&table, b"GET / HTTP/1.1\r\nAccept: */*\r\n\r\n").await;
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_session_blank_request_sends_nothing() {
    let table = RoutingTable::new();
    let (client, server) = duplex(1024);
    drop(client);

    handle_client(server, &table, &upstream(), Duration::from_millis(200))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_session_round_robin() {
    let (first, _rx1) = mock_backend("one").await;
    let (second, _rx2) = mock_backend("two").await;
    let mut table = RoutingTable::new();
    table.insert(
        "rr.local",
        Targets::Many(vec![first.to_string(), second.to_string()]),
        Policy::RoundRobin,
    );

    let mut bodies = Vec::new();
    for _ in 0..3 {
        let out = proxy_exchange(&table, b"GET / HTTP/1.1\r\nHost: rr.local\r\n\r\n").await;
        let out = String::from_utf8_lossy(&out).into_owned();
        bodies.push(out.rsplit("\r\n\r\n").next().unwrap().to_string());
    }

    assert_eq!(bodies, vec!["one", "two", "one"]);
}

#[tokio::test]
async fn test_proxy_over_tcp() {
    let (backend, _rx) = mock_backend("via tcp").await;
    let mut table = RoutingTable::new();
    table.insert("tcp.local", Targets::One(backend.to_string()), Policy::Single);

    let socket = listener::bind("127.0.0.1:0", 50).await.unwrap();
    let addr = socket.local_addr().unwrap();
    tokio::spawn(listener::serve_proxy(
        socket,
        Arc::new(table),
        Arc::new(upstream()),
        Duration::from_secs(1),
    ));

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: tcp.local\r\n\r\n")
        .await
        .unwrap();

    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();

    assert!(String::from_utf8_lossy(&out).ends_with("\r\n\r\nvia tcp"));
}
