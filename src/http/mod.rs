//! HTTP message engine.
//!
//! Parses raw request bytes into a [`request::Request`], dispatches it to an
//! application [`handler::Handler`] bound by `(method, path)`, and renders a
//! [`response::Response`] back to bytes, serving static files when the
//! handler leaves the body to the builder.
//!
//! # Architecture
//!
//! - **`headers`**: case-insensitive ordered header map
//! - **`cookie`**: `Cookie` parsing and `Set-Cookie` formatting
//! - **`parser`**: fallible parse steps for request line, headers and bodies
//! - **`request`**: the inbound message and its `prepare` entry point
//! - **`handler`**: handler capability and the route table
//! - **`mime`**: MIME detection and content-type to storage-root mapping
//! - **`files`**: sandboxed static-file loader
//! - **`response`**: the outbound message and `build_response`
//! - **`writer`**: header rendering, fixed pages, socket writer
//! - **`connection`**: one read, one dispatch, one write, close
//! - **`client`**: outbound request primitive
//!
//! # Connection Flow
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← single bounded read
//!        └──────┬──────┘
//!               │ Request::prepare
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← handler, MIME, file load
//!        └──────┬───────────┘
//!               │ bytes rendered
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← send, then shut down
//!        └──────┬───────────┘
//!               └─ Closed
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use gatehouse::http::connection::Connection;
//! use gatehouse::http::files::StorageRoots;
//! use gatehouse::http::handler::Router;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!     let routes = Arc::new(Router::new());
//!     let roots = Arc::new(StorageRoots::new("."));
//!
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         let (routes, roots) = (routes.clone(), roots.clone());
//!         tokio::spawn(async move {
//!             let mut conn = Connection::new(socket, routes, roots);
//!             if let Err(e) = conn.run().await {
//!                 tracing::error!("Connection error: {}", e);
//!             }
//!         });
//!     }
//! }
//! ```

pub mod client;
pub mod connection;
pub mod cookie;
pub mod files;
pub mod handler;
pub mod headers;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
