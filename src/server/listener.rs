use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::{TcpListener, TcpSocket, lookup_host};
use tracing::{debug, error, info};

use crate::config::Config;
use crate::http::connection::Connection;
use crate::http::files::StorageRoots;
use crate::http::handler::Router;
use crate::proxy::routing::RoutingTable;
use crate::proxy::session::handle_client;
use crate::proxy::upstream::Upstream;

/// Binds `addr` with address reuse and the given accept backlog.
pub async fn bind(addr: &str, backlog: u32) -> anyhow::Result<TcpListener> {
    let addr: SocketAddr = lookup_host(addr)
        .await
        .with_context(|| format!("Failed to resolve {}", addr))?
        .next()
        .with_context(|| format!("No address found for {}", addr))?;

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;

    Ok(socket.listen(backlog)?)
}

/// Accept loop for the backend server. Each connection is served on its own
/// task and never awaited.
pub async fn serve_backend(
    listener: TcpListener,
    routes: Arc<Router>,
    roots: Arc<StorageRoots>,
    read_limit: usize,
) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;
        debug!(peer = %peer, "Accepted connection");

        let routes = routes.clone();
        let roots = roots.clone();
        tokio::spawn(async move {
            let mut conn = Connection::new(socket, routes, roots).with_read_limit(read_limit);
            if let Err(e) = conn.run().await {
                error!(peer = %peer, error = %e, "Connection error");
            }
        });
    }
}

/// Accept loop for the proxy.
pub async fn serve_proxy(
    listener: TcpListener,
    routes: Arc<RoutingTable>,
    upstream: Arc<Upstream>,
    client_timeout: Duration,
) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;
        debug!(peer = %peer, "Accepted proxy connection");

        let routes = routes.clone();
        let upstream = upstream.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_client(socket, &routes, &upstream, client_timeout).await {
                error!(peer = %peer, error = %e, "Proxy session error");
            }
        });
    }
}

/// Starts the backend server with the application's route table.
pub async fn run_backend(cfg: &Config, routes: Router) -> anyhow::Result<()> {
    let listener = bind(&cfg.server.listen_addr, cfg.server.backlog).await?;
    info!(addr = %cfg.server.listen_addr, "Backend listening");

    for key in routes.keys() {
        info!(method = %key.method, path = %key.path, "Route registered");
    }

    let roots = cfg.storage_roots();
    info!(root = %roots.base().display(), "Serving static files");

    serve_backend(
        listener,
        Arc::new(routes),
        Arc::new(roots),
        cfg.server.read_buffer,
    )
    .await
}

/// Starts the reverse proxy.
pub async fn run_proxy(cfg: &Config, routes: RoutingTable) -> anyhow::Result<()> {
    let listener = bind(&cfg.server.listen_addr, cfg.server.backlog).await?;
    info!(addr = %cfg.server.listen_addr, hosts = routes.len(), "Proxy listening");

    for hostname in routes.hostnames() {
        debug!(hostname = %hostname, "Host mapped");
    }

    let upstream = Upstream::new(cfg.proxy.connect_timeout(), cfg.proxy.read_timeout());

    serve_proxy(
        listener,
        Arc::new(routes),
        Arc::new(upstream),
        cfg.proxy.client_read_timeout(),
    )
    .await
}
