use gatehouse::config::{Config, Mode};
use gatehouse::http::handler::Router;
use gatehouse::server::listener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::load()?;
    gatehouse::logging::init(&cfg.logging);

    let proxy_routes = match cfg.server.mode {
        Mode::Proxy => Some(cfg.routing_table()?),
        Mode::Backend => None,
    };

    let server = async {
        match proxy_routes {
            Some(routes) => listener::run_proxy(&cfg, routes).await,
            None => listener::run_backend(&cfg, Router::new()).await,
        }
    };

    tokio::select! {
        res = server => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
