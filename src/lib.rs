//! Gatehouse - HTTP backend server and host-routing reverse proxy
//!
//! Core library: the HTTP message engine, static file serving, and the
//! proxy that forwards raw requests by `Host`.

pub mod config;
pub mod http;
pub mod logging;
pub mod proxy;
pub mod server;
