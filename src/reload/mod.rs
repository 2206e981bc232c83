// src/reload/mod.rs

//! Dev server and live reload.
//!
//! - [`server`] serves the build root over HTTP and injects the reload
//!   client into HTML pages.
//! - [`socket`] accepts WebSocket clients and broadcasts `reload` to them.
//!
//! The runtime only sees the [`ReloadNotifier`] trait.

use std::net::IpAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::ConfigFile;
use crate::fs::FileSystem;

pub mod server;
pub mod socket;

pub use server::{inject_reload_script, StaticServer};
pub use socket::ReloadHub;

/// Receives a notification after every successful target run.
pub trait ReloadNotifier: Send + Sync {
    fn notify(&self, target: &str);
}

/// Notifier for runs without a dev server.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReload;

impl ReloadNotifier for NoopReload {
    fn notify(&self, _target: &str) {}
}

/// Running dev server: the HTTP address and the reload hub.
#[derive(Debug)]
pub struct DevServer {
    pub http: StaticServer,
    pub hub: Arc<ReloadHub>,
}

/// Start the WebSocket hub and the static server described by `[server]`.
pub fn start_dev_server(cfg: &ConfigFile, fs: Arc<dyn FileSystem>) -> Result<DevServer> {
    let host: IpAddr = cfg
        .server
        .host
        .parse()
        .with_context(|| format!("invalid server host '{}'", cfg.server.host))?;

    let hub = Arc::new(ReloadHub::start(host, cfg.server.reload_port)?);
    let http = StaticServer::start(host, cfg.server.port, cfg.build_root(), fs, hub.port())?;

    info!(
        url = %format!("http://{}", http.addr()),
        reload_port = hub.port(),
        "dev server listening"
    );
    Ok(DevServer { http, hub })
}
