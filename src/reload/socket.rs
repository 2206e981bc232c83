// src/reload/socket.rs

//! WebSocket broadcast of reload messages.
//!
//! The runtime never waits on a client. Each handshake runs on its own
//! short-lived thread, and broadcasts go through a channel to a dedicated
//! thread. Client writes carry a timeout, so a tab that stops reading is
//! dropped instead of stalling later broadcasts.

use std::net::{IpAddr, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Result};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message;
use tungstenite::WebSocket;

use super::ReloadNotifier;

const MAX_PORT_RETRIES: u16 = 10;
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
const WRITE_TIMEOUT: Duration = Duration::from_secs(2);

/// Message sent to every connected browser.
pub const RELOAD_MESSAGE: &str = "reload";

type Clients = Arc<Mutex<Vec<WebSocket<TcpStream>>>>;

/// Connected reload clients plus the threads accepting and serving them.
pub struct ReloadHub {
    clients: Clients,
    outbox: mpsc::UnboundedSender<String>,
    port: u16,
}

impl std::fmt::Debug for ReloadHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReloadHub")
            .field("port", &self.port)
            .field("clients", &self.client_count())
            .finish()
    }
}

impl ReloadHub {
    /// Bind `host:base_port` (trying the next ports when taken), then accept
    /// and serve clients on background threads.
    pub fn start(host: IpAddr, base_port: u16) -> Result<Self> {
        let (listener, port) = bind_listener(host, base_port)?;
        let clients: Clients = Arc::new(Mutex::new(Vec::new()));
        let (outbox, inbox) = mpsc::unbounded_channel();

        let accepted = Arc::clone(&clients);
        thread::Builder::new()
            .name("reload-accept".to_string())
            .spawn(move || accept_loop(listener, accepted))?;

        let targets = Arc::clone(&clients);
        thread::Builder::new()
            .name("reload-broadcast".to_string())
            .spawn(move || broadcast_loop(inbox, targets))?;

        Ok(Self {
            clients,
            outbox,
            port,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Queue `text` for every client. Never blocks.
    pub fn broadcast(&self, text: &str) {
        if self.outbox.send(text.to_string()).is_err() {
            warn!("reload broadcaster is gone; message dropped");
        }
    }
}

impl ReloadNotifier for ReloadHub {
    fn notify(&self, target: &str) {
        debug!(target = %target, "queueing reload broadcast");
        self.broadcast(RELOAD_MESSAGE);
    }
}

fn broadcast_loop(mut inbox: mpsc::UnboundedReceiver<String>, clients: Clients) {
    while let Some(mut text) = inbox.blocking_recv() {
        // Collapse a burst of queued messages into the latest one.
        while let Ok(next) = inbox.try_recv() {
            text = next;
        }
        let delivered = deliver(&clients, &text);
        debug!(clients = delivered, "reload broadcast");
    }
    debug!("reload broadcaster finished");
}

/// Send `text` to every client, dropping the ones that failed or timed out.
fn deliver(clients: &Clients, text: &str) -> usize {
    let mut clients = clients.lock();
    clients.retain_mut(|ws| match ws.send(Message::Text(text.to_string().into())) {
        Ok(()) => true,
        Err(e) => {
            debug!(error = %e, "dropping reload client");
            false
        }
    });
    clients.len()
}

fn accept_loop(listener: TcpListener, clients: Clients) {
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "reload accept failed");
                continue;
            }
        };

        let clients = Arc::clone(&clients);
        let spawned = thread::Builder::new()
            .name("reload-handshake".to_string())
            .spawn(move || handshake(stream, clients));
        if let Err(e) = spawned {
            warn!(error = %e, "could not spawn reload handshake thread");
        }
    }
}

fn handshake(stream: TcpStream, clients: Clients) {
    let peer = stream.peer_addr().ok();
    if let Err(e) = stream
        .set_read_timeout(Some(HANDSHAKE_TIMEOUT))
        .and_then(|()| stream.set_write_timeout(Some(WRITE_TIMEOUT)))
    {
        warn!(?peer, error = %e, "could not set reload socket timeouts");
        return;
    }

    match tungstenite::accept(stream) {
        Ok(ws) => {
            let mut guard = clients.lock();
            guard.push(ws);
            debug!(?peer, total = guard.len(), "reload client connected");
        }
        Err(e) => warn!(?peer, error = %e, "reload handshake failed"),
    }
}

fn bind_listener(host: IpAddr, base_port: u16) -> Result<(TcpListener, u16)> {
    let mut last_error = None;

    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind(SocketAddr::new(host, port)) {
            Ok(listener) => {
                let actual = listener.local_addr()?.port();
                if offset > 0 {
                    info!(requested = base_port, actual, "reload port in use; using next free port");
                }
                return Ok((listener, actual));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow!(
        "failed to bind reload socket after {} attempts: {}",
        MAX_PORT_RETRIES,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::net::Ipv4Addr;
    use std::time::Instant;

    use super::*;

    fn localhost_hub() -> ReloadHub {
        ReloadHub::start(IpAddr::V4(Ipv4Addr::LOCALHOST), 0).unwrap()
    }

    fn wait_for_clients(hub: &ReloadHub, n: usize) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while hub.client_count() < n {
            assert!(Instant::now() < deadline, "only {} clients registered", hub.client_count());
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn connected_client_receives_reload() {
        let hub = localhost_hub();
        let url = format!("ws://127.0.0.1:{}", hub.port());
        let (mut client, _) = tungstenite::connect(url).unwrap();
        wait_for_clients(&hub, 1);

        hub.notify("css");
        let msg = client.read().unwrap();
        assert_eq!(msg.into_text().unwrap().as_str(), RELOAD_MESSAGE);
    }

    #[test]
    fn broadcast_without_clients_is_a_noop() {
        let hub = localhost_hub();
        hub.broadcast(RELOAD_MESSAGE);
        assert_eq!(hub.client_count(), 0);
    }

    #[test]
    fn silent_connection_does_not_block_later_clients() {
        let hub = localhost_hub();

        // Connects but never sends a handshake.
        let mut silent = TcpStream::connect(("127.0.0.1", hub.port())).unwrap();
        silent.write_all(b"GET / HTTP/1.1\r\n").unwrap();

        let url = format!("ws://127.0.0.1:{}", hub.port());
        let (mut client, _) = tungstenite::connect(url).unwrap();
        wait_for_clients(&hub, 1);

        hub.notify("js");
        let msg = client.read().unwrap();
        assert_eq!(msg.into_text().unwrap().as_str(), RELOAD_MESSAGE);
    }

    #[test]
    fn notify_returns_while_a_client_never_reads() {
        let hub = localhost_hub();
        let url = format!("ws://127.0.0.1:{}", hub.port());
        let (_stalled, _) = tungstenite::connect(url).unwrap();
        wait_for_clients(&hub, 1);

        let started = Instant::now();
        for _ in 0..10_000 {
            hub.notify("images");
        }
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
