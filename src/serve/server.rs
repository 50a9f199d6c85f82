// src/serve/server.rs

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ServerSection;
use crate::fs::FileSystem;

use super::files::{is_html, resolve, Resolved};
use super::http::{event_frame, event_stream_head, read_request, Response};
use super::hub::ReloadHub;
use super::inject::inject_client;
use super::EVENTS_PATH;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Where and what to serve.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory served at `/`.
    pub root: PathBuf,
    pub host: String,
    pub port: u16,
    pub live_reload: bool,
}

impl ServerConfig {
    /// Server settings with `root` resolved against the project directory.
    pub fn from_section(section: &ServerSection, project_root: &std::path::Path) -> Self {
        Self {
            root: project_root.join(&section.root),
            host: section.host.clone(),
            port: section.port,
            live_reload: section.live_reload,
        }
    }
}

/// A running server. Dropping the handle shuts the server down as well;
/// [`ServerHandle::stop`] additionally waits for the accept loop to end.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections, close open event streams and wait for
    /// the accept loop to finish.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(err) = self.join.await {
            warn!(error = %err, "server task ended abnormally");
        }
        info!(addr = %self.local_addr, "server stopped");
    }
}

struct Shared {
    config: ServerConfig,
    hub: ReloadHub,
    fs: Arc<dyn FileSystem>,
}

/// Bind the listener and start serving in the background.
///
/// Returns once the socket is listening; the accept loop keeps running
/// until [`ServerHandle::stop`].
pub async fn start_server(
    config: ServerConfig,
    hub: ReloadHub,
    fs: Arc<dyn FileSystem>,
) -> Result<ServerHandle> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding static server to {addr}"))?;
    let local_addr = listener.local_addr()?;

    if !fs.is_dir(&config.root) {
        warn!(root = ?config.root, "output directory does not exist yet; serving 404s until it does");
    }

    info!(
        addr = %local_addr,
        root = ?config.root,
        live_reload = config.live_reload,
        "serving site at http://{local_addr}/"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shared = Arc::new(Shared { config, hub, fs });

    let join = tokio::spawn(accept_loop(listener, shared, shutdown_rx));

    Ok(ServerHandle {
        local_addr,
        shutdown_tx,
        join,
    })
}

async fn accept_loop(listener: TcpListener, shared: Arc<Shared>, mut shutdown_rx: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        let shared = Arc::clone(&shared);
                        let shutdown = shutdown_rx.clone();
                        tokio::spawn(async move {
                            if let Err(err) = handle_connection(stream, shared, shutdown).await {
                                debug!(%peer, error = %err, "connection ended with error");
                            }
                        });
                    }
                    Err(err) => {
                        warn!(error = %err, "failed to accept connection");
                    }
                }
            }
            _ = shutdown_rx.changed() => {
                debug!("server shutdown requested");
                break;
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    shared: Arc<Shared>,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let request = match read_request(&mut reader).await {
        Ok(Some(req)) => req,
        Ok(None) => return Ok(()),
        Err(err) => {
            Response::error(400).write_to(&mut write_half, false).await?;
            return Err(err);
        }
    };

    debug!(method = %request.method, target = %request.target, "request");

    let head_only = match request.method.as_str() {
        "GET" => false,
        "HEAD" => true,
        _ => {
            return Response::error(405)
                .with_header("Allow", "GET, HEAD")
                .write_to(&mut write_half, false)
                .await;
        }
    };

    if shared.config.live_reload && request.path() == EVENTS_PATH {
        return stream_events(&mut write_half, &shared.hub, shutdown).await;
    }

    let response = build_response(&shared, &request.target);
    response.write_to(&mut write_half, head_only).await
}

/// Turn a request target into a response.
fn build_response(shared: &Shared, target: &str) -> Response {
    match resolve(shared.fs.as_ref(), &shared.config.root, target) {
        Resolved::File { path, content_type } => match shared.fs.read(&path) {
            Ok(bytes) => {
                let body = if shared.config.live_reload && is_html(content_type) {
                    inject_client(&bytes)
                } else {
                    bytes
                };
                Response::new(200).with_body(content_type, body)
            }
            Err(err) => {
                warn!(?path, error = %err, "failed to read file");
                Response::error(500)
            }
        },
        Resolved::Redirect { location } => Response::new(301).with_header("Location", location),
        Resolved::NotFound => {
            let page = b"<!doctype html><title>404</title><h1>404 Not Found</h1>".to_vec();
            let body = if shared.config.live_reload {
                inject_client(&page)
            } else {
                page
            };
            Response::new(404).with_body("text/html; charset=utf-8", body)
        }
        Resolved::Forbidden => Response::error(403),
        Resolved::BadRequest => Response::error(400),
    }
}

async fn stream_events<W>(
    writer: &mut W,
    hub: &ReloadHub,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()>
where
    W: tokio::io::AsyncWrite + Unpin,
{
    let mut rx = hub.subscribe();
    writer.write_all(event_stream_head().as_bytes()).await?;
    writer.write_all(b": connected\n\n").await?;
    writer.flush().await?;

    debug!(clients = hub.client_count(), "browser connected to reload stream");

    let mut keep_alive = tokio::time::interval(KEEP_ALIVE_INTERVAL);
    keep_alive.tick().await;

    loop {
        tokio::select! {
            message = rx.recv() => {
                match message {
                    Ok(message) => {
                        writer.write_all(event_frame(&message).as_bytes()).await?;
                        writer.flush().await?;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "reload stream lagged; continuing");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = keep_alive.tick() => {
                writer.write_all(b": keep-alive\n\n").await?;
                writer.flush().await?;
            }
            _ = shutdown.changed() => break,
        }
    }

    Ok(())
}
