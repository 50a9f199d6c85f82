// tests/server_live_reload.rs

mod common;
use crate::common::{init_tracing, with_timeout};

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use sitewatch::fs::mock::MockFileSystem;
use sitewatch::serve::{start_server, ReloadHub, ServerConfig, ServerHandle, EVENTS_PATH};

fn site() -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file(
        "_site/index.html",
        "<html><body><h1>Home</h1></body></html>",
    );
    fs.add_file("_site/about.html", "<html><body>About</body></html>");
    fs.add_file("_site/blog/index.html", "<html><body>Blog</body></html>");
    fs.add_file("_site/css/main.css", "body { color: red; }");
    fs
}

async fn serve(fs: MockFileSystem, hub: ReloadHub, live_reload: bool) -> ServerHandle {
    let config = ServerConfig {
        root: PathBuf::from("_site"),
        host: "127.0.0.1".to_string(),
        port: 0,
        live_reload,
    };
    start_server(config, hub, Arc::new(fs)).await.unwrap()
}

/// Send one request and read the whole response (the server closes the
/// connection after each response).
async fn request(addr: SocketAddr, method: &str, target: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(format!("{method} {target} HTTP/1.1\r\nHost: localhost\r\n\r\n").as_bytes())
        .await
        .unwrap();
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    String::from_utf8_lossy(&raw).into_owned()
}

fn status_line(response: &str) -> &str {
    response.lines().next().unwrap_or_default()
}

#[tokio::test]
async fn serves_output_files_with_injected_client() {
    init_tracing();
    let server = serve(site(), ReloadHub::new(), true).await;
    let addr = server.local_addr();

    let home = with_timeout(request(addr, "GET", "/")).await;
    assert_eq!(status_line(&home), "HTTP/1.1 200 OK");
    assert!(home.contains("Content-Type: text/html"));
    assert!(home.contains("<h1>Home</h1>"));
    assert!(home.contains(EVENTS_PATH));
    assert!(home.find(EVENTS_PATH).unwrap() < home.find("</body>").unwrap());

    let css = with_timeout(request(addr, "GET", "/css/main.css")).await;
    assert_eq!(status_line(&css), "HTTP/1.1 200 OK");
    assert!(css.contains("Content-Type: text/css"));
    assert!(!css.contains(EVENTS_PATH));

    server.stop().await;
}

#[tokio::test]
async fn resolves_pretty_urls_and_rejects_bad_paths() {
    init_tracing();
    let server = serve(site(), ReloadHub::new(), false).await;
    let addr = server.local_addr();

    let about = with_timeout(request(addr, "GET", "/about")).await;
    assert_eq!(status_line(&about), "HTTP/1.1 200 OK");
    assert!(about.contains("About"));
    assert!(!about.contains(EVENTS_PATH));

    let blog = with_timeout(request(addr, "GET", "/blog")).await;
    assert_eq!(status_line(&blog), "HTTP/1.1 301 Moved Permanently");
    assert!(blog.contains("Location: /blog/"));

    let missing = with_timeout(request(addr, "GET", "/nope.html")).await;
    assert_eq!(status_line(&missing), "HTTP/1.1 404 Not Found");

    let escape = with_timeout(request(addr, "GET", "/../secret")).await;
    assert_eq!(status_line(&escape), "HTTP/1.1 403 Forbidden");

    let post = with_timeout(request(addr, "POST", "/")).await;
    assert_eq!(status_line(&post), "HTTP/1.1 405 Method Not Allowed");

    let head = with_timeout(request(addr, "HEAD", "/")).await;
    assert_eq!(status_line(&head), "HTTP/1.1 200 OK");
    assert!(!head.contains("Home"));

    server.stop().await;
}

#[tokio::test]
async fn event_stream_delivers_notify_and_reload() {
    init_tracing();
    let hub = ReloadHub::new();
    let server = serve(site(), hub.clone(), true).await;

    let mut stream = TcpStream::connect(server.local_addr()).await.unwrap();
    stream
        .write_all(format!("GET {EVENTS_PATH} HTTP/1.1\r\nHost: localhost\r\n\r\n").as_bytes())
        .await
        .unwrap();
    let mut lines = BufReader::new(stream).lines();

    // Wait for the stream to be established before publishing.
    with_timeout(async {
        while let Some(line) = lines.next_line().await.unwrap() {
            if line == ": connected" {
                break;
            }
        }
    })
    .await;
    assert_eq!(hub.client_count(), 1);

    hub.notify("Running jekyll build");
    hub.reload();

    let mut seen = Vec::new();
    with_timeout(async {
        while let Some(line) = lines.next_line().await.unwrap() {
            if line.starts_with("event: ") || line.starts_with("data: ") {
                seen.push(line);
            }
            if seen.len() == 4 {
                break;
            }
        }
    })
    .await;

    assert_eq!(
        seen,
        vec![
            "event: notify",
            "data: Running jekyll build",
            "event: reload",
            "data: reload",
        ]
    );

    server.stop().await;
}

#[tokio::test]
async fn reload_without_clients_is_a_no_op() {
    let hub = ReloadHub::new();
    assert_eq!(hub.reload(), 0);

    let server = serve(site(), hub.clone(), true).await;
    assert_eq!(hub.reload(), 0);
    server.stop().await;
}
