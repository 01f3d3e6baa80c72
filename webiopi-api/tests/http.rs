use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use webiopi_api::{BasicAuth, HttpServer};
use webiopi_core::config::{ContextPrefix, ServeMode, ServerConfig};
use webiopi_core::{BackendHandler, HandlerError, HandlerOutcome, HandlerResponse, HandlerResult};

/// Small REST backend standing in for the GPIO layer
struct TestBackend;

#[async_trait]
impl BackendHandler for TestBackend {
    async fn handle_get(&self, path: &str, compact: bool) -> HandlerResult {
        match path {
            "somepath" => Ok(HandlerResponse::with_body(200, "OK").into()),
            "compact" => Ok(HandlerOutcome::ok(compact.to_string())),
            "GPIO/7/function" => Err(HandlerError::InvalidParameter("Invalid function foo".into())),
            "panic" => panic!("backend bug"),
            _ => Ok(HandlerOutcome::Unhandled),
        }
    }

    async fn handle_post(&self, path: &str, body: Bytes, _compact: bool) -> HandlerResult {
        match path {
            "macros/echo" => Ok(HandlerOutcome::ok(String::from_utf8_lossy(&body).into_owned())),
            _ => Ok(HandlerOutcome::Unhandled),
        }
    }
}

struct TestServer {
    _docroot: tempfile::TempDir,
    server: HttpServer,
    addr: SocketAddr,
}

impl TestServer {
    fn start(configure: impl FnOnce(&mut ServerConfig)) -> Self {
        let docroot = tempfile::tempdir().unwrap();
        std::fs::write(docroot.path().join("index.html"), "<h1>Hello WebIOPi</h1>").unwrap();
        std::fs::write(docroot.path().join("secret.py"), "PASSWORD = 'x'").unwrap();

        let mut config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            doc_root: docroot.path().to_path_buf(),
            system_root: docroot.path().join("missing-system-root"),
            ..Default::default()
        };
        configure(&mut config);

        let server = HttpServer::new(config, Arc::new(TestBackend));
        let addr = server.start().expect("Failed to start server");
        Self {
            _docroot: docroot,
            server,
            addr,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Send a request line verbatim, bypassing client-side path normalization
async fn raw_request(addr: SocketAddr, target: &str) -> String {
    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n", target);
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn test_bare_context_redirects_to_root() {
    let ts = TestServer::start(|c| c.context = ContextPrefix::new("/webiopi/"));
    let res = client().get(ts.url("/webiopi")).send().await.unwrap();
    assert_eq!(res.status(), 301);
    assert_eq!(res.headers()["location"], "/");
    ts.server.stop().await.unwrap();
}

#[tokio::test]
async fn test_handled_get() {
    let ts = TestServer::start(|_| {});
    let res = client().get(ts.url("/somepath?compact=true")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "text/plain");
    assert_eq!(res.headers()["cache-control"], "no-cache");
    assert!(res.headers()["server"].to_str().unwrap().starts_with("WebIOPi/"));
    assert_eq!(res.text().await.unwrap(), "OK");
    ts.server.stop().await.unwrap();
}

#[tokio::test]
async fn test_compact_flag_reaches_backend() {
    let ts = TestServer::start(|c| c.context = ContextPrefix::new("webiopi"));
    let c = client();
    let text = c.get(ts.url("/webiopi/compact?compact=yes")).send().await.unwrap().text().await.unwrap();
    assert_eq!(text, "true");
    let text = c.get(ts.url("/webiopi/compact?compact=no")).send().await.unwrap().text().await.unwrap();
    assert_eq!(text, "false");
    ts.server.stop().await.unwrap();
}

#[tokio::test]
async fn test_basic_auth() {
    let ts = TestServer::start(|c| c.auth = Some(BasicAuth::digest_for("admin", "p@ssw0rd")));
    let c = client();

    let res = c.get(ts.url("/somepath")).send().await.unwrap();
    assert_eq!(res.status(), 401);
    assert_eq!(res.headers()["www-authenticate"], "Basic realm=\"webiopi\"");

    let res = c
        .get(ts.url("/somepath"))
        .basic_auth("admin", Some("wrong"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);

    let res = c
        .get(ts.url("/somepath"))
        .basic_auth("admin", Some("p@ssw0rd"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    ts.server.stop().await.unwrap();
}

#[tokio::test]
async fn test_static_index() {
    let ts = TestServer::start(|_| {});
    let c = client();

    let res = c.get(ts.url("/index.html")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["content-type"], "text/html");
    assert_eq!(res.text().await.unwrap(), "<h1>Hello WebIOPi</h1>");

    let res = c.get(ts.url("/")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "<h1>Hello WebIOPi</h1>");
    ts.server.stop().await.unwrap();
}

#[tokio::test]
async fn test_source_files_are_forbidden() {
    let ts = TestServer::start(|_| {});
    let c = client();
    assert_eq!(c.get(ts.url("/secret.py")).send().await.unwrap().status(), 403);
    assert_eq!(c.get(ts.url("/nothing/here.py")).send().await.unwrap().status(), 403);
    ts.server.stop().await.unwrap();
}

#[tokio::test]
async fn test_traversal_is_forbidden() {
    let outside = tempfile::tempdir().unwrap();
    std::fs::write(outside.path().join("shadow"), "root:x").unwrap();
    let ts = TestServer::start(|_| {});

    // `//tmp/...` leaves an absolute path once the leading slash is stripped
    let absolute = format!("/{}/shadow", outside.path().display());
    let response = raw_request(ts.addr, &absolute).await;
    assert!(response.starts_with("HTTP/1.1 403"), "{}", response);
    assert!(!response.contains("root:x"));

    let hops = "../".repeat(16);
    let target = format!("/{}{}/shadow", hops, outside.path().display().to_string().trim_start_matches('/'));
    let response = raw_request(ts.addr, &target).await;
    assert!(response.starts_with("HTTP/1.1 403"), "{}", response);
    ts.server.stop().await.unwrap();
}

#[tokio::test]
async fn test_post_dispatch() {
    let ts = TestServer::start(|_| {});
    let c = client();

    let res = c.post(ts.url("/macros/echo")).body("hello").send().await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "hello");

    // POST never falls through to files
    let res = c.post(ts.url("/unknown-path")).send().await.unwrap();
    assert_eq!(res.status(), 404);
    let res = c.post(ts.url("/index.html")).send().await.unwrap();
    assert_eq!(res.status(), 404);
    ts.server.stop().await.unwrap();
}

#[tokio::test]
async fn test_unsupported_method() {
    let ts = TestServer::start(|_| {});
    let res = client().delete(ts.url("/somepath")).send().await.unwrap();
    assert_eq!(res.status(), 405);
    ts.server.stop().await.unwrap();
}

#[tokio::test]
async fn test_invalid_parameter_is_403_with_message() {
    let ts = TestServer::start(|_| {});
    let res = client().get(ts.url("/GPIO/7/function")).send().await.unwrap();
    assert_eq!(res.status(), 403);
    assert!(res.text().await.unwrap().contains("Invalid function foo"));
    ts.server.stop().await.unwrap();
}

#[tokio::test]
async fn test_listener_survives_failed_request() {
    let ts = TestServer::start(|_| {});
    let c = client();
    let res = c.get(ts.url("/panic")).send().await.unwrap();
    assert_eq!(res.status(), 500);
    let res = c.get(ts.url("/somepath")).send().await.unwrap();
    assert_eq!(res.status(), 200);
    ts.server.stop().await.unwrap();
}

#[tokio::test]
async fn test_per_connection_mode() {
    let ts = TestServer::start(|c| c.serve_mode = ServeMode::PerConnection);
    let c = client();
    let (a, b) = tokio::join!(
        c.get(ts.url("/somepath")).send(),
        c.get(ts.url("/index.html")).send()
    );
    assert_eq!(a.unwrap().status(), 200);
    assert_eq!(b.unwrap().status(), 200);
    ts.server.stop().await.unwrap();
}

#[tokio::test]
async fn test_no_connections_after_stop() {
    let ts = TestServer::start(|_| {});
    assert_eq!(client().get(ts.url("/somepath")).send().await.unwrap().status(), 200);

    ts.server.stop().await.unwrap();
    assert!(client().get(ts.url("/somepath")).send().await.is_err());
    ts.server.stop().await.unwrap();
}

#[tokio::test]
async fn test_stop_is_not_held_up_by_idle_client() {
    let ts = TestServer::start(|_| {});
    let _idle = tokio::net::TcpStream::connect(ts.addr).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let stopped = tokio::time::timeout(std::time::Duration::from_secs(2), ts.server.stop()).await;
    assert!(matches!(stopped, Ok(Ok(()))));
    assert!(tokio::net::TcpStream::connect(ts.addr).await.is_err());
}
