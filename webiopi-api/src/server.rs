//! HTTP listener lifecycle
//!
//! [`HttpServer`] owns the configuration and backend; `start` binds the
//! socket and drives the accept loop on a separate tokio task, `stop`
//! signals that task and waits for it to release the socket.

use std::convert::Infallible;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use webiopi_core::config::{ServeMode, ServerConfig};
use webiopi_core::{BackendHandler, Error, Result};

use crate::router::RequestRouter;

/// The embedded HTTP server
pub struct HttpServer {
    config: Arc<ServerConfig>,
    router: Arc<RequestRouter>,
    running: Mutex<Option<RunningServer>>,
}

struct RunningServer {
    addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<Result<()>>,
}

impl HttpServer {
    /// Create a stopped server
    pub fn new(config: ServerConfig, backend: Arc<dyn BackendHandler>) -> Self {
        let config = Arc::new(config);
        Self {
            router: Arc::new(RequestRouter::new(config.clone(), backend)),
            config,
            running: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the listener and start accepting in the background
    ///
    /// Must be called from within a tokio runtime. Bind failures are
    /// returned here and nothing is left running.
    pub fn start(&self) -> Result<SocketAddr> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Internal(format!("HTTP server needs a tokio runtime: {}", e)))?;

        let mut running = self.running.lock();
        if let Some(current) = running.as_ref() {
            if !current.task.is_finished() {
                return Err(Error::AlreadyRunning);
            }
            tracing::warn!("Previous accept loop on {} had already ended", current.addr);
        }

        let listen = self.config.listen_addr();
        let std_listener = std::net::TcpListener::bind((self.config.host.as_str(), self.config.port))
            .map_err(|e| bind_error(&listen, e))?;
        std_listener.set_nonblocking(true)?;

        let listener = {
            let _guard = handle.enter();
            TcpListener::from_std(std_listener)?
        };
        let addr = listener.local_addr()?;

        tracing::info!(
            "🌐 HTTP Server bound on http://{}:{}{}",
            self.config.host,
            addr.port(),
            self.config.context
        );

        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = handle.spawn(accept_loop(
            listener,
            self.router.clone(),
            self.config.serve_mode,
            shutdown_rx,
        ));

        *running = Some(RunningServer {
            addr,
            shutdown,
            task,
        });
        Ok(addr)
    }

    /// Stop accepting and release the socket; a no-op when not running
    ///
    /// Returns the accept loop's error if it had failed on its own.
    pub async fn stop(&self) -> Result<()> {
        let Some(running) = self.running.lock().take() else {
            return Ok(());
        };

        let _ = running.shutdown.send(true);
        match running.task.await {
            Ok(result) => result,
            Err(e) => Err(Error::Internal(format!("Accept loop panicked: {}", e))),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|r| !r.task.is_finished())
    }

    /// Address actually bound, while running
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().as_ref().map(|r| r.addr)
    }
}

impl Drop for HttpServer {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            let _ = running.shutdown.send(true);
        }
    }
}

fn bind_error(addr: &str, e: std::io::Error) -> Error {
    match e.kind() {
        ErrorKind::AddrInUse => Error::AddressInUse(addr.to_string()),
        ErrorKind::PermissionDenied => Error::PermissionDenied(addr.to_string()),
        _ => Error::Io(e),
    }
}

/// Pause before accepting again after running out of descriptors or buffers
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// How long a connection may keep working once shutdown is signalled
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// What the accept loop does with a failed `accept`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AcceptFailure {
    /// Concerns one connection only
    Skip,
    /// Process or system is out of resources; retry after a pause
    Backoff,
    /// The listening socket itself is broken
    Fatal,
}

fn classify_accept_error(e: &std::io::Error) -> AcceptFailure {
    match e.kind() {
        ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset | ErrorKind::Interrupted => {
            AcceptFailure::Skip
        }
        ErrorKind::OutOfMemory => AcceptFailure::Backoff,
        _ if is_resource_exhaustion(e) => AcceptFailure::Backoff,
        _ => AcceptFailure::Fatal,
    }
}

#[cfg(unix)]
fn is_resource_exhaustion(e: &std::io::Error) -> bool {
    matches!(
        e.raw_os_error(),
        Some(libc::EMFILE | libc::ENFILE | libc::ENOBUFS | libc::ENOMEM)
    )
}

#[cfg(not(unix))]
fn is_resource_exhaustion(_e: &std::io::Error) -> bool {
    false
}

async fn accept_loop(
    listener: TcpListener,
    router: Arc<RequestRouter>,
    mode: ServeMode,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    loop {
        let accepted = tokio::select! {
            biased;
            // a dropped sender means the server itself is gone
            _ = shutdown.changed() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, peer)) => match mode {
                ServeMode::Serial => {
                    serve_connection(stream, peer, router.clone(), false, shutdown.clone()).await;
                }
                ServeMode::PerConnection => {
                    tokio::spawn(serve_connection(
                        stream,
                        peer,
                        router.clone(),
                        true,
                        shutdown.clone(),
                    ));
                }
            },
            Err(e) => match classify_accept_error(&e) {
                AcceptFailure::Skip => tracing::warn!("HTTP accept error: {}", e),
                AcceptFailure::Backoff => {
                    tracing::warn!("HTTP accept error, retrying in {:?}: {}", ACCEPT_BACKOFF, e);
                    tokio::select! {
                        biased;
                        _ = shutdown.changed() => break,
                        _ = tokio::time::sleep(ACCEPT_BACKOFF) => {}
                    }
                }
                AcceptFailure::Fatal => {
                    tracing::error!("❌ HTTP Server accept loop failed: {}", e);
                    return Err(Error::Server(e.to_string()));
                }
            },
        }
    }

    drop(listener);
    tracing::info!("HTTP Server stopped");
    Ok(())
}

/// Serve one connection until it closes or shutdown is signalled
///
/// On shutdown an idle connection is closed at once; a request in flight
/// gets `SHUTDOWN_GRACE` to complete.
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    router: Arc<RequestRouter>,
    keep_alive: bool,
    mut shutdown: watch::Receiver<bool>,
) {
    let io = TokioIo::new(stream);
    let service = service_fn(move |req| {
        let router = router.clone();
        async move { Ok::<_, Infallible>(router.handle(req).await) }
    });

    let conn = http1::Builder::new()
        .keep_alive(keep_alive)
        .serve_connection(io, service);
    tokio::pin!(conn);

    // a dropped sender also counts as shutdown
    let stopping = async move {
        let _ = shutdown.wait_for(|stop| *stop).await;
    };

    let result = tokio::select! {
        result = conn.as_mut() => result,
        _ = stopping => {
            conn.as_mut().graceful_shutdown();
            match tokio::time::timeout(SHUTDOWN_GRACE, conn.as_mut()).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!("Dropping connection from {} after shutdown grace period", peer);
                    return;
                }
            }
        }
    };

    if let Err(err) = result {
        tracing::debug!("Error serving connection from {}: {:?}", peer, err);
    }
}
