mod files;

pub use files::*;

use crate::connection::{WsConfig, WsConnection, WsConnectionError};
use crate::http::{read_request_head, reject};
use crate::message::Message;
use async_io::{Async, Timer};
use futures::executor::{LocalPool, LocalSpawner};
use futures::prelude::*;
use futures::task::LocalSpawnExt;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

/// Reply sent for every message received.
pub const GREETING: &str = "Hello from the server!";

/// Pause after a failed accept, so persistent errors such as running out of file descriptors do
/// not turn the accept loop into a busy loop.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,
    /// Directory served to plain HTTP requests.
    pub document_root: PathBuf,
    pub subprotocols: Vec<String>,
    /// Read timeout for request heads and websocket frames.
    pub timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3210,
            document_root: PathBuf::from("./public"),
            subprotocols: vec!["json".to_string()],
            timeout: Duration::from_secs(60),
        }
    }
}

impl ServerConfig {
    pub fn ws_config(&self) -> WsConfig {
        let mut config = WsConfig::server();
        config.timeout = self.timeout;
        config.subprotocols = self.subprotocols.clone();
        config
    }
}

pub struct Server {
    listener: Async<TcpListener>,
    config: Rc<ServerConfig>,
}

impl Server {
    pub fn bind(config: ServerConfig) -> io::Result<Self> {
        let listener = Async::<TcpListener>::bind((config.address, config.port))?;
        Ok(Self {
            listener,
            config: Rc::new(config),
        })
    }
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.get_ref().local_addr()
    }
    /// Accepts connections forever, handling each on its own task.
    pub async fn run(self, spawner: LocalSpawner) -> io::Result<()> {
        log::info!("server running at http://{}", self.local_addr()?);
        loop {
            let (stream, peer) = retry_accept(|| self.listener.accept()).await;
            let config = self.config.clone();
            let spawned = spawner.spawn_local(async move {
                match handle_connection(stream, &config).await {
                    Ok(()) => log::debug!("{} disconnected", peer),
                    Err(err) => log::info!("{} disconnected: {}", peer, err),
                }
            });
            if let Err(err) = spawned {
                log::error!("cannot spawn connection task: {}", err);
            }
        }
    }
}

// Calls `accept` until it succeeds, pausing after each failure.
async fn retry_accept<F, Fut, S>(mut accept: F) -> S
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<S>>,
{
    loop {
        match accept().await {
            Ok(accepted) => return accepted,
            Err(err) => {
                log::warn!("accept failed: {}", err);
                Timer::after(ACCEPT_BACKOFF).await;
            }
        }
    }
}

/// Binds according to `config` and serves on the current thread. Only returns on bind errors.
pub fn serve(config: ServerConfig) -> io::Result<()> {
    let server = Server::bind(config)?;
    let mut pool = LocalPool::new();
    let spawner = pool.spawner();
    pool.run_until(server.run(spawner))
}

/// Routes one accepted connection. Requests carrying an `Upgrade` header go down the websocket
/// path, where anything but `websocket` is answered with 400; all others get a static file. The
/// request head must arrive within the configured timeout, and malformed heads get a 400 too.
pub async fn handle_connection(
    mut stream: Async<TcpStream>,
    config: &ServerConfig,
) -> Result<(), WsConnectionError> {
    let read_head = read_request_head(&mut stream).map_err(WsConnectionError::from);
    let expire = async {
        Timer::after(config.timeout).await;
        Err(WsConnectionError::Timeout)
    };
    let (request, buffered) = match futures_lite::future::or(read_head, expire).await {
        Ok(head) => head,
        Err(WsConnectionError::RequestHead(err)) if err.is_malformed() => {
            log::warn!("rejecting request head: {}", err);
            reject(&mut stream, &err.to_string()).await?;
            return Err(err.into());
        }
        Err(err) => return Err(err),
    };
    if !request.headers().contains_key(http::header::UPGRADE) {
        serve_file(&mut stream, &request, &config.document_root).await?;
        return Ok(());
    }
    let mut ws = WsConnection::with_buffered(stream, config.ws_config(), buffered);
    ws.upgrade(&request).await?;
    greet(&mut ws).await
}

/// Answers every message with [`GREETING`] until the client goes away.
pub async fn greet<T: AsyncRead + AsyncWrite + Unpin>(
    ws: &mut WsConnection<T>,
) -> Result<(), WsConnectionError> {
    let reply = Message::text(GREETING);
    loop {
        match ws.recv().await {
            Ok(Some(message)) => {
                log::info!("received {}", message.value());
                ws.send(&reply).await?;
            }
            Ok(None) => {
                log::info!("websocket connection closed by the client");
                return Ok(());
            }
            Err(err) if !err.is_fatal() => log::warn!("skipping message: {}", err),
            Err(err) => return Err(err),
        }
    }
}
