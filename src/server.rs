//! Simulator-facing WebSocket server.
//!
//! Every accepted TCP connection is peeked: WebSocket upgrade requests are
//! handed to `tokio-tungstenite` and served by their own [`Session`]; any
//! other HTTP request gets a tiny static page so browsers and health checks
//! see something.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::{Config, ServerConfig};
use crate::error::ServerError;
use crate::session::Session;

const INDEX_HTML: &str = "<h1>Hello world!</h1>";

/// Bind the listening socket. Failure here is fatal at startup.
pub async fn bind(server: &ServerConfig) -> Result<TcpListener, ServerError> {
    let addr = server.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind { addr: addr.clone(), source })?;
    info!(addr = %addr, "Listening");
    Ok(listener)
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: Config) -> Result<(), ServerError> {
    let listener = bind(&config.server).await?;
    run(listener, Arc::new(config)).await
}

/// Accept connections on an already-bound listener.
pub async fn run(listener: TcpListener, config: Arc<Config>) -> Result<(), ServerError> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let config = Arc::clone(&config);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer, config).await {
                warn!(peer = %peer, error = %e, "connection error");
            }
        });
    }
}

async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    config: Arc<Config>,
) -> Result<(), ServerError> {
    let mut peek_buf = [0u8; 2048];
    let peek_n = stream.peek(&mut peek_buf).await?;
    if peek_n == 0 {
        return Ok(());
    }
    let head = RequestHead::parse(&peek_buf[..peek_n]);

    if head.upgrade {
        match tokio_tungstenite::accept_async(stream).await {
            Ok(ws) => serve_websocket(ws, peer, &config).await,
            Err(e) => {
                warn!(peer = %peer, error = %e, "WS handshake error");
                Ok(())
            }
        }
    } else {
        // Only drains the request; `head` was parsed from the peeked bytes.
        stream.read_exact(&mut peek_buf[..peek_n]).await?;
        let body = if head.path == "/" { INDEX_HTML } else { "" };
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body,
        );
        stream.write_all(response.as_bytes()).await?;
        Ok(())
    }
}

async fn serve_websocket(
    ws: tokio_tungstenite::WebSocketStream<TcpStream>,
    peer: SocketAddr,
    config: &Config,
) -> Result<(), ServerError> {
    let mut session = Session::new(config);
    let span = info_span!("session", id = %session.id(), peer = %peer);

    async move {
        info!(tuning = session.tuning_active(), "Connected");
        let (mut sink, mut frames) = ws.split();

        while let Some(msg) = frames.next().await {
            let text = match msg? {
                WsMessage::Text(text) => text,
                WsMessage::Close(_) => break,
                _ => continue,
            };
            match session.handle_frame(&text) {
                Ok(Some(cmd)) => {
                    debug!(command = cmd.name(), "reply");
                    sink.send(WsMessage::Text(cmd.encode())).await?;
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "dropping frame"),
            }
        }

        if let Some(tuner) = session.tuner() {
            info!(
                gains = %tuner.gains(),
                best_error = tuner.best_error(),
                trials = tuner.trials(),
                converged = tuner.is_converged(),
                "Disconnected"
            );
        } else {
            info!("Disconnected");
        }
        Ok::<(), ServerError>(())
    }
    .instrument(span)
    .await
}

// ---------------------------------------------------------------------------
// Request sniffing
// ---------------------------------------------------------------------------

/// What we need from the first bytes of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RequestHead {
    path: String,
    upgrade: bool,
}

impl RequestHead {
    fn parse(buf: &[u8]) -> Self {
        let mut headers = [httparse::EMPTY_HEADER; 32];
        let mut req = httparse::Request::new(&mut headers);
        match req.parse(buf) {
            Ok(httparse::Status::Complete(_)) => {
                let upgrade = req.headers.iter().any(|h| {
                    h.name.eq_ignore_ascii_case("upgrade")
                        && String::from_utf8_lossy(h.value).trim().eq_ignore_ascii_case("websocket")
                });
                Self {
                    path: req.path.unwrap_or("/").to_string(),
                    upgrade,
                }
            }
            // Headers larger than the peek window: fall back to a text scan.
            Ok(httparse::Status::Partial) => {
                let text = String::from_utf8_lossy(buf).to_ascii_lowercase();
                Self {
                    path: req.path.unwrap_or("/").to_string(),
                    upgrade: text.contains("upgrade: websocket"),
                }
            }
            Err(_) => Self { path: String::new(), upgrade: false },
        }
    }
}
