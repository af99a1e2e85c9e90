//! WebSocket push transport

use async_trait::async_trait;
use futures::StreamExt;
use nest_sync::{ChannelStream, Result, SyncError, Transport};
use reqwest::Url;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

/// How long `close` waits for the server to acknowledge
pub const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Connects to the push endpoint with the bearer token as a query parameter
pub struct WsTransport {
    ws_url: String,
    close_timeout: Duration,
}

impl WsTransport {
    /// Transport for the endpoint at `ws_url` (e.g. `ws://localhost:8001/v1/ws`)
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            close_timeout: CLOSE_TIMEOUT,
        }
    }

    /// Give up on the close handshake after `timeout` and drop the socket
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Endpoint URL for `token`
    pub fn endpoint(&self, token: &str) -> Result<Url> {
        Url::parse_with_params(&self.ws_url, &[("token", token)])
            .map_err(|e| SyncError::Network(format!("invalid push URL {}: {}", self.ws_url, e)))
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self, token: &str) -> Result<Box<dyn ChannelStream>> {
        let url = self.endpoint(token)?;
        debug!(endpoint = %self.ws_url, "connecting push channel");

        let (stream, _response) = connect_async(url.as_str())
            .await
            .map_err(|e| SyncError::Network(format!("push connect failed: {}", e)))?;

        info!(endpoint = %self.ws_url, "push channel connected");
        Ok(Box::new(WsStream {
            inner: stream,
            close_timeout: self.close_timeout,
        }))
    }
}

struct WsStream {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
    close_timeout: Duration,
}

#[async_trait]
impl ChannelStream for WsStream {
    async fn next_frame(&mut self) -> Option<Result<String>> {
        loop {
            match self.inner.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(frame)) => {
                    debug!(?frame, "push channel closed by server");
                    return None;
                }
                Ok(Message::Binary(data)) => {
                    debug!(len = data.len(), "ignoring binary frame");
                }
                Ok(_) => {}
                Err(e) => return Some(Err(SyncError::Network(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        let timeout = self.close_timeout;
        let inner = &mut self.inner;
        let handshake = async move {
            inner
                .close(None)
                .await
                .map_err(|e| SyncError::Network(format!("push close failed: {}", e)))?;
            // Drain until the server acknowledges the close.
            while let Some(Ok(_)) = inner.next().await {}
            Ok::<_, SyncError>(())
        };

        match tokio::time::timeout(timeout, handshake).await {
            Ok(result) => result,
            Err(_) => {
                debug!(?timeout, "no close acknowledgement, dropping socket");
                Ok(())
            }
        }
    }
}
