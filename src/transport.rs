use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use prost::Message;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, trace};
use url::Url;

use crate::protocol::proto::{self, Functions};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("url error: {0}")]
    Url(#[from] url::ParseError),
    #[error("protocol error: {0}")]
    Protocol(#[from] prost::DecodeError),
    #[error("channel closed")]
    Closed,
}

/// One request in flight, one response back.
#[async_trait]
pub trait Transport: Send {
    async fn call(&mut self, request: proto::Request) -> Result<proto::Response, TransportError>;

    async fn close(&mut self) -> Result<(), TransportError>;
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Command channel over a websocket: each binary frame is one encoded
/// `Request` going out or one `Response` coming back.
///
/// Replies are matched to requests by function. A call dropped after its
/// frame was queued leaves its reply owed; the next call drains it first.
pub struct WsTransport {
    ws: Option<WsStream>,
    in_flight: Option<Functions>,
}

impl WsTransport {
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let url = Url::parse(url)?;
        debug!(%url, "connecting command channel");
        let (ws, _) = connect_async(url).await?;
        Ok(Self {
            ws: Some(ws),
            in_flight: None,
        })
    }

    async fn read_response(ws: &mut WsStream, function: Functions) -> Result<proto::Response, TransportError> {
        loop {
            let message = ws.next().await.ok_or(TransportError::Closed)??;
            match message {
                WsMessage::Binary(data) => {
                    let response = proto::Response::decode(&*data)?;
                    if response.func == function as i32 {
                        return Ok(response);
                    }
                    debug!(
                        expected = function.as_str_name(),
                        got = response.func().as_str_name(),
                        "skipping unmatched reply"
                    );
                }
                WsMessage::Text(_) => continue,
                WsMessage::Close(_) => return Err(TransportError::Closed),
                WsMessage::Ping(_) | WsMessage::Pong(_) => continue,
                _ => continue,
            }
        }
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn call(&mut self, request: proto::Request) -> Result<proto::Response, TransportError> {
        let ws = self.ws.as_mut().ok_or(TransportError::Closed)?;

        if let Some(owed) = self.in_flight {
            debug!(function = owed.as_str_name(), "draining reply of abandoned request");
            ws.flush().await?;
            Self::read_response(ws, owed).await?;
            self.in_flight = None;
        }

        let function = request.func();
        trace!(function = function.as_str_name(), "sending request");
        ws.feed(WsMessage::Binary(request.encode_to_vec())).await?;
        self.in_flight = Some(function);
        ws.flush().await?;

        let response = Self::read_response(ws, function).await?;
        self.in_flight = None;
        Ok(response)
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.in_flight = None;
        match self.ws.take() {
            Some(mut ws) => {
                ws.close(None).await?;
                Ok(())
            }
            None => Ok(()),
        }
    }
}
