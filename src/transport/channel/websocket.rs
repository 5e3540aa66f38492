use anyhow::{Context, Result};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use super::traits::CanvasChannel;
use crate::canvas::{CanvasView, InboundFrame, OutboundFrame};
use crate::diagnostics::health;
use crate::error::ChannelError;

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Canvas channel over a websocket.
///
/// [`WsCanvasChannel::connect_and_listen`] owns one connection for its whole
/// lifetime: it publishes the write half for senders and feeds every inbound
/// frame into the shared [`CanvasView`]. It returns when the socket closes,
/// and the caller reconnects it under a backoff supervisor.
pub struct WsCanvasChannel {
    url: String,
    view: Arc<CanvasView>,
    sink: Mutex<Option<WsSink>>,
    open: AtomicBool,
    closed: AtomicBool,
}

impl WsCanvasChannel {
    pub fn new(url: impl Into<String>, view: Arc<CanvasView>) -> Self {
        Self {
            url: url.into(),
            view,
            sink: Mutex::new(None),
            open: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub async fn connect_and_listen(&self, cancel: &CancellationToken) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(());
        }

        let (ws_stream, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .with_context(|| format!("connect canvas websocket: {}", self.url))?;
        let (write, mut read) = ws_stream.split();

        *self.sink.lock().await = Some(write);
        self.open.store(true, Ordering::Release);
        health::mark_component_ok("canvas");
        tracing::info!(url = %self.url, "Canvas channel connected");

        let outcome = loop {
            tokio::select! {
                () = cancel.cancelled() => break Ok(()),
                message = read.next() => {
                    let Some(message) = message else {
                        tracing::warn!("Canvas socket closed; reconnecting");
                        break Ok(());
                    };
                    match message {
                        Ok(Message::Text(text)) => self.handle_text(text.as_str()),
                        Ok(Message::Close(_)) => {
                            tracing::warn!("Canvas server closed the connection");
                            break Ok(());
                        }
                        Ok(_) => {}
                        Err(e) => break Err(anyhow::Error::new(e).context("read canvas message")),
                    }
                }
            }
        };

        self.open.store(false, Ordering::Release);
        if let Some(mut sink) = self.sink.lock().await.take()
            && cancel.is_cancelled()
        {
            let _ = sink.send(Message::Close(None)).await;
            let _ = sink.close().await;
        }
        if let Err(e) = &outcome {
            health::mark_component_error("canvas", e);
        }
        outcome
    }

    fn handle_text(&self, text: &str) {
        match InboundFrame::parse(text) {
            Some(InboundFrame::Unknown) => {}
            Some(frame) => {
                if let InboundFrame::InitialState { my_user_id, .. } = &frame {
                    tracing::info!(user_id = %my_user_id, "Canvas assigned identity");
                }
                self.view.apply_inbound(&frame);
            }
            None => tracing::debug!("Ignoring undecodable canvas frame"),
        }
    }
}

impl CanvasChannel for WsCanvasChannel {
    fn name(&self) -> &str {
        "websocket"
    }

    fn send_frame<'a>(
        &'a self,
        frame: &'a OutboundFrame,
    ) -> Pin<Box<dyn Future<Output = Result<(), ChannelError>> + Send + 'a>> {
        Box::pin(async move {
            if self.closed.load(Ordering::Acquire) {
                return Err(ChannelError::Closed);
            }
            let mut guard = self.sink.lock().await;
            let sink = guard.as_mut().ok_or(ChannelError::NotConnected)?;
            sink.send(Message::Text(frame.to_json().into()))
                .await
                .map_err(|e| ChannelError::Send(e.to_string()))
        })
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) && !self.closed.load(Ordering::Acquire)
    }

    fn close(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            self.closed.store(true, Ordering::Release);
            self.open.store(false, Ordering::Release);
            if let Some(mut sink) = self.sink.lock().await.take() {
                let _ = sink.send(Message::Close(None)).await;
                let _ = sink.close().await;
            }
        })
    }
}
