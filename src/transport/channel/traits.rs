use std::future::Future;
use std::pin::Pin;

use crate::canvas::OutboundFrame;
use crate::error::ChannelError;

/// The single shared connection to the canvas server.
///
/// Implementations serialize writes internally, so the scheduler and the
/// heartbeat emitter may both hold the channel and send concurrently.
pub trait CanvasChannel: Send + Sync {
    /// Human-readable transport name (e.g. "websocket").
    fn name(&self) -> &str;

    /// Write one frame. Fails fast while the connection is down.
    fn send_frame<'a>(
        &'a self,
        frame: &'a OutboundFrame,
    ) -> Pin<Box<dyn Future<Output = Result<(), ChannelError>> + Send + 'a>>;

    fn is_open(&self) -> bool;

    /// Close the connection. Later sends fail with [`ChannelError::Closed`].
    fn close(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}
