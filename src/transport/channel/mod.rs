pub mod traits;
pub mod websocket;

pub use traits::CanvasChannel;
pub use websocket::WsCanvasChannel;
