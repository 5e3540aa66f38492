pub mod channel;
pub mod observation;

pub use channel::{CanvasChannel, WsCanvasChannel};
pub use observation::{ActionReport, HttpObservationApi, ObservationApi};
