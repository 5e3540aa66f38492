//! Shared canvas vocabulary: cell mutations, channel frames and the
//! agent's local view of the grid.

pub mod frames;
pub mod mutation;
pub mod view;

pub use frames::{InboundFrame, OutboundFrame};
pub use mutation::{GRID_MAX, GRID_SIZE, PixelMutation, normalize_color, parse_pixels};
pub use view::{CanvasView, Neighbor};
