//! Terminal UI module using ratatui.
//!
//! - `render`: frame rendering and the shared screen layout
//! - `input`: keyboard and mouse event handling
//! - `styles`: color schemes and text styling

pub mod input;
pub mod render;
pub mod styles;
