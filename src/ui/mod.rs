//! Terminal User Interface module.
//!
//! This module is the rendering side of the reader. It never touches story
//! state directly: it draws [`crate::app::State`] snapshots and turns key
//! presses into [`crate::app::Event`]s.
//!
//! # Module Structure
//!
//! - `loop_runner` - Main event loop (receive-and-fold) and terminal management
//! - `input` - Keyboard input handling
//! - `render` - Layout and category tabs
//! - `stories` - Story list widget
//! - `status` - Status bar widget

mod input;
mod loop_runner;
mod render;
mod status;
mod stories;

pub use loop_runner::{run, Action};
