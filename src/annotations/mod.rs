//! Control handles and the drag actions behind them
//!
//! This module provides:
//! - The per-kind handle map and handle screen positions
//! - Drag sessions that turn pointer motion into shape edits

pub mod handlers;
pub mod handles;

pub use handlers::{DragModifiers, DragSession, DragTarget, press_bend};
pub use handles::{Handle, ResizeHandle, handle_at, handles_for, screen_position};
