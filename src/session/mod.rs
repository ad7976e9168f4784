//! Editing session
//!
//! This module contains:
//! - The shape list with its background, selection and drag state
//! - Pointer dispatch onto handles and shapes
//! - Save/open through the embedded scene payload

pub mod state;

pub use state::{EditSession, PressOutcome, ShapeChange, ShapeListener};
