//! Re-editable image annotations
//!
//! Vector shapes (arrows, mosaics, magnifiers, numbered markers, crops) are
//! drawn over a raster background with tiny-skia. The editable scene travels
//! inside exported PNG files as a text chunk, so an exported image can be
//! reopened and edited again.

pub mod annotations;
pub mod config;
pub mod domain;
pub mod error;
pub mod persist;
pub mod render;
pub mod session;

pub use config::{EditorConfig, ShapeColor};
pub use error::{EditorError, EditorResult};
pub use session::EditSession;
