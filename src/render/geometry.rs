//! Shared geometry constants for shape rendering
//!
//! Sizes are in device pixels unless noted otherwise.

/// Arrow outline constants
pub mod arrow {
    /// Start width of a tapered shaft, as a fraction of the visual width
    pub const TAPER_START: f32 = 0.2;
    /// Head length multiplier for the hollow contour outline
    pub const CONTOUR_HEAD_LENGTH: f32 = 7.5;
    /// Head half-width multiplier for the hollow contour outline
    pub const CONTOUR_HEAD_WIDTH: f32 = 3.5;
    /// Shaft width at the neck of the hollow contour
    pub const CONTOUR_NECK_WIDTH: f32 = 2.0;
    /// Swallowtail neck indent, as a fraction of the head length
    pub const CONTOUR_SWALLOW_INDENT: f32 = 0.75;
    /// Outline width of the hollow contour, as a fraction of the visual width
    pub const CONTOUR_LINE: f32 = 0.4;
    pub const CONTOUR_MITER_LIMIT: f32 = 10.0;
    /// Samples used to outline curved shafts
    pub const CURVE_STEPS: usize = 40;
}

/// Mosaic placeholder colors
pub mod mosaic {
    pub const PLACEHOLDER_LIGHT: [u8; 4] = [0xcc, 0xcc, 0xcc, 0xff];
    pub const PLACEHOLDER_DARK: [u8; 4] = [0xbb, 0xbb, 0xbb, 0xff];
    pub const PLACEHOLDER_BORDER: [u8; 4] = [0x99, 0x99, 0x99, 0xff];
    pub const PLACEHOLDER_BORDER_WIDTH: f32 = 0.5;
}

/// Magnifier and source marker styling
pub mod magnifier {
    pub const PLACEHOLDER_FILL: [u8; 4] = [200, 200, 200, 77];
    pub const PLACEHOLDER_TEXT: [u8; 4] = [0x66, 0x66, 0x66, 0xff];
    /// Font size of the placeholder caption
    pub const PLACEHOLDER_TEXT_SIZE: f32 = 12.0;
    pub const SOURCE_DASH: [f32; 2] = [5.0, 5.0];
    /// Largest side of an off-screen magnifier buffer
    pub const MAX_BUFFER_SIDE: f32 = 4096.0;
}

/// Selection chrome
pub mod selection {
    pub const BORDER: [u8; 4] = [0x51, 0xb9, 0xf9, 0xff];
    pub const CORNER_FILL: [u8; 4] = [0xff, 0xff, 0xff, 0xff];
    pub const CORNER_STROKE: [u8; 4] = [0x0e, 0x98, 0xfc, 0xff];
    pub const CORNER_SIZE: f32 = 10.0;
    pub const DELETE_FILL: [u8; 4] = [0xff, 0x44, 0x44, 0xff];
    pub const CONFIRM_FILL: [u8; 4] = [0x22, 0xaa, 0x55, 0xff];
    pub const ICON_RADIUS: f32 = 9.0;
}

/// Ellipse bezier approximation constant: 4/3 * (sqrt(2) - 1)
pub const BEZIER_K: f32 = 0.552_284_8;
