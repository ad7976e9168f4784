//! Off-screen compositing of the scene for shapes that sample what lies
//! beneath them
//!
//! Each call allocates a fresh buffer; nothing is cached between frames since
//! the underlying content may have moved.

use tiny_skia::Pixmap;

use super::image::draw_background_image;
use super::{RenderContext, SceneView, render_shape};
use crate::domain::{Matrix, Shape};

/// Whether `shape` takes part in composites requested by `requester`
pub fn contributes(shape: &Shape, requester: &str) -> bool {
    shape.visible && shape.id != requester && !shape.kind().is_sampling_helper()
}

/// Render the background and every contributing shape into a new
/// `width` x `height` buffer through the scene-to-buffer matrix `target`.
///
/// Returns `None` when the buffer cannot be allocated.
pub fn composite(
    scene: &SceneView<'_>,
    requester: &str,
    target: Matrix,
    width: u32,
    height: u32,
) -> Option<Pixmap> {
    let mut pixmap = Pixmap::new(width, height)?;
    if let Some(bg) = scene.background {
        draw_background_image(&mut pixmap, bg, &target);
    }
    let mut ctx = RenderContext::new(&mut pixmap, target);
    ctx.interactive = false;
    for shape in scene.shapes.iter().filter(|s| contributes(s, requester)) {
        render_shape(&mut ctx, scene, shape);
    }
    Some(pixmap)
}
