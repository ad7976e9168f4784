//! Mosaic (pixelation) regions
//!
//! Blocks are filled with a single pixel sampled from a live composite of the
//! scene. Sample points are snapped to a grid anchored at the background
//! origin so neighbouring regions tile consistently.

use tiny_skia::{Stroke, Transform};

use super::geometry::mosaic as consts;
use super::image::{rect_path, sample_pixel, solid_paint};
use super::{RenderContext, SceneView, sampler};
use crate::domain::{Matrix, MosaicBody, Point, Rect, Shape};

pub fn draw_mosaic(ctx: &mut RenderContext<'_>, scene: &SceneView<'_>, shape: &Shape, body: &MosaicBody) {
    let transform = ctx.shape_matrix(shape).to_skia();
    if let Err(reason) = draw_blocks(ctx, scene, shape, body, transform) {
        log::debug!("Mosaic {} uses placeholder: {reason}", shape.id);
        draw_placeholder(ctx, shape, body, transform);
    }
    if shape.stroke_width > 0.0
        && !shape.stroke_color.is_transparent()
        && let Some(path) = rect_path(shape.local_bounds())
    {
        let stroke = Stroke {
            width: shape.stroke_width,
            ..Default::default()
        };
        ctx.pixmap.stroke_path(
            &path,
            &solid_paint(shape.stroke_color.to_rgba_u8()),
            &stroke,
            transform,
            None,
        );
    }
}

fn draw_blocks(
    ctx: &mut RenderContext<'_>,
    scene: &SceneView<'_>,
    shape: &Shape,
    body: &MosaicBody,
    transform: Transform,
) -> Result<(), &'static str> {
    if !scene.has_content() {
        return Err("nothing to sample");
    }
    let reference = scene.reference_rect().ok_or("no reference extent")?;
    let (tw, th) = (reference.width().ceil(), reference.height().ceil());
    if !(tw >= 1.0 && th >= 1.0) {
        return Err("empty reference extent");
    }
    let buffer = sampler::composite(
        scene,
        &shape.id,
        Matrix::translate(-reference.left, -reference.top),
        tw as u32,
        th as u32,
    )
    .ok_or("off-screen buffer unavailable")?;

    let matrix = shape.matrix();
    let origin = scene.grid_origin();
    let step_x = body.block_size * shape.transform.scale_x.abs();
    let step_y = body.block_size * shape.transform.scale_y.abs();
    for block in block_grid(shape.width, shape.height, body.block_size) {
        let center = matrix.apply(block.center());
        let snapped = snap_to_grid(center, origin, step_x, step_y);
        let x = (snapped.x - reference.left).floor() as i64;
        let y = (snapped.y - reference.top).floor() as i64;
        let Some(rgba) = sample_pixel(&buffer, x, y) else {
            continue;
        };
        // Transparent samples keep the backdrop transparent
        if rgba[3] == 0 {
            continue;
        }
        if let Some(rect) = block.to_skia() {
            ctx.pixmap.fill_rect(rect, &solid_paint(rgba), transform, None);
        }
    }
    Ok(())
}

/// Neutral gray blocks shown when there is nothing to sample
fn draw_placeholder(ctx: &mut RenderContext<'_>, shape: &Shape, body: &MosaicBody, transform: Transform) {
    let border = Stroke {
        width: consts::PLACEHOLDER_BORDER_WIDTH,
        ..Default::default()
    };
    let border_paint = solid_paint(consts::PLACEHOLDER_BORDER);
    let rows = (shape.height / body.block_size).ceil().max(1.0) as usize;
    let blocks = block_grid(shape.width, shape.height, body.block_size);
    for (i, block) in blocks.into_iter().enumerate() {
        let (col, row) = (i / rows, i % rows);
        let fill = if (col + row) % 2 == 0 {
            consts::PLACEHOLDER_LIGHT
        } else {
            consts::PLACEHOLDER_DARK
        };
        if let Some(rect) = block.to_skia() {
            ctx.pixmap.fill_rect(rect, &solid_paint(fill), transform, None);
        }
        if let Some(path) = rect_path(block) {
            ctx.pixmap
                .stroke_path(&path, &border_paint, &border, transform, None);
        }
    }
}

/// Local block rects covering a `width` x `height` extent centered on the
/// origin, column by column. Edge blocks are clipped to the extent.
pub fn block_grid(width: f32, height: f32, block: f32) -> Vec<Rect> {
    let mut blocks = Vec::new();
    if !(block > 0.0 && width > 0.0 && height > 0.0) {
        return blocks;
    }
    let (half_w, half_h) = (width * 0.5, height * 0.5);
    let mut x = -half_w;
    while x < half_w {
        let mut y = -half_h;
        while y < half_h {
            blocks.push(Rect::new(x, y, (x + block).min(half_w), (y + block).min(half_h)));
            y += block;
        }
        x += block;
    }
    blocks
}

/// Center of the grid cell containing `p`
pub fn snap_to_grid(p: Point, origin: Point, step_x: f32, step_y: f32) -> Point {
    let snap = |v: f32, o: f32, step: f32| {
        if step > 0.0 {
            ((v - o) / step).floor() * step + step * 0.5 + o
        } else {
            v
        }
    };
    Point::new(snap(p.x, origin.x, step_x), snap(p.y, origin.y, step_y))
}
