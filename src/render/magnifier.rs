//! Magnifier view rendering
//!
//! The view shows a zoomed composite of the scene around its source marker,
//! clipped to its own outline. The buffer is rendered at device resolution so
//! the zoomed content stays crisp.

use tiny_skia::{FillRule, FilterQuality, Mask, PixmapPaint};

use super::frames::stroke_outline;
use super::geometry::magnifier as consts;
use super::image::{ellipse_path, rect_path, solid_paint};
use super::text::draw_text;
use super::{RenderContext, SceneView, sampler};
use crate::domain::{MagnifierShape, MagnifierViewBody, Matrix, Point, Shape};

pub fn draw_view(ctx: &mut RenderContext<'_>, scene: &SceneView<'_>, shape: &Shape, body: &MagnifierViewBody) {
    if !draw_magnified(ctx, scene, shape, body) {
        draw_placeholder(ctx, shape, body.magnifier_shape);
    }
    stroke_outline(ctx, shape, body.magnifier_shape, None);
}

/// Scene point the view is centered on: its source's center, or its own
/// center when the source is missing.
pub fn focus_point(scene: &SceneView<'_>, shape: &Shape, body: &MagnifierViewBody) -> Point {
    match body.source_id.as_deref() {
        Some(id) => match scene.find(id) {
            Some(source) => source.center(),
            None => {
                log::debug!("Magnifier {} lost its source {id}", shape.id);
                shape.center()
            }
        },
        None => shape.center(),
    }
}

/// Scene-to-buffer matrix: `focus` lands in the buffer center, zoomed by
/// `magnification`, at `ratio` buffer pixels per local unit.
pub fn zoom_matrix(focus: Point, width: f32, height: f32, magnification: f32, ratio: f32) -> Matrix {
    Matrix::scale(ratio, ratio)
        .multiply(&Matrix::translate(width * 0.5, height * 0.5))
        .multiply(&Matrix::scale(magnification, magnification))
        .multiply(&Matrix::translate(-focus.x, -focus.y))
}

fn draw_magnified(
    ctx: &mut RenderContext<'_>,
    scene: &SceneView<'_>,
    shape: &Shape,
    body: &MagnifierViewBody,
) -> bool {
    let (w, h) = (shape.width, shape.height);
    if !(w > 0.0 && h > 0.0) {
        return false;
    }
    let device = ctx.shape_matrix(shape);
    let (sx, sy) = device.axis_scales();
    let mut ratio = sx.max(sy).max(1e-3);
    let longest = w.max(h) * ratio;
    if longest > consts::MAX_BUFFER_SIDE {
        ratio *= consts::MAX_BUFFER_SIDE / longest;
    }
    let (bw, bh) = ((w * ratio).ceil() as u32, (h * ratio).ceil() as u32);

    let focus = focus_point(scene, shape, body);
    let target = zoom_matrix(focus, w, h, body.magnification.max(1.0), ratio);
    let Some(buffer) = sampler::composite(scene, &shape.id, target, bw, bh) else {
        return false;
    };

    let Some(mut mask) = Mask::new(ctx.pixmap.width(), ctx.pixmap.height()) else {
        return false;
    };
    let local = shape.local_bounds();
    let clip = match body.magnifier_shape {
        MagnifierShape::Rect => rect_path(local),
        MagnifierShape::Ellipse => ellipse_path(local),
    };
    let Some(clip) = clip else {
        return false;
    };
    mask.fill_path(&clip, FillRule::Winding, true, device.to_skia());

    let placement = device
        .multiply(&Matrix::translate(-w * 0.5, -h * 0.5))
        .multiply(&Matrix::scale(1.0 / ratio, 1.0 / ratio));
    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    ctx.pixmap
        .draw_pixmap(0, 0, buffer.as_ref(), &paint, placement.to_skia(), Some(&mask));
    true
}

fn draw_placeholder(ctx: &mut RenderContext<'_>, shape: &Shape, magnifier_shape: MagnifierShape) {
    let transform = ctx.shape_matrix(shape).to_skia();
    let local = shape.local_bounds();
    let fill = match magnifier_shape {
        MagnifierShape::Rect => rect_path(local),
        MagnifierShape::Ellipse => ellipse_path(local),
    };
    if let Some(path) = fill {
        ctx.pixmap.fill_path(
            &path,
            &solid_paint(consts::PLACEHOLDER_FILL),
            FillRule::Winding,
            transform,
            None,
        );
    }
    draw_text(
        ctx.pixmap,
        "No Image",
        Point::ZERO,
        consts::PLACEHOLDER_TEXT_SIZE,
        &solid_paint(consts::PLACEHOLDER_TEXT),
        transform,
    );
}
