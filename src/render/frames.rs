//! Framing shapes: crop (with shroud), background fill, magnifier source
//! marker and connector lines

use tiny_skia::{FillRule, LineCap, PathBuilder, Stroke, StrokeDash, Transform};

use super::RenderContext;
use super::geometry::magnifier::SOURCE_DASH;
use super::image::{device, ellipse_path, polyline_path, rect_path, solid_paint};
use crate::domain::{
    BackgroundBody, ConnectorBody, MagnifierShape, MagnifierSourceBody, Point, Rect, Shape,
};

/// Outline of a rect-like shape and the transform to draw it with. Uniform
/// strokes are drawn in the scale-compensated frame so the width ignores
/// the shape scale.
fn outline(
    ctx: &RenderContext<'_>,
    shape: &Shape,
    magnifier_shape: MagnifierShape,
) -> Option<(tiny_skia::Path, Transform)> {
    let local = shape.local_bounds();
    let (rect, matrix) = if shape.stroke_uniform {
        let (sx, sy) = (shape.transform.scale_x, shape.transform.scale_y);
        let scaled = Rect::from_points(local.corners().map(|p| p.scale_xy(sx, sy)))?;
        (scaled, ctx.compensated_matrix(shape))
    } else {
        (local, ctx.shape_matrix(shape))
    };
    let path = match magnifier_shape {
        MagnifierShape::Rect => rect_path(rect)?,
        MagnifierShape::Ellipse => ellipse_path(rect)?,
    };
    Some((path, matrix.to_skia()))
}

pub(crate) fn stroke_outline(
    ctx: &mut RenderContext<'_>,
    shape: &Shape,
    magnifier_shape: MagnifierShape,
    dash: Option<Vec<f32>>,
) {
    if shape.stroke_width <= 0.0 || shape.stroke_color.is_transparent() {
        return;
    }
    let Some((path, transform)) = outline(ctx, shape, magnifier_shape) else {
        return;
    };
    let stroke = Stroke {
        width: shape.stroke_width,
        dash: dash.and_then(|d| StrokeDash::new(d, 0.0)),
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

pub fn draw_source(ctx: &mut RenderContext<'_>, shape: &Shape, body: &MagnifierSourceBody) {
    stroke_outline(ctx, shape, body.magnifier_shape, Some(SOURCE_DASH.to_vec()));
}

pub fn draw_background(ctx: &mut RenderContext<'_>, shape: &Shape, body: &BackgroundBody) {
    if !body.fill.is_transparent()
        && let Some(rect) = shape.local_bounds().to_skia()
    {
        let transform = ctx.shape_matrix(shape).to_skia();
        ctx.pixmap
            .fill_rect(rect, &solid_paint(body.fill.to_rgba_u8()), transform, None);
    }
    stroke_outline(ctx, shape, MagnifierShape::Rect, None);
}

pub fn draw_connector(ctx: &mut RenderContext<'_>, shape: &Shape, body: &ConnectorBody) {
    if shape.stroke_width <= 0.0 || shape.stroke_color.is_transparent() {
        return;
    }
    // Endpoints go to device space first so the dash pattern is physical
    let m = ctx.shape_matrix(shape);
    let Some(path) = polyline_path(&[m.apply(body.p1), m.apply(body.p2)]) else {
        return;
    };
    let stroke = Stroke {
        width: shape.stroke_width,
        line_cap: LineCap::Butt,
        dash: StrokeDash::new(SOURCE_DASH.to_vec(), 0.0),
        ..Default::default()
    };
    ctx.pixmap.stroke_path(
        &path,
        &solid_paint(shape.stroke_color.to_rgba_u8()),
        &stroke,
        device(),
        None,
    );
}

/// Crop border, plus the dimming shroud over everything outside the crop
/// while editing interactively.
pub fn draw_crop(ctx: &mut RenderContext<'_>, shape: &Shape) {
    if ctx.interactive && !ctx.shroud_color.is_transparent() {
        let m = ctx.shape_matrix(shape);
        let hole = shape.local_bounds().corners().map(|p| m.apply(p));
        if let Some(path) = shroud_path(ctx.pixmap.width(), ctx.pixmap.height(), &hole) {
            ctx.pixmap.fill_path(
                &path,
                &solid_paint(ctx.shroud_color.to_rgba_u8()),
                FillRule::EvenOdd,
                device(),
                None,
            );
        }
    }
    stroke_outline(ctx, shape, MagnifierShape::Rect, None);
}

/// Viewport-sized rectangle with a hole, filled even-odd
pub fn shroud_path(width: u32, height: u32, hole: &[Point; 4]) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    let (w, h) = (width as f32, height as f32);
    pb.move_to(0.0, 0.0);
    pb.line_to(w, 0.0);
    pb.line_to(w, h);
    pb.line_to(0.0, h);
    pb.close();
    pb.move_to(hole[0].x, hole[0].y);
    for p in &hole[1..] {
        pb.line_to(p.x, p.y);
    }
    pb.close();
    pb.finish()
}
