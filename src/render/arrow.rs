//! Arrow rendering using tiny-skia
//!
//! Everything is drawn in the scale-compensated frame (see
//! [`RenderContext::compensated_matrix`]), so heads keep their size and shape
//! under any scale. Head direction always comes from the path tangent at the
//! tip.

use tiny_skia::{
    BlendMode, FillRule, LineCap, LineJoin, Pixmap, PixmapPaint, Stroke, StrokeDash, Transform,
};

use super::RenderContext;
use super::geometry::arrow as consts;
use super::image::{polygon_path, polyline_path, solid_paint};
use crate::domain::{
    ArrowBody, ArrowEnd, ArrowPath, HeadGeometry, HeadKind, Point, Shape, ThicknessStyle,
    head_dimensions,
};

pub fn draw_arrow(ctx: &mut RenderContext<'_>, shape: &Shape, body: &ArrowBody) {
    let width = shape.visual_stroke_width();
    if !(width.is_finite() && width > 0.0) || shape.stroke_color.is_transparent() {
        return;
    }
    let (sx, sy) = (shape.transform.scale_x, shape.transform.scale_y);
    let path = body.path_scaled(sx, sy);
    let transform = ctx.compensated_matrix(shape).to_skia();
    let rgba = shape.stroke_color.to_rgba_u8();

    if body.head_style.is_hollow() && body.head_kind.is_single() {
        let dashes = body.line_style.dash_array(width);
        let outline = hollow_contour(&path, body, width);
        if let Some(contour) = polygon_path(&outline) {
            let stroke = Stroke {
                width: (width * consts::CONTOUR_LINE).max(1.0),
                line_join: LineJoin::Miter,
                miter_limit: consts::CONTOUR_MITER_LIMIT,
                dash: StrokeDash::new(dashes, 0.0),
                ..Default::default()
            };
            ctx.pixmap
                .stroke_path(&contour, &solid_paint(rgba), &stroke, transform, None);
        }
        return;
    }

    if body.head_style.is_hollow() {
        // Hollow heads clear their interior, which may only cut through this
        // arrow, so it goes through its own layer
        let Some(mut layer) = Pixmap::new(ctx.pixmap.width(), ctx.pixmap.height()) else {
            return;
        };
        draw_shaft_and_heads(&mut layer, &path, body, width, rgba, transform);
        ctx.pixmap.draw_pixmap(
            0,
            0,
            layer.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    } else {
        draw_shaft_and_heads(ctx.pixmap, &path, body, width, rgba, transform);
    }
}

fn draw_shaft_and_heads(
    pixmap: &mut Pixmap,
    path: &ArrowPath,
    body: &ArrowBody,
    width: f32,
    rgba: [u8; 4],
    transform: Transform,
) {
    let paint = solid_paint(rgba);
    let dashes = body.line_style.dash_array(width);
    if body.thickness_style == ThicknessStyle::Varying && body.head_kind.is_single() {
        let (start_w, end_w) = taper_widths(body.head_kind, width);
        if let Some(shaft) = polygon_path(&shaft_outline(path, start_w, end_w, consts::CURVE_STEPS)) {
            pixmap.fill_path(&shaft, &paint, FillRule::Winding, transform, None);
        }
    } else if let Some(shaft) = centerline_path(path) {
        let dashed = !dashes.is_empty();
        let stroke = Stroke {
            width,
            line_cap: if dashed || body.head_kind != HeadKind::None {
                LineCap::Butt
            } else {
                LineCap::Round
            },
            line_join: LineJoin::Round,
            dash: StrokeDash::new(dashes, 0.0),
            ..Default::default()
        };
        pixmap.stroke_path(&shaft, &paint, &stroke, transform, None);
    }

    // Heads never take the dash pattern
    for end in [ArrowEnd::Start, ArrowEnd::End] {
        let wanted = match end {
            ArrowEnd::Start => body.head_kind.at_start(),
            ArrowEnd::End => body.head_kind.at_end(),
        };
        if wanted {
            draw_head(pixmap, path, end, body, width, rgba, transform);
        }
    }
}

fn draw_head(
    pixmap: &mut Pixmap,
    path: &ArrowPath,
    end: ArrowEnd,
    body: &ArrowBody,
    width: f32,
    rgba: [u8; 4],
    transform: Transform,
) {
    let head = head_geometry(path, end, body, width);
    let Some(outline) = polygon_path(&head.points()) else {
        return;
    };
    let paint = solid_paint(rgba);
    let stroke = Stroke {
        width,
        line_join: LineJoin::Round,
        ..Default::default()
    };
    if body.head_style.is_hollow() {
        let mut eraser = paint.clone();
        eraser.blend_mode = BlendMode::Clear;
        pixmap.fill_path(&outline, &eraser, FillRule::Winding, transform, None);
    } else {
        pixmap.fill_path(&outline, &paint, FillRule::Winding, transform, None);
    }
    pixmap.stroke_path(&outline, &paint, &stroke, transform, None);
}

/// Head at one end of the path, in the compensated frame
pub fn head_geometry(path: &ArrowPath, end: ArrowEnd, body: &ArrowBody, width: f32) -> HeadGeometry {
    let tip = match end {
        ArrowEnd::Start => path.start(),
        ArrowEnd::End => path.end(),
    };
    let (length, half_width) = head_dimensions(width, body.head_style.is_hollow());
    HeadGeometry::new(
        tip,
        path.outward_direction(end),
        length,
        half_width,
        body.head_style.is_swallowtail(),
    )
}

fn centerline_path(path: &ArrowPath) -> Option<tiny_skia::Path> {
    match *path {
        ArrowPath::Line { p1, p2 } => polyline_path(&[p1, p2]),
        ArrowPath::Elbow { p1, corner, p2 } => polyline_path(&[p1, corner, p2]),
        ArrowPath::Quad { p1, control, p2 } => {
            let mut pb = tiny_skia::PathBuilder::new();
            pb.move_to(p1.x, p1.y);
            pb.quad_to(control.x, control.y, p2.x, p2.y);
            pb.finish()
        }
    }
}

/// Start and end widths of a tapered shaft; the thick end carries the head
fn taper_widths(head_kind: HeadKind, width: f32) -> (f32, f32) {
    let thin = width * consts::TAPER_START;
    match head_kind {
        HeadKind::Left => (width, thin),
        _ => (thin, width),
    }
}

/// Filled outline of a shaft whose width changes linearly along the path
pub fn shaft_outline(path: &ArrowPath, start_width: f32, end_width: f32, steps: usize) -> Vec<Point> {
    let steps = if path.is_straight() { 1 } else { steps };
    let samples = path.sample(steps);
    let last = samples.len().saturating_sub(1).max(1) as f32;
    let mut left = Vec::with_capacity(samples.len());
    let mut right = Vec::with_capacity(samples.len());
    for (i, (p, tangent)) in samples.iter().enumerate() {
        let half = (start_width + (end_width - start_width) * i as f32 / last) * 0.5;
        let normal = tangent.normalized().unwrap_or(Point::new(1.0, 0.0)).perp();
        left.push(*p + normal.scale(half));
        right.push(*p - normal.scale(half));
    }
    right.reverse();
    left.extend(right);
    left
}

/// Single closed outline around shaft and head for hollow single-headed
/// arrows. The path is walked from the tailless end towards the tip.
pub fn hollow_contour(path: &ArrowPath, body: &ArrowBody, width: f32) -> Vec<Point> {
    let path = match body.head_kind {
        HeadKind::Left => reversed(path),
        _ => *path,
    };
    let head_length = (width * consts::CONTOUR_HEAD_LENGTH).max(10.0);
    let head_width = (width * consts::CONTOUR_HEAD_WIDTH).max(6.0);
    let indent = if body.head_style.is_swallowtail() {
        head_length * consts::CONTOUR_SWALLOW_INDENT
    } else {
        head_length
    };
    let neck_width = width * consts::CONTOUR_NECK_WIDTH;
    let start_width = match body.thickness_style {
        ThicknessStyle::Varying => width * consts::TAPER_START,
        ThicknessStyle::Uniform => neck_width,
    };

    let tip = path.end();
    let dir = path.outward_direction(ArrowEnd::End);
    let normal = dir.perp();
    let neck = tip - dir.scale(indent);
    let wing_back = tip - dir.scale(head_length);

    // Shaft samples that stay clear of the head
    let steps = if path.is_straight() { 1 } else { consts::CURVE_STEPS };
    let mut shaft: Vec<(Point, Point)> = path
        .sample(steps)
        .into_iter()
        .filter(|(p, _)| p.distance(tip) > indent)
        .map(|(p, t)| (p, t.normalized().unwrap_or(dir).perp()))
        .collect();
    if path.is_straight() {
        shaft.truncate(1);
    }
    if shaft.is_empty() {
        shaft.push((path.start(), normal));
    }
    shaft.push((neck, normal));

    let last = (shaft.len() - 1).max(1) as f32;
    let half_at = |i: usize| (start_width + (neck_width - start_width) * i as f32 / last) * 0.5;

    let mut outline = vec![tip, wing_back + normal.scale(head_width)];
    for (i, (p, n)) in shaft.iter().enumerate().rev() {
        outline.push(*p + n.scale(half_at(i)));
    }
    for (i, (p, n)) in shaft.iter().enumerate() {
        outline.push(*p - n.scale(half_at(i)));
    }
    outline.push(wing_back - normal.scale(head_width));
    outline
}

fn reversed(path: &ArrowPath) -> ArrowPath {
    match *path {
        ArrowPath::Line { p1, p2 } => ArrowPath::Line { p1: p2, p2: p1 },
        ArrowPath::Elbow { p1, corner, p2 } => ArrowPath::Elbow {
            p1: p2,
            corner,
            p2: p1,
        },
        ArrowPath::Quad { p1, control, p2 } => ArrowPath::Quad {
            p1: p2,
            control,
            p2: p1,
        },
    }
}
