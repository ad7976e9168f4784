//! Selection chrome: outline and control handles of selected shapes
//!
//! Everything here is drawn in device space so handle sizes do not change
//! with zoom.

use tiny_skia::{FillRule, LineCap, Pixmap, Stroke};

use super::geometry::selection as consts;
use super::image::{device, ellipse_path, polygon_path, polyline_path, solid_paint};
use crate::annotations::handles::local_anchor;
use crate::annotations::{Handle, handles_for, screen_position};
use crate::domain::{CURVE_SAMPLES, Point, Rect, Shape, Viewport};

pub fn draw_selection(pixmap: &mut Pixmap, shape: &Shape, viewport: &Viewport) {
    draw_outline(pixmap, shape, viewport);
    for handle in handles_for(shape) {
        let at = screen_position(shape, handle, viewport);
        match handle {
            Handle::Delete => draw_button(pixmap, at, consts::DELETE_FILL, &cross(at)),
            Handle::Confirm => draw_button(pixmap, at, consts::CONFIRM_FILL, &check(at)),
            Handle::Rotate => {
                let m = viewport.matrix().multiply(&shape.matrix());
                let top = m.apply(local_anchor(shape, handle));
                stroke_device(pixmap, &[top, at], consts::BORDER, 1.0);
                draw_knob(pixmap, at);
            }
            _ => draw_knob(pixmap, at),
        }
    }
}

/// Shape outline: the centerline for arrows, the bounds polygon otherwise
fn draw_outline(pixmap: &mut Pixmap, shape: &Shape, viewport: &Viewport) {
    let m = viewport.matrix().multiply(&shape.matrix());
    if let Some(body) = shape.as_arrow() {
        let points: Vec<Point> = body
            .path()
            .polyline(CURVE_SAMPLES)
            .into_iter()
            .map(|p| m.apply(p))
            .collect();
        stroke_device(pixmap, &points, consts::BORDER, 1.0);
        if body.is_bent() {
            // Guide from the chord midpoint to the bend handle
            let guide = [m.apply(body.chord_mid()), m.apply(body.bend_handle())];
            stroke_device(pixmap, &guide, consts::BORDER, 1.0);
        }
        return;
    }
    let corners = shape.local_bounds().corners().map(|p| m.apply(p));
    if let Some(path) = polygon_path(&corners) {
        let stroke = Stroke {
            width: 1.0,
            ..Default::default()
        };
        pixmap.stroke_path(&path, &solid_paint(consts::BORDER), &stroke, device(), None);
    }
}

fn stroke_device(pixmap: &mut Pixmap, points: &[Point], rgba: [u8; 4], width: f32) {
    if let Some(path) = polyline_path(points) {
        let stroke = Stroke {
            width,
            line_cap: LineCap::Round,
            ..Default::default()
        };
        pixmap.stroke_path(&path, &solid_paint(rgba), &stroke, device(), None);
    }
}

fn circle(center: Point, radius: f32) -> Option<tiny_skia::Path> {
    ellipse_path(Rect::new(
        center.x - radius,
        center.y - radius,
        center.x + radius,
        center.y + radius,
    ))
}

fn draw_knob(pixmap: &mut Pixmap, at: Point) {
    let Some(path) = circle(at, consts::CORNER_SIZE * 0.5) else {
        return;
    };
    pixmap.fill_path(
        &path,
        &solid_paint(consts::CORNER_FILL),
        FillRule::Winding,
        device(),
        None,
    );
    let stroke = Stroke {
        width: 1.0,
        ..Default::default()
    };
    pixmap.stroke_path(&path, &solid_paint(consts::CORNER_STROKE), &stroke, device(), None);
}

fn draw_button(pixmap: &mut Pixmap, at: Point, fill: [u8; 4], glyph: &[[Point; 2]]) {
    if let Some(path) = circle(at, consts::ICON_RADIUS) {
        pixmap.fill_path(&path, &solid_paint(fill), FillRule::Winding, device(), None);
    }
    for segment in glyph {
        stroke_device(pixmap, segment, consts::CORNER_FILL, 2.0);
    }
}

fn cross(at: Point) -> [[Point; 2]; 2] {
    let r = consts::ICON_RADIUS * 0.45;
    [
        [Point::new(at.x - r, at.y - r), Point::new(at.x + r, at.y + r)],
        [Point::new(at.x - r, at.y + r), Point::new(at.x + r, at.y - r)],
    ]
}

fn check(at: Point) -> [[Point; 2]; 2] {
    let r = consts::ICON_RADIUS * 0.45;
    let knee = Point::new(at.x - r * 0.2, at.y + r * 0.7);
    [
        [Point::new(at.x - r, at.y), knee],
        [knee, Point::new(at.x + r, at.y - r * 0.8)],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::image::sample_pixel;

    #[test]
    fn test_selection_draws_border_and_knobs() {
        let mosaic = Shape::mosaic("m", Rect::from_xywh(20.0, 20.0, 40.0, 20.0), 5.0).unwrap();
        let mut pixmap = Pixmap::new(100, 100).unwrap();
        draw_selection(&mut pixmap, &mosaic, &Viewport::default());
        // Knob center on the south-east corner is white
        assert_eq!(sample_pixel(&pixmap, 60, 40), Some([255, 255, 255, 255]));
        // Middle of the top edge, away from any knob, carries the border
        let border = sample_pixel(&pixmap, 30, 20).unwrap();
        assert!(border[3] > 0 && border[2] > border[0], "{border:?}");
        // Delete button sits up and to the right of the north-east corner
        let delete = sample_pixel(&pixmap, 70, 4).unwrap();
        assert_eq!(delete, consts::DELETE_FILL);
        assert_eq!(sample_pixel(&pixmap, 40, 30), Some([0, 0, 0, 0]));
    }
}
