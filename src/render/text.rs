//! Text for marker numerals and placeholder captions
//!
//! Glyph outlines come from the bundled DejaVu Sans Bold face through
//! ab_glyph and are filled as tiny-skia paths, so text follows the shape
//! transform like any other geometry.

use ab_glyph::{Font, FontRef, GlyphId, OutlineCurve, PxScale, ScaleFont};
use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};

use crate::domain::Point;

static FONT_DATA: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");

fn font() -> Option<FontRef<'static>> {
    match FontRef::try_from_slice(FONT_DATA) {
        Ok(font) => Some(font),
        Err(err) => {
            log::error!("Bundled font is unreadable: {:?}", err);
            None
        }
    }
}

/// Outlines of `text` set on a baseline at y = 0, pen starting at x = 0
fn layout_path(font: &FontRef<'_>, text: &str, size: f32) -> Option<tiny_skia::Path> {
    let scaled = font.as_scaled(PxScale::from(size));
    let factor = scaled.scale_factor();
    let mut pb = PathBuilder::new();
    let mut pen = 0.0;
    let mut prev: Option<GlyphId> = None;
    for c in text.chars() {
        let id = font.glyph_id(c);
        if let Some(prev) = prev {
            pen += scaled.kern(prev, id);
        }
        if let Some(outline) = font.outline(id) {
            // Font units are y-up
            let origin = pen;
            append_curves(&mut pb, &outline.curves, |p| {
                (origin + p.x * factor.horizontal, -p.y * factor.vertical)
            });
        }
        pen += scaled.h_advance(id);
        prev = Some(id);
    }
    pb.finish()
}

fn append_curves(
    pb: &mut PathBuilder,
    curves: &[OutlineCurve],
    map: impl Fn(ab_glyph::Point) -> (f32, f32),
) {
    let mut last: Option<ab_glyph::Point> = None;
    for curve in curves {
        let start = match *curve {
            OutlineCurve::Line(p0, _) | OutlineCurve::Quad(p0, _, _) | OutlineCurve::Cubic(p0, _, _, _) => p0,
        };
        if last != Some(start) {
            if last.is_some() {
                pb.close();
            }
            let (x, y) = map(start);
            pb.move_to(x, y);
        }
        let end = match *curve {
            OutlineCurve::Line(_, p1) => {
                let (x, y) = map(p1);
                pb.line_to(x, y);
                p1
            }
            OutlineCurve::Quad(_, c, p1) => {
                let ((cx, cy), (x, y)) = (map(c), map(p1));
                pb.quad_to(cx, cy, x, y);
                p1
            }
            OutlineCurve::Cubic(_, c1, c2, p1) => {
                let ((ax, ay), (bx, by), (x, y)) = (map(c1), map(c2), map(p1));
                pb.cubic_to(ax, ay, bx, by, x, y);
                p1
            }
        };
        last = Some(end);
    }
    if last.is_some() {
        pb.close();
    }
}

/// Path of `text` at `size` pixels per em, its ink box centered on `center`
pub fn text_path(text: &str, center: Point, size: f32) -> Option<tiny_skia::Path> {
    if !(size.is_finite() && size > 0.0) {
        return None;
    }
    let font = font()?;
    let path = layout_path(&font, text, size)?;
    let b = path.bounds();
    let dx = center.x - (b.left() + b.right()) * 0.5;
    let dy = center.y - (b.top() + b.bottom()) * 0.5;
    path.transform(Transform::from_translate(dx, dy))
}

/// Fill `text` centered on `center` in the given local-to-device transform
pub fn draw_text(
    pixmap: &mut Pixmap,
    text: &str,
    center: Point,
    size: f32,
    paint: &Paint<'_>,
    transform: Transform,
) {
    if let Some(path) = text_path(text, center, size) {
        pixmap.fill_path(&path, paint, FillRule::Winding, transform, None);
    }
}
