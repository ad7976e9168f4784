//! Numbered badge: filled circle with a centered numeral

use tiny_skia::{FillRule, Stroke};

use super::RenderContext;
use super::image::{ellipse_path, solid_paint};
use super::text::draw_text;
use crate::domain::{NumberMarkerBody, Point, Rect, Shape};

pub fn draw_marker(ctx: &mut RenderContext<'_>, shape: &Shape, body: &NumberMarkerBody) {
    let r = body.radius();
    let transform = ctx.shape_matrix(shape).to_skia();
    let Some(circle) = ellipse_path(Rect::new(-r, -r, r, r)) else {
        return;
    };
    if !body.fill.is_transparent() {
        ctx.pixmap.fill_path(
            &circle,
            &solid_paint(body.fill.to_rgba_u8()),
            FillRule::Winding,
            transform,
            None,
        );
    }
    if shape.stroke_width > 0.0 && !shape.stroke_color.is_transparent() {
        let stroke = Stroke {
            width: shape.stroke_width,
            ..Default::default()
        };
        ctx.pixmap.stroke_path(
            &circle,
            &solid_paint(shape.stroke_color.to_rgba_u8()),
            &stroke,
            transform,
            None,
        );
    }
    // The numeral is set at its on-screen size in the scale-compensated frame
    let text_transform = ctx.compensated_matrix(shape).to_skia();
    draw_text(
        ctx.pixmap,
        &body.count.to_string(),
        Point::ZERO,
        effective_font_size(shape, body),
        &solid_paint(body.text_color.to_rgba_u8()),
        text_transform,
    );
}

/// Font size as it appears after uniform scaling
pub fn effective_font_size(shape: &Shape, body: &NumberMarkerBody) -> f32 {
    (body.font_size * shape.transform.scale_x.abs()).round()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::domain::{Matrix, ShapeBody, ShapeTransform};
    use crate::render::image::sample_pixel;
    use tiny_skia::Pixmap;

    #[test]
    fn test_marker_fills_circle_and_draws_numeral() {
        let marker = Shape::number_marker("n", Point::new(20.0, 20.0), 1, &EditorConfig::default());
        let ShapeBody::NumberMarker(body) = &marker.body else {
            panic!("not a marker");
        };
        let mut pixmap = Pixmap::new(40, 40).unwrap();
        let mut ctx = RenderContext::new(&mut pixmap, Matrix::IDENTITY);
        draw_marker(&mut ctx, &marker, body);
        // Fill near the rim, white numeral ink around the center
        assert_eq!(sample_pixel(&pixmap, 20, 8), Some([255, 0, 0, 255]));
        let inked = (16..=24)
            .flat_map(|x| (16..=24).map(move |y| (x, y)))
            .filter_map(|(x, y)| sample_pixel(&pixmap, x, y))
            .filter(|px| px[1] > 200 && px[2] > 200)
            .count();
        assert!(inked > 5, "numeral ink {inked}");
        assert_eq!(sample_pixel(&pixmap, 1, 1), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_effective_font_size_follows_scale() {
        let mut marker = Shape::number_marker("n", Point::ZERO, 3, &EditorConfig::default());
        marker
            .set_transform(ShapeTransform {
                scale_x: 1.5,
                ..marker.transform
            })
            .unwrap();
        let ShapeBody::NumberMarker(body) = &marker.body else {
            panic!("not a marker");
        };
        assert_eq!(effective_font_size(&marker, body), 30.0);
    }

    #[test]
    fn test_numeral_grows_with_marker_scale() {
        let config = EditorConfig::default();
        let ink_rows = |scale: f32| {
            let mut marker = Shape::number_marker("n", Point::new(40.0, 40.0), 7, &config);
            marker.stroke_width = 0.0;
            marker
                .set_transform(ShapeTransform {
                    scale_x: scale,
                    scale_y: scale,
                    ..marker.transform
                })
                .unwrap();
            let ShapeBody::NumberMarker(body) = &marker.body else {
                panic!("not a marker");
            };
            let mut pixmap = Pixmap::new(80, 80).unwrap();
            let mut ctx = RenderContext::new(&mut pixmap, Matrix::IDENTITY);
            draw_marker(&mut ctx, &marker, body);
            (0..80)
                .filter(|&y| (0..80).any(|x| sample_pixel(&pixmap, x, y).is_some_and(|px| px[1] > 200)))
                .count()
        };
        let (small, large) = (ink_rows(1.0), ink_rows(2.0));
        assert!(large as f32 > small as f32 * 1.7, "{small} vs {large}");
    }
}
