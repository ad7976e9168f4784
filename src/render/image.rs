//! Raster helpers: background images, pixmap conversion and shared paths
//!
//! Pixmaps are premultiplied; `RgbaImage` buffers are straight alpha.

use image::RgbaImage;
use tiny_skia::{
    FilterQuality, IntSize, Paint, PathBuilder, Pixmap, PixmapPaint, Transform,
};

use super::geometry::BEZIER_K;
use crate::domain::{Matrix, Point, Rect};

/// Raster backdrop of an editing session, placed with its top-left at `origin`
#[derive(Clone, Debug, PartialEq)]
pub struct BackgroundImage {
    pixmap: Pixmap,
    pub origin: Point,
}

impl BackgroundImage {
    pub fn from_rgba(img: &RgbaImage) -> Option<Self> {
        Some(Self {
            pixmap: pixmap_from_rgba(img)?,
            origin: Point::ZERO,
        })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Scene-space extent of the image
    pub fn rect(&self) -> Rect {
        Rect::from_xywh(
            self.origin.x,
            self.origin.y,
            self.pixmap.width() as f32,
            self.pixmap.height() as f32,
        )
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }
}

/// Convert a straight-alpha image into a premultiplied pixmap
pub fn pixmap_from_rgba(img: &RgbaImage) -> Option<Pixmap> {
    let size = IntSize::from_wh(img.width(), img.height())?;
    let mut data = img.as_raw().clone();
    for px in data.chunks_exact_mut(4) {
        let color = tiny_skia::ColorU8::from_rgba(px[0], px[1], px[2], px[3]).premultiply();
        px.copy_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }
    Pixmap::from_vec(data, size)
}

/// Convert a premultiplied pixmap back into a straight-alpha image
pub fn rgba_from_pixmap(pixmap: &Pixmap) -> RgbaImage {
    let mut data = Vec::with_capacity(pixmap.data().len());
    for px in pixmap.pixels() {
        let color = px.demultiply();
        data.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }
    // Length always matches width * height * 4
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), data)
        .unwrap_or_else(|| RgbaImage::new(pixmap.width(), pixmap.height()))
}

/// Straight-alpha color at an integer pixel, `None` outside the pixmap
pub fn sample_pixel(pixmap: &Pixmap, x: i64, y: i64) -> Option<[u8; 4]> {
    if x < 0 || y < 0 || x >= i64::from(pixmap.width()) || y >= i64::from(pixmap.height()) {
        return None;
    }
    let idx = y as usize * pixmap.width() as usize + x as usize;
    let color = pixmap.pixels().get(idx)?.demultiply();
    Some([color.red(), color.green(), color.blue(), color.alpha()])
}

/// Paint the background image into `pixmap` through the scene-to-device matrix
pub fn draw_background_image(pixmap: &mut Pixmap, background: &BackgroundImage, view: &Matrix) {
    let transform = view
        .multiply(&Matrix::translate(background.origin.x, background.origin.y))
        .to_skia();
    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    pixmap.draw_pixmap(0, 0, background.pixmap.as_ref(), &paint, transform, None);
}

/// Solid paint from straight RGBA bytes
pub fn solid_paint(rgba: [u8; 4]) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(rgba[0], rgba[1], rgba[2], rgba[3]);
    paint.anti_alias = true;
    paint
}

/// Closed path through `points`
pub fn polygon_path(points: &[Point]) -> Option<tiny_skia::Path> {
    let (first, rest) = points.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.x, first.y);
    for p in rest {
        pb.line_to(p.x, p.y);
    }
    pb.close();
    pb.finish()
}

/// Open path through `points`
pub fn polyline_path(points: &[Point]) -> Option<tiny_skia::Path> {
    let (first, rest) = points.split_first()?;
    let mut pb = PathBuilder::new();
    pb.move_to(first.x, first.y);
    for p in rest {
        pb.line_to(p.x, p.y);
    }
    pb.finish()
}

pub fn rect_path(rect: Rect) -> Option<tiny_skia::Path> {
    Some(PathBuilder::from_rect(rect.to_skia()?))
}

/// Build an ellipse path inscribed in `rect` using cubic bezier curves
pub fn ellipse_path(rect: Rect) -> Option<tiny_skia::Path> {
    let c = rect.center();
    let (cx, cy) = (c.x, c.y);
    let rx = (rect.width() * 0.5).max(0.5);
    let ry = (rect.height() * 0.5).max(0.5);
    let kx = rx * BEZIER_K;
    let ky = ry * BEZIER_K;

    let mut pb = PathBuilder::new();

    // Start at top
    pb.move_to(cx, cy - ry);

    // Top to right
    pb.cubic_to(cx + kx, cy - ry, cx + rx, cy - ky, cx + rx, cy);

    // Right to bottom
    pb.cubic_to(cx + rx, cy + ky, cx + kx, cy + ry, cx, cy + ry);

    // Bottom to left
    pb.cubic_to(cx - kx, cy + ry, cx - rx, cy + ky, cx - rx, cy);

    // Left to top
    pb.cubic_to(cx - rx, cy - ky, cx - kx, cy - ry, cx, cy - ry);

    pb.close();
    pb.finish()
}

/// Identity skia transform, for paths already in device space
pub fn device() -> Transform {
    Transform::identity()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_premultiply_round_trip_keeps_opaque_pixels() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgba([10, 200, 30, 255]));
        img.put_pixel(1, 0, image::Rgba([0, 0, 0, 0]));
        let pixmap = pixmap_from_rgba(&img).unwrap();
        assert_eq!(rgba_from_pixmap(&pixmap), img);
        assert_eq!(sample_pixel(&pixmap, 0, 0), Some([10, 200, 30, 255]));
        assert_eq!(sample_pixel(&pixmap, 2, 0), None);
        assert_eq!(sample_pixel(&pixmap, -1, 0), None);
    }

    #[test]
    fn test_background_draws_at_origin() {
        let mut img = RgbaImage::new(4, 4);
        for px in img.pixels_mut() {
            *px = image::Rgba([0, 0, 255, 255]);
        }
        let mut bg = BackgroundImage::from_rgba(&img).unwrap();
        bg.origin = Point::new(2.0, 2.0);
        assert_eq!(bg.rect(), Rect::new(2.0, 2.0, 6.0, 6.0));

        let mut target = Pixmap::new(8, 8).unwrap();
        draw_background_image(&mut target, &bg, &Matrix::IDENTITY);
        assert_eq!(sample_pixel(&target, 3, 3), Some([0, 0, 255, 255]));
        assert_eq!(sample_pixel(&target, 0, 0), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_ellipse_path_bounds() {
        let path = ellipse_path(Rect::new(0.0, 0.0, 20.0, 10.0)).unwrap();
        let b = path.bounds();
        assert!((b.left() - 0.0).abs() < 1e-3 && (b.right() - 20.0).abs() < 1e-3);
        assert!((b.top() - 0.0).abs() < 1e-3 && (b.bottom() - 10.0).abs() < 1e-3);
    }
}
