//! Flattening a scene into a plain image for export

use std::io;

use image::RgbaImage;
use tiny_skia::Pixmap;

use super::image::{draw_background_image, rgba_from_pixmap};
use super::{RenderContext, SceneView, render_shape};
use crate::domain::{Matrix, Rect};
use crate::error::{EditorError, EditorResult};

/// Render the background and every shape except export helpers (crop
/// rectangles) for the scene region `extent`, one pixel per scene unit.
pub fn flatten(scene: &SceneView<'_>, extent: Rect) -> EditorResult<RgbaImage> {
    let (w, h) = (extent.width().round(), extent.height().round());
    if !(w >= 1.0 && h >= 1.0) {
        return Err(EditorError::geometry(format!("cannot export a {w}x{h} region")));
    }
    let mut pixmap = Pixmap::new(w as u32, h as u32)
        .ok_or_else(|| EditorError::geometry(format!("cannot allocate a {w}x{h} image")))?;
    let view = Matrix::translate(-extent.left, -extent.top);
    if let Some(bg) = scene.background {
        draw_background_image(&mut pixmap, bg, &view);
    }
    let mut ctx = RenderContext::new(&mut pixmap, view);
    ctx.interactive = false;
    for shape in scene.shapes.iter().filter(|s| !s.kind().is_export_helper()) {
        render_shape(&mut ctx, scene, shape);
    }
    Ok(rgba_from_pixmap(&pixmap))
}

pub fn write_png<W: io::Write>(w: W, image: &RgbaImage) -> Result<(), png::EncodingError> {
    let mut encoder = png::Encoder::new(w, image.width(), image.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(image.as_raw())
}

/// PNG bytes of `image`
pub fn encode_png(image: &RgbaImage) -> EditorResult<Vec<u8>> {
    let mut out = Vec::new();
    write_png(&mut out, image).map_err(|err| EditorError::container(err.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShapeColor;
    use crate::domain::Shape;

    #[test]
    fn test_flatten_skips_crop_and_offsets_extent() {
        let shapes = vec![
            Shape::background("bg", Rect::from_xywh(10.0, 10.0, 20.0, 20.0), ShapeColor::WHITE).unwrap(),
            Shape::crop("c", Rect::from_xywh(12.0, 12.0, 5.0, 5.0)).unwrap(),
        ];
        let scene = SceneView::new(&shapes);
        let img = flatten(&scene, Rect::from_xywh(10.0, 10.0, 20.0, 20.0)).unwrap();
        assert_eq!(img.dimensions(), (20, 20));
        assert!(img.pixels().all(|p| p.0 == [255, 255, 255, 255]));
        assert!(flatten(&scene, Rect::from_xywh(0.0, 0.0, 0.0, 5.0)).is_err());
    }

    #[test]
    fn test_encode_png_decodes_back() {
        let img = RgbaImage::from_pixel(3, 2, image::Rgba([1, 2, 3, 255]));
        let bytes = encode_png(&img).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded, img);
    }
}
