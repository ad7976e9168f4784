//! Shape rendering module
//!
//! This module contains:
//! - Geometry constants shared by the shape renderers
//! - Raster helpers (background images, pixmap conversion)
//! - One renderer per shape kind, dispatched by [`render_shape`]
//! - The compositing sampler used by mosaic and magnifier shapes
//! - Selection chrome and flattening for export

pub mod arrow;
pub mod export;
pub mod frames;
pub mod geometry;
pub mod image;
pub mod magnifier;
pub mod marker;
pub mod mosaic;
pub mod sampler;
pub mod selection;
pub mod text;

use tiny_skia::Pixmap;

use self::image::{BackgroundImage, draw_background_image};
use crate::config::ShapeColor;
use crate::domain::{Matrix, Point, Rect, Shape, ShapeBody, ShapeKind};

/// Read-only view of everything a shape may need to draw itself
#[derive(Clone, Copy)]
pub struct SceneView<'a> {
    /// Shapes in z-order
    pub shapes: &'a [Shape],
    pub background: Option<&'a BackgroundImage>,
    /// Host canvas extent, used when there is no background
    pub canvas: Option<Rect>,
}

impl<'a> SceneView<'a> {
    pub fn new(shapes: &'a [Shape]) -> Self {
        Self {
            shapes,
            background: None,
            canvas: None,
        }
    }

    pub fn find(&self, id: &str) -> Option<&'a Shape> {
        self.shapes.iter().find(|shape| shape.id == id)
    }

    /// Extent that off-screen composites cover: the background image, else a
    /// background shape, else the host canvas.
    pub fn reference_rect(&self) -> Option<Rect> {
        if let Some(bg) = self.background {
            return Some(bg.rect());
        }
        self.shapes
            .iter()
            .find(|shape| shape.kind() == ShapeKind::Background)
            .map(Shape::bounding_box)
            .or(self.canvas)
    }

    /// Origin of the mosaic grid
    pub fn grid_origin(&self) -> Point {
        self.background.map(|bg| bg.origin).unwrap_or(Point::ZERO)
    }

    /// Whether anything besides helper shapes could show up in a composite
    pub fn has_content(&self) -> bool {
        self.background.is_some()
            || self
                .shapes
                .iter()
                .any(|shape| shape.visible && !shape.kind().is_sampling_helper())
    }
}

/// Where and how a frame is drawn
pub struct RenderContext<'p> {
    pub pixmap: &'p mut Pixmap,
    /// Scene to device pixels
    pub view: Matrix,
    /// Draw interactive-only decorations (crop shroud)
    pub interactive: bool,
    pub shroud_color: ShapeColor,
}

impl<'p> RenderContext<'p> {
    pub fn new(pixmap: &'p mut Pixmap, view: Matrix) -> Self {
        Self {
            pixmap,
            view,
            interactive: true,
            shroud_color: ShapeColor::rgba(0, 0, 0, 128),
        }
    }

    /// Local-to-device matrix of a shape
    pub fn shape_matrix(&self, shape: &Shape) -> Matrix {
        self.view.multiply(&shape.matrix())
    }

    /// Local-to-device matrix of the scale-compensated frame: coordinates
    /// there are local points multiplied by the shape scale, so stroke widths
    /// stay physical under non-uniform scaling.
    pub fn compensated_matrix(&self, shape: &Shape) -> Matrix {
        let (sx, sy) = (shape.transform.scale_x, shape.transform.scale_y);
        self.shape_matrix(shape)
            .multiply(&Matrix::scale(1.0 / sx, 1.0 / sy))
    }
}

/// Draw a background image (if any) and every visible shape in z-order
pub fn render_scene(ctx: &mut RenderContext<'_>, scene: &SceneView<'_>) {
    if let Some(bg) = scene.background {
        draw_background_image(ctx.pixmap, bg, &ctx.view);
    }
    for shape in scene.shapes {
        render_shape(ctx, scene, shape);
    }
}

/// Draw one shape. Failures degrade to placeholders inside each renderer.
pub fn render_shape(ctx: &mut RenderContext<'_>, scene: &SceneView<'_>, shape: &Shape) {
    if !shape.visible {
        return;
    }
    match &shape.body {
        ShapeBody::Arrow(body) => arrow::draw_arrow(ctx, shape, body),
        ShapeBody::Mosaic(body) => mosaic::draw_mosaic(ctx, scene, shape, body),
        ShapeBody::MagnifierView(body) => magnifier::draw_view(ctx, scene, shape, body),
        ShapeBody::MagnifierSource(body) => frames::draw_source(ctx, shape, body),
        ShapeBody::NumberMarker(body) => marker::draw_marker(ctx, shape, body),
        ShapeBody::Crop => frames::draw_crop(ctx, shape),
        ShapeBody::Background(body) => frames::draw_background(ctx, shape, body),
        ShapeBody::Connector(body) => frames::draw_connector(ctx, shape, body),
    }
}

/// Axis-aligned device bounds of a scene rect
pub(crate) fn device_bounds(view: &Matrix, rect: Rect) -> Option<Rect> {
    Rect::from_points(rect.corners().map(|p| view.apply(p)))
}
