//! Shape model: a closed set of shape kinds sharing a transform and stroke
//!
//! Shapes live in the session's ordered list. Links between shapes (magnifier
//! view/source pairs, connector lines) are plain ids resolved through the list.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::arrow::{ArrowBody, ArrowEnd, BEND_EPSILON};
use super::geometry::{Matrix, Point, Rect, compose_matrix, distance_to_segment, invert};
use crate::config::{EditorConfig, ShapeColor};
use crate::error::{EditorError, EditorResult};

pub type ShapeId = String;

/// Parametric steps used for extents and bounds of curved arrows
pub const CURVE_SAMPLES: usize = 40;

/// Shape kind tag as it appears in scene JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Arrow,
    Mosaic,
    MagnifierView,
    MagnifierSource,
    NumberMarker,
    Crop,
    Background,
    Connector,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 8] = [
        ShapeKind::Arrow,
        ShapeKind::Mosaic,
        ShapeKind::MagnifierView,
        ShapeKind::MagnifierSource,
        ShapeKind::NumberMarker,
        ShapeKind::Crop,
        ShapeKind::Background,
        ShapeKind::Connector,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ShapeKind::Arrow => "arrow",
            ShapeKind::Mosaic => "mosaic",
            ShapeKind::MagnifierView => "magnifier-view",
            ShapeKind::MagnifierSource => "magnifier-source",
            ShapeKind::NumberMarker => "number-marker",
            ShapeKind::Crop => "crop",
            ShapeKind::Background => "background",
            ShapeKind::Connector => "connector",
        }
    }

    /// Parse a kind tag, accepting the type names older sessions were saved with
    pub fn parse(tag: &str) -> Option<Self> {
        let kind = match tag {
            "arrow" => ShapeKind::Arrow,
            "mosaic" | "mosaic-rect" => ShapeKind::Mosaic,
            "magnifier-view" | "magnifier-rect" => ShapeKind::MagnifierView,
            "magnifier-source" | "magnifier-source-rect" => ShapeKind::MagnifierSource,
            "number-marker" => ShapeKind::NumberMarker,
            "crop" | "crop-rect" => ShapeKind::Crop,
            "background" | "canvas-background" => ShapeKind::Background,
            "connector" | "magnifier-connection-line" => ShapeKind::Connector,
            _ => return None,
        };
        Some(kind)
    }

    /// Tool/helper shapes that never show up in composited samples
    pub fn is_sampling_helper(self) -> bool {
        matches!(
            self,
            ShapeKind::Mosaic
                | ShapeKind::Crop
                | ShapeKind::MagnifierView
                | ShapeKind::MagnifierSource
                | ShapeKind::Connector
        )
    }

    /// Shapes left out of a flattened export
    pub fn is_export_helper(self) -> bool {
        matches!(self, ShapeKind::Crop)
    }
}

impl std::fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn one() -> f32 {
    1.0
}

fn default_block_size() -> f32 {
    EditorConfig::default().mosaic_block_size
}

fn default_magnification() -> f32 {
    EditorConfig::default().magnification
}

fn default_count() -> u32 {
    1
}

fn default_font_size() -> f32 {
    EditorConfig::default().marker_font_size
}

fn default_marker_fill() -> ShapeColor {
    EditorConfig::default().marker_fill
}

fn default_marker_text() -> ShapeColor {
    EditorConfig::default().marker_text_color
}

/// Placement of a shape in scene space. `translation` is the scene position
/// of the shape's local origin (its center); angles are in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeTransform {
    pub translation: Point,
    #[serde(default)]
    pub rotation: f32,
    #[serde(default = "one")]
    pub scale_x: f32,
    #[serde(default = "one")]
    pub scale_y: f32,
    #[serde(default)]
    pub skew_x: f32,
    #[serde(default)]
    pub skew_y: f32,
}

impl Default for ShapeTransform {
    fn default() -> Self {
        Self::at(Point::ZERO)
    }
}

impl ShapeTransform {
    pub fn at(translation: Point) -> Self {
        Self {
            translation,
            rotation: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            skew_x: 0.0,
            skew_y: 0.0,
        }
    }

    pub fn checked_matrix(&self) -> EditorResult<Matrix> {
        compose_matrix(
            self.translation,
            self.rotation,
            self.scale_x,
            self.scale_y,
            self.skew_x,
            self.skew_y,
        )
    }

    /// Local-to-scene matrix. Transforms are validated on every mutation, so a
    /// failure here only happens for hand-built values; identity is used then.
    pub fn matrix(&self) -> Matrix {
        self.checked_matrix().unwrap_or_else(|err| {
            log::debug!("Falling back to identity transform: {err}");
            Matrix::translate(self.translation.x, self.translation.y)
        })
    }

    pub fn validate(&self) -> EditorResult<()> {
        self.checked_matrix().map(|_| ())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MosaicBody {
    #[serde(default = "default_block_size")]
    pub block_size: f32,
}

/// Outline of a magnifier view and its source marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MagnifierShape {
    #[default]
    Rect,
    #[serde(alias = "circle")]
    Ellipse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MagnifierViewBody {
    #[serde(default)]
    pub source_id: Option<ShapeId>,
    #[serde(default = "default_magnification")]
    pub magnification: f32,
    #[serde(default)]
    pub magnifier_shape: MagnifierShape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MagnifierSourceBody {
    #[serde(default)]
    pub view_id: Option<ShapeId>,
    #[serde(default)]
    pub magnifier_shape: MagnifierShape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberMarkerBody {
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default = "default_marker_fill")]
    pub fill: ShapeColor,
    #[serde(default = "default_marker_text")]
    pub text_color: ShapeColor,
}

impl NumberMarkerBody {
    /// Ratio between the badge radius and the font size
    pub const RADIUS_FACTOR: f32 = 0.8;

    pub fn radius(&self) -> f32 {
        self.font_size * Self::RADIUS_FACTOR
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackgroundBody {
    pub fill: ShapeColor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorBody {
    pub p1: Point,
    pub p2: Point,
    #[serde(default)]
    pub view_id: Option<ShapeId>,
    #[serde(default)]
    pub source_id: Option<ShapeId>,
}

/// Kind-specific state
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeBody {
    Arrow(ArrowBody),
    Mosaic(MosaicBody),
    MagnifierView(MagnifierViewBody),
    MagnifierSource(MagnifierSourceBody),
    NumberMarker(NumberMarkerBody),
    Crop,
    Background(BackgroundBody),
    Connector(ConnectorBody),
}

impl ShapeBody {
    pub fn kind(&self) -> ShapeKind {
        match self {
            ShapeBody::Arrow(_) => ShapeKind::Arrow,
            ShapeBody::Mosaic(_) => ShapeKind::Mosaic,
            ShapeBody::MagnifierView(_) => ShapeKind::MagnifierView,
            ShapeBody::MagnifierSource(_) => ShapeKind::MagnifierSource,
            ShapeBody::NumberMarker(_) => ShapeKind::NumberMarker,
            ShapeBody::Crop => ShapeKind::Crop,
            ShapeBody::Background(_) => ShapeKind::Background,
            ShapeBody::Connector(_) => ShapeKind::Connector,
        }
    }
}

/// Pick distances for thin shapes (arrows, connectors)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitTolerance {
    pub margin: f32,
    pub min_threshold: f32,
    pub curve_samples: usize,
}

impl Default for HitTolerance {
    fn default() -> Self {
        Self::from(&EditorConfig::default())
    }
}

impl From<&EditorConfig> for HitTolerance {
    fn from(config: &EditorConfig) -> Self {
        Self {
            margin: config.hit_margin,
            min_threshold: config.hit_min_threshold,
            curve_samples: config.curve_samples,
        }
    }
}

/// A shape on the canvas
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub id: ShapeId,
    pub transform: ShapeTransform,
    /// Local (unscaled) extent
    pub width: f32,
    pub height: f32,
    pub stroke_color: ShapeColor,
    pub stroke_width: f32,
    /// Keep the stroke width constant under scaling
    pub stroke_uniform: bool,
    pub visible: bool,
    pub selectable: bool,
    pub body: ShapeBody,
    /// Fields this build does not understand, re-emitted on save
    pub extra: Map<String, Value>,
    /// Timestamp of the last press on the bend handle (double-click detection)
    pub(crate) last_bend_press_ms: Option<u64>,
}

impl Shape {
    /// Create a shape centered at `center`. Extents of arrows and markers are
    /// derived from their bodies.
    pub fn new(id: impl Into<ShapeId>, body: ShapeBody, center: Point, width: f32, height: f32) -> Self {
        let mut shape = Self {
            id: id.into(),
            transform: ShapeTransform::at(center),
            width,
            height,
            stroke_color: ShapeColor::RED,
            stroke_width: 0.0,
            stroke_uniform: false,
            visible: true,
            selectable: true,
            body,
            extra: Map::new(),
            last_bend_press_ms: None,
        };
        shape.refresh_extent();
        shape
    }

    /// Arrow from `from` to `to` in scene coordinates
    pub fn arrow(id: impl Into<ShapeId>, from: Point, to: Point, config: &EditorConfig) -> EditorResult<Self> {
        if !from.is_finite() || !to.is_finite() {
            return Err(EditorError::geometry("arrow endpoints must be finite"));
        }
        if from == to {
            return Err(EditorError::geometry("arrow endpoints must differ"));
        }
        let center = from.midpoint(to);
        let body = ArrowBody {
            head_kind: config.arrow_head,
            head_style: config.arrow_head_style,
            line_style: config.arrow_line_style,
            thickness_style: config.arrow_thickness_style,
            anchor_style: config.arrow_anchor_style,
            ..ArrowBody::new(from - center, to - center)
        };
        let mut shape = Self::new(id, ShapeBody::Arrow(body), center, 0.0, 0.0);
        shape.stroke_color = config.stroke_color;
        shape.stroke_width = config.stroke_width;
        Ok(shape)
    }

    pub fn mosaic(id: impl Into<ShapeId>, rect: Rect, block_size: f32) -> EditorResult<Self> {
        check_block_size(block_size)?;
        check_extent(rect.width(), rect.height())?;
        Ok(Self::new(
            id,
            ShapeBody::Mosaic(MosaicBody { block_size }),
            rect.center(),
            rect.width(),
            rect.height(),
        ))
    }

    /// Linked magnifier view and source. The view is sized from the source.
    pub fn magnifier_pair(
        view_id: impl Into<ShapeId>,
        source_id: impl Into<ShapeId>,
        source_rect: Rect,
        view_center: Point,
        magnification: f32,
        magnifier_shape: MagnifierShape,
    ) -> EditorResult<(Self, Self)> {
        check_extent(source_rect.width(), source_rect.height())?;
        if !magnification.is_finite() {
            return Err(EditorError::geometry("magnification must be finite"));
        }
        let magnification = magnification.max(1.0);
        let view_id = view_id.into();
        let source_id = source_id.into();

        let mut source = Self::new(
            source_id.clone(),
            ShapeBody::MagnifierSource(MagnifierSourceBody {
                view_id: Some(view_id.clone()),
                magnifier_shape,
            }),
            source_rect.center(),
            source_rect.width(),
            source_rect.height(),
        );
        source.stroke_color = ShapeColor::rgba(0x00, 0xcc, 0xff, 0xff);
        source.stroke_width = 1.0;
        source.stroke_uniform = true;

        let mut view = Self::new(
            view_id,
            ShapeBody::MagnifierView(MagnifierViewBody {
                source_id: Some(source_id),
                magnification,
                magnifier_shape,
            }),
            view_center,
            source_rect.width() * magnification,
            source_rect.height() * magnification,
        );
        view.stroke_color = ShapeColor::BLACK;
        view.stroke_width = 2.0;
        view.stroke_uniform = true;
        Ok((view, source))
    }

    pub fn connector(
        id: impl Into<ShapeId>,
        view_id: impl Into<ShapeId>,
        source_id: impl Into<ShapeId>,
        from: Point,
        to: Point,
    ) -> Self {
        let center = from.midpoint(to);
        let mut shape = Self::new(
            id,
            ShapeBody::Connector(ConnectorBody {
                p1: from - center,
                p2: to - center,
                view_id: Some(view_id.into()),
                source_id: Some(source_id.into()),
            }),
            center,
            0.0,
            0.0,
        );
        shape.stroke_color = ShapeColor::rgba(0x00, 0xcc, 0xff, 0xff);
        shape.stroke_width = 1.0;
        shape.selectable = false;
        shape
    }

    pub fn number_marker(id: impl Into<ShapeId>, center: Point, count: u32, config: &EditorConfig) -> Self {
        Self::new(
            id,
            ShapeBody::NumberMarker(NumberMarkerBody {
                count: count.max(1),
                font_size: config.marker_font_size,
                fill: config.marker_fill,
                text_color: config.marker_text_color,
            }),
            center,
            0.0,
            0.0,
        )
    }

    pub fn crop(id: impl Into<ShapeId>, rect: Rect) -> EditorResult<Self> {
        check_extent(rect.width(), rect.height())?;
        let mut shape = Self::new(id, ShapeBody::Crop, rect.center(), rect.width(), rect.height());
        shape.stroke_color = ShapeColor::WHITE;
        shape.stroke_width = 1.0;
        shape.stroke_uniform = true;
        Ok(shape)
    }

    pub fn background(id: impl Into<ShapeId>, rect: Rect, fill: ShapeColor) -> EditorResult<Self> {
        check_extent(rect.width(), rect.height())?;
        let mut shape = Self::new(
            id,
            ShapeBody::Background(BackgroundBody { fill }),
            rect.center(),
            rect.width(),
            rect.height(),
        );
        shape.selectable = false;
        Ok(shape)
    }

    pub fn kind(&self) -> ShapeKind {
        self.body.kind()
    }

    pub fn center(&self) -> Point {
        self.transform.translation
    }

    pub fn matrix(&self) -> Matrix {
        self.transform.matrix()
    }

    /// Scene-to-local matrix
    pub fn inverse_matrix(&self) -> EditorResult<Matrix> {
        invert(&self.transform.checked_matrix()?)
    }

    pub fn to_local(&self, scene: Point) -> EditorResult<Point> {
        if !scene.is_finite() {
            return Err(EditorError::geometry("pointer position is not finite"));
        }
        Ok(self.inverse_matrix()?.apply(scene))
    }

    /// Extent after scaling, used by magnifier sizing and mosaic grids
    pub fn scaled_size(&self) -> (f32, f32) {
        (
            self.width * self.transform.scale_x.abs(),
            self.height * self.transform.scale_y.abs(),
        )
    }

    pub fn as_arrow(&self) -> Option<&ArrowBody> {
        match &self.body {
            ShapeBody::Arrow(body) => Some(body),
            _ => None,
        }
    }

    pub fn as_arrow_mut(&mut self) -> Option<&mut ArrowBody> {
        match &mut self.body {
            ShapeBody::Arrow(body) => Some(body),
            _ => None,
        }
    }

    /// Replace the transform, enforcing per-kind locks
    pub fn set_transform(&mut self, transform: ShapeTransform) -> EditorResult<()> {
        let mut transform = transform;
        if matches!(self.body, ShapeBody::NumberMarker(_)) {
            // Badges scale uniformly and never rotate or skew
            transform.rotation = 0.0;
            transform.skew_x = 0.0;
            transform.skew_y = 0.0;
            transform.scale_y = transform.scale_x;
        }
        transform.validate()?;
        self.transform = transform;
        Ok(())
    }

    /// Re-derive width/height for kinds whose extent follows their body
    pub fn refresh_extent(&mut self) {
        match &self.body {
            ShapeBody::Arrow(body) => {
                let bounds = body.path().bounds(CURVE_SAMPLES);
                self.width = bounds.width();
                self.height = bounds.height();
            }
            ShapeBody::NumberMarker(body) => {
                let d = body.radius() * 2.0;
                self.width = d;
                self.height = d;
            }
            ShapeBody::Connector(body) => {
                self.width = (body.p2.x - body.p1.x).abs();
                self.height = (body.p2.y - body.p1.y).abs();
            }
            _ => {}
        }
    }

    /// Bounds in local coordinates
    pub fn local_bounds(&self) -> Rect {
        match &self.body {
            ShapeBody::Arrow(body) => body.path().bounds(CURVE_SAMPLES),
            ShapeBody::NumberMarker(body) => {
                let r = body.radius();
                Rect::new(-r, -r, r, r)
            }
            ShapeBody::Connector(body) => {
                Rect::from_points([body.p1, body.p2]).unwrap_or_default()
            }
            _ => Rect::new(
                -self.width * 0.5,
                -self.height * 0.5,
                self.width * 0.5,
                self.height * 0.5,
            ),
        }
    }

    /// Axis-aligned bounds in scene coordinates
    pub fn bounding_box(&self) -> Rect {
        let m = self.matrix();
        let points: Vec<Point> = match &self.body {
            ShapeBody::Arrow(body) => body
                .path()
                .polyline(CURVE_SAMPLES)
                .into_iter()
                .map(|p| m.apply(p))
                .collect(),
            _ => self
                .local_bounds()
                .corners()
                .into_iter()
                .map(|p| m.apply(p))
                .collect(),
        };
        Rect::from_points(points).unwrap_or_default()
    }

    /// Arrow stroke width on screen, plain stroke width for other kinds
    pub fn visual_stroke_width(&self) -> f32 {
        match &self.body {
            ShapeBody::Arrow(body) => body.visual_stroke_width(
                self.stroke_width,
                self.stroke_uniform,
                self.transform.scale_x,
                self.transform.scale_y,
            ),
            _ => self.stroke_width,
        }
    }

    pub fn contains_point(&self, scene: Point) -> bool {
        self.contains_point_with(scene, &HitTolerance::default())
    }

    pub fn contains_point_with(&self, scene: Point, tolerance: &HitTolerance) -> bool {
        let Ok(local) = self.to_local(scene) else {
            return false;
        };
        match &self.body {
            ShapeBody::Arrow(body) => {
                // Measure in the scale-compensated frame so the threshold is physical
                let (sx, sy) = (self.transform.scale_x, self.transform.scale_y);
                let path = body.path_scaled(sx, sy);
                let threshold = (self.visual_stroke_width() * 0.5 + tolerance.margin)
                    .max(tolerance.min_threshold);
                path.distance(local.scale_xy(sx, sy), tolerance.curve_samples) <= threshold
            }
            ShapeBody::Connector(body) => {
                let threshold = (self.stroke_width * 0.5 + tolerance.margin).max(tolerance.min_threshold);
                distance_to_segment(local, body.p1, body.p2) <= threshold
            }
            ShapeBody::NumberMarker(body) => local.length() <= body.radius(),
            ShapeBody::MagnifierView(MagnifierViewBody {
                magnifier_shape: MagnifierShape::Ellipse,
                ..
            })
            | ShapeBody::MagnifierSource(MagnifierSourceBody {
                magnifier_shape: MagnifierShape::Ellipse,
                ..
            }) => {
                let rx = (self.width * 0.5).max(f32::EPSILON);
                let ry = (self.height * 0.5).max(f32::EPSILON);
                (local.x / rx).powi(2) + (local.y / ry).powi(2) <= 1.0
            }
            _ => self.local_bounds().contains(local),
        }
    }

    /// Scene positions of an arrow's endpoints
    pub fn arrow_endpoints(&self) -> Option<(Point, Point)> {
        let body = self.as_arrow()?;
        let m = self.matrix();
        Some((m.apply(body.p1), m.apply(body.p2)))
    }

    /// Move one arrow endpoint to a scene position, then re-center the shape so
    /// `p1`/`p2` stay symmetric about the new origin.
    pub fn move_arrow_endpoint(&mut self, end: ArrowEnd, scene: Point) -> EditorResult<()> {
        let local = self.to_local(scene)?;
        let m = self.transform.checked_matrix()?;
        let Some(body) = self.as_arrow() else {
            return Err(EditorError::geometry("shape is not an arrow"));
        };
        let (mut p1, mut p2) = (body.p1, body.p2);
        match end {
            ArrowEnd::Start => p1 = local,
            ArrowEnd::End => p2 = local,
        }
        if p1.distance(p2) <= BEND_EPSILON {
            return Err(EditorError::geometry("arrow endpoints must differ"));
        }
        let center = p1.midpoint(p2);
        let new_translation = m.apply(center);
        if let Some(body) = self.as_arrow_mut() {
            body.p1 = p1 - center;
            body.p2 = p2 - center;
        }
        self.transform.translation = new_translation;
        self.refresh_extent();
        Ok(())
    }

    /// Scene positions of a connector's ends
    pub fn connector_endpoints(&self) -> Option<(Point, Point)> {
        match &self.body {
            ShapeBody::Connector(body) => {
                let m = self.matrix();
                Some((m.apply(body.p1), m.apply(body.p2)))
            }
            _ => None,
        }
    }

    /// Re-seat a connector between two scene points
    pub fn set_connector_ends(&mut self, from: Point, to: Point) {
        let center = from.midpoint(to);
        if let ShapeBody::Connector(body) = &mut self.body {
            body.p1 = from - center;
            body.p2 = to - center;
            self.transform = ShapeTransform::at(center);
            self.refresh_extent();
        }
    }

    /// Ids this shape links to (for cascading deletes)
    pub fn linked_ids(&self) -> Vec<&ShapeId> {
        match &self.body {
            ShapeBody::MagnifierView(body) => body.source_id.iter().collect(),
            ShapeBody::MagnifierSource(body) => body.view_id.iter().collect(),
            ShapeBody::Connector(body) => body.view_id.iter().chain(body.source_id.iter()).collect(),
            _ => Vec::new(),
        }
    }

    /// Check the invariants a freshly loaded or edited shape must satisfy
    pub fn validate(&self) -> EditorResult<()> {
        self.transform.validate()?;
        if !self.stroke_width.is_finite() || self.stroke_width < 0.0 {
            return Err(EditorError::geometry("stroke width must be finite and >= 0"));
        }
        match &self.body {
            ShapeBody::Arrow(body) => {
                if !body.p1.is_finite() || !body.p2.is_finite() || !body.bend.is_finite() {
                    return Err(EditorError::geometry("arrow points must be finite"));
                }
                if body.p1 == body.p2 {
                    return Err(EditorError::geometry("arrow endpoints must differ"));
                }
            }
            ShapeBody::Mosaic(body) => {
                check_block_size(body.block_size)?;
                check_extent(self.width, self.height)?;
            }
            ShapeBody::MagnifierView(body) => {
                if !body.magnification.is_finite() || body.magnification < 1.0 {
                    return Err(EditorError::geometry("magnification must be >= 1"));
                }
            }
            ShapeBody::NumberMarker(body) => {
                if !body.font_size.is_finite() || body.font_size <= 0.0 {
                    return Err(EditorError::geometry("marker font size must be > 0"));
                }
            }
            ShapeBody::Connector(body) => {
                if !body.p1.is_finite() || !body.p2.is_finite() {
                    return Err(EditorError::geometry("connector points must be finite"));
                }
            }
            ShapeBody::MagnifierSource(_) | ShapeBody::Crop | ShapeBody::Background(_) => {
                check_extent(self.width, self.height)?;
            }
        }
        Ok(())
    }
}

fn check_block_size(block_size: f32) -> EditorResult<()> {
    if block_size.is_finite() && block_size > 0.0 {
        Ok(())
    } else {
        Err(EditorError::geometry("mosaic block size must be > 0"))
    }
}

fn check_extent(width: f32, height: f32) -> EditorResult<()> {
    if width.is_finite() && height.is_finite() && width >= 0.0 && height >= 0.0 {
        Ok(())
    } else {
        Err(EditorError::geometry("extent must be finite and non-negative"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::arrow::AnchorStyle;

    fn config() -> EditorConfig {
        EditorConfig::default()
    }

    #[test]
    fn test_arrow_is_centered_on_chord() {
        let arrow = Shape::arrow("a", Point::new(0.0, 0.0), Point::new(100.0, 0.0), &config()).unwrap();
        assert_eq!(arrow.center(), Point::new(50.0, 0.0));
        let body = arrow.as_arrow().unwrap();
        assert_eq!(body.p1, Point::new(-50.0, 0.0));
        assert_eq!(body.p2, Point::new(50.0, 0.0));
        assert_eq!(arrow.width, 100.0);
        assert!(Shape::arrow("b", Point::new(1.0, 1.0), Point::new(1.0, 1.0), &config()).is_err());
    }

    #[test]
    fn test_straight_arrow_hit_matches_segment_distance() {
        let arrow = Shape::arrow("a", Point::new(0.0, 0.0), Point::new(100.0, 0.0), &config()).unwrap();
        let tol = HitTolerance::default();
        let threshold = (arrow.visual_stroke_width() * 0.5 + tol.margin).max(tol.min_threshold);
        for p in [
            Point::new(50.0, 0.0),
            Point::new(20.0, threshold - 0.01),
            Point::new(20.0, threshold + 0.01),
            Point::new(-threshold + 0.5, 0.0),
            Point::new(100.0 + threshold + 0.5, 0.0),
            Point::new(70.0, -30.0),
        ] {
            let exact = distance_to_segment(p, Point::new(0.0, 0.0), Point::new(100.0, 0.0));
            assert_eq!(arrow.contains_point(p), exact <= threshold, "point {p:?}");
        }
    }

    #[test]
    fn test_curved_arrow_hits_the_bulge_not_the_chord() {
        let mut arrow = Shape::arrow("a", Point::new(0.0, 0.0), Point::new(100.0, 0.0), &config()).unwrap();
        if let Some(body) = arrow.as_arrow_mut() {
            body.anchor_style = AnchorStyle::Curved;
            body.bend = Point::new(0.0, -40.0);
        }
        arrow.refresh_extent();
        assert!(arrow.contains_point(Point::new(50.0, -40.0)));
        assert!(!arrow.contains_point(Point::new(50.0, 0.0)));
        let bbox = arrow.bounding_box();
        assert!(bbox.top <= -39.9);
        assert!(arrow.height >= 39.9);
    }

    #[test]
    fn test_move_endpoint_recenters() {
        let mut arrow = Shape::arrow("a", Point::new(0.0, 0.0), Point::new(100.0, 0.0), &config()).unwrap();
        arrow
            .set_transform(ShapeTransform {
                rotation: 30.0,
                scale_x: 2.0,
                ..arrow.transform
            })
            .unwrap();
        let (start_before, _) = arrow.arrow_endpoints().unwrap();
        arrow.move_arrow_endpoint(ArrowEnd::End, Point::new(200.0, 80.0)).unwrap();
        let (start, end) = arrow.arrow_endpoints().unwrap();
        assert!(start.distance(start_before) < 1e-3);
        assert!(end.distance(Point::new(200.0, 80.0)) < 1e-3);
        let body = arrow.as_arrow().unwrap();
        assert!((body.p1 + body.p2).length() < 1e-4);
        assert!(arrow.center().distance(start.midpoint(end)) < 1e-3);
    }

    #[test]
    fn test_move_endpoint_rejects_collapse() {
        let mut arrow = Shape::arrow("a", Point::new(0.0, 0.0), Point::new(100.0, 0.0), &config()).unwrap();
        let before = arrow.clone();
        let err = arrow.move_arrow_endpoint(ArrowEnd::End, Point::new(0.0, 0.0));
        assert!(matches!(err, Err(EditorError::InvalidGeometry(_))));
        assert_eq!(arrow, before);
    }

    #[test]
    fn test_number_marker_locks_rotation_and_skew() {
        let mut marker = Shape::number_marker("m", Point::new(10.0, 10.0), 3, &config());
        assert_eq!(marker.width, 32.0);
        marker
            .set_transform(ShapeTransform {
                rotation: 45.0,
                scale_x: 2.0,
                scale_y: 0.5,
                skew_x: 10.0,
                ..marker.transform
            })
            .unwrap();
        assert_eq!(marker.transform.rotation, 0.0);
        assert_eq!(marker.transform.skew_x, 0.0);
        assert_eq!(marker.transform.scale_y, 2.0);
        assert!(marker.contains_point(Point::new(10.0 + 30.0, 10.0)));
        assert!(!marker.contains_point(Point::new(10.0 + 33.0, 10.0)));
    }

    #[test]
    fn test_set_transform_rejects_zero_scale() {
        let mut crop = Shape::crop("c", Rect::new(0.0, 0.0, 10.0, 10.0)).unwrap();
        let before = crop.transform;
        assert!(crop
            .set_transform(ShapeTransform {
                scale_x: 0.0,
                ..before
            })
            .is_err());
        assert_eq!(crop.transform, before);
    }

    #[test]
    fn test_magnifier_pair_sizes_view_from_source() {
        let (view, source) = Shape::magnifier_pair(
            "v",
            "s",
            Rect::from_xywh(0.0, 0.0, 50.0, 50.0),
            Point::new(200.0, 200.0),
            2.0,
            MagnifierShape::Ellipse,
        )
        .unwrap();
        assert_eq!(view.scaled_size(), (100.0, 100.0));
        assert_eq!(view.linked_ids(), vec![&"s".to_string()]);
        assert_eq!(source.linked_ids(), vec![&"v".to_string()]);
        // Ellipse pick excludes the corners
        assert!(!view.contains_point(Point::new(152.0, 152.0)));
        assert!(view.contains_point(Point::new(200.0, 155.0)));
    }

    #[test]
    fn test_rect_bounding_box_under_rotation() {
        let mut mosaic = Shape::mosaic("m", Rect::from_xywh(0.0, 0.0, 20.0, 10.0), 5.0).unwrap();
        mosaic
            .set_transform(ShapeTransform {
                rotation: 90.0,
                ..mosaic.transform
            })
            .unwrap();
        let bbox = mosaic.bounding_box();
        assert!((bbox.width() - 10.0).abs() < 1e-3);
        assert!((bbox.height() - 20.0).abs() < 1e-3);
        assert!(Shape::mosaic("x", Rect::from_xywh(0.0, 0.0, 5.0, 5.0), 0.0).is_err());
    }

    #[test]
    fn test_kind_tags_and_legacy_aliases() {
        for kind in ShapeKind::ALL {
            assert_eq!(ShapeKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ShapeKind::parse("mosaic-rect"), Some(ShapeKind::Mosaic));
        assert_eq!(ShapeKind::parse("magnifier-connection-line"), Some(ShapeKind::Connector));
        assert_eq!(ShapeKind::parse("textbox"), None);
    }
}
