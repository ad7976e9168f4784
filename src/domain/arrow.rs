//! Arrow styles and curve geometry
//!
//! Arrow endpoints are stored relative to the shape center. An optional bend
//! offset (also local) turns the arrow into an elbow (straight anchors) or a
//! quadratic curve (curved anchors). Head geometry is always derived from the
//! tangent at the endpoint so heads stay rigid while the shaft bends.

use serde::{Deserialize, Serialize};

use super::geometry::{Point, Rect, distance_to_segment, quad_point, quad_tangent};

/// Bend offsets at or below this magnitude count as "no bend"
pub const BEND_EPSILON: f32 = 0.1;

/// Which ends carry a head
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeadKind {
    None,
    /// Head at `p1`
    Left,
    /// Head at `p2`
    #[default]
    Right,
    Both,
}

impl HeadKind {
    pub fn at_start(self) -> bool {
        matches!(self, HeadKind::Left | HeadKind::Both)
    }

    pub fn at_end(self) -> bool {
        matches!(self, HeadKind::Right | HeadKind::Both)
    }

    /// Exactly one head (the case where tapering and contour mode apply)
    pub fn is_single(self) -> bool {
        matches!(self, HeadKind::Left | HeadKind::Right)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeadStyle {
    #[default]
    Sharp,
    Swallowtail,
    SharpHollow,
    SwallowtailHollow,
}

impl HeadStyle {
    pub fn is_hollow(self) -> bool {
        matches!(self, HeadStyle::SharpHollow | HeadStyle::SwallowtailHollow)
    }

    pub fn is_swallowtail(self) -> bool {
        matches!(self, HeadStyle::Swallowtail | HeadStyle::SwallowtailHollow)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
    DashDot,
}

impl LineStyle {
    /// Dash intervals scaled by the visual stroke width, empty for solid lines
    pub fn dash_array(self, width: f32) -> Vec<f32> {
        match self {
            LineStyle::Solid => Vec::new(),
            LineStyle::Dashed => vec![width * 3.0, width * 3.0],
            LineStyle::Dotted => vec![width, width * 2.0],
            LineStyle::DashDot => vec![width * 4.0, width * 2.0, width, width * 2.0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThicknessStyle {
    #[default]
    Uniform,
    Varying,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnchorStyle {
    #[default]
    Straight,
    Curved,
}

/// Which endpoint of an arrow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrowEnd {
    Start,
    End,
}

/// Arrow-specific shape state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrowBody {
    /// Start point, local to the shape center
    pub p1: Point,
    /// End point, local to the shape center
    pub p2: Point,
    /// Offset of the bend handle from the chord midpoint; zero means straight
    #[serde(default)]
    pub bend: Point,
    #[serde(default)]
    pub head_kind: HeadKind,
    #[serde(default)]
    pub head_style: HeadStyle,
    #[serde(default)]
    pub line_style: LineStyle,
    #[serde(default)]
    pub thickness_style: ThicknessStyle,
    #[serde(default)]
    pub anchor_style: AnchorStyle,
}

impl ArrowBody {
    pub fn new(p1: Point, p2: Point) -> Self {
        Self {
            p1,
            p2,
            bend: Point::ZERO,
            head_kind: HeadKind::default(),
            head_style: HeadStyle::default(),
            line_style: LineStyle::default(),
            thickness_style: ThicknessStyle::default(),
            anchor_style: AnchorStyle::default(),
        }
    }

    pub fn chord_mid(&self) -> Point {
        self.p1.midpoint(self.p2)
    }

    pub fn is_bent(&self) -> bool {
        self.bend.length() > BEND_EPSILON
    }

    /// Local position of the bend control handle (on the curve / at the elbow)
    pub fn bend_handle(&self) -> Point {
        self.chord_mid() + self.bend
    }

    pub fn endpoint(&self, end: ArrowEnd) -> Point {
        match end {
            ArrowEnd::Start => self.p1,
            ArrowEnd::End => self.p2,
        }
    }

    /// Path in local units
    pub fn path(&self) -> ArrowPath {
        self.path_scaled(1.0, 1.0)
    }

    /// Path in the scale-compensated frame: local points multiplied by the
    /// shape scale, so widths drawn there are physical widths.
    pub fn path_scaled(&self, sx: f32, sy: f32) -> ArrowPath {
        let p1 = self.p1.scale_xy(sx, sy);
        let p2 = self.p2.scale_xy(sx, sy);
        if !self.is_bent() {
            return ArrowPath::Line { p1, p2 };
        }
        let mid = self.chord_mid();
        match self.anchor_style {
            AnchorStyle::Curved => ArrowPath::Quad {
                p1,
                control: (mid + self.bend.scale(2.0)).scale_xy(sx, sy),
                p2,
            },
            AnchorStyle::Straight => ArrowPath::Elbow {
                p1,
                corner: (mid + self.bend).scale_xy(sx, sy),
                p2,
            },
        }
    }

    /// Stroke width as it appears on screen.
    ///
    /// Non-uniform strokes pick up the scale perpendicular to the chord.
    pub fn visual_stroke_width(&self, stroke_width: f32, uniform: bool, sx: f32, sy: f32) -> f32 {
        if uniform {
            return stroke_width;
        }
        let d = self.p2 - self.p1;
        let angle = d.y.atan2(d.x);
        let perp_scale = (sx * angle.sin()).hypot(sy * angle.cos());
        stroke_width * perp_scale
    }

    /// Bend offset that turns the arrow into an axis-aligned "L" whose corner
    /// is the candidate closest to `local`.
    pub fn snapped_l_bend(&self, local: Point) -> Point {
        let horizontal_first = Point::new(self.p2.x, self.p1.y);
        let vertical_first = Point::new(self.p1.x, self.p2.y);
        let corner = if local.distance(horizontal_first) <= local.distance(vertical_first) {
            horizontal_first
        } else {
            vertical_first
        };
        corner - self.chord_mid()
    }
}

/// Resolved centerline of an arrow
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArrowPath {
    Line { p1: Point, p2: Point },
    Elbow { p1: Point, corner: Point, p2: Point },
    Quad { p1: Point, control: Point, p2: Point },
}

impl ArrowPath {
    pub fn start(&self) -> Point {
        match *self {
            ArrowPath::Line { p1, .. }
            | ArrowPath::Elbow { p1, .. }
            | ArrowPath::Quad { p1, .. } => p1,
        }
    }

    pub fn end(&self) -> Point {
        match *self {
            ArrowPath::Line { p2, .. }
            | ArrowPath::Elbow { p2, .. }
            | ArrowPath::Quad { p2, .. } => p2,
        }
    }

    pub fn is_straight(&self) -> bool {
        matches!(self, ArrowPath::Line { .. })
    }

    /// Point at parameter `t`; `t == 0` and `t == 1` return the endpoints exactly
    pub fn eval(&self, t: f32) -> Point {
        if t <= 0.0 {
            return self.start();
        }
        if t >= 1.0 {
            return self.end();
        }
        match *self {
            ArrowPath::Line { p1, p2 } => p1.lerp(p2, t),
            ArrowPath::Elbow { p1, corner, p2 } => {
                if t < 0.5 {
                    p1.lerp(corner, t * 2.0)
                } else {
                    corner.lerp(p2, t * 2.0 - 1.0)
                }
            }
            ArrowPath::Quad { p1, control, p2 } => quad_point(p1, control, p2, t),
        }
    }

    /// Derivative direction at `t` (not normalized)
    pub fn tangent(&self, t: f32) -> Point {
        match *self {
            ArrowPath::Line { p1, p2 } => p2 - p1,
            ArrowPath::Elbow { p1, corner, p2 } => {
                let first = corner - p1;
                let second = p2 - corner;
                let pick = if t < 0.5 { first } else { second };
                if pick.length() > f32::EPSILON {
                    pick
                } else {
                    p2 - p1
                }
            }
            ArrowPath::Quad { p1, control, p2 } => {
                let d = quad_tangent(p1, control, p2, t);
                if d.length() > f32::EPSILON {
                    d
                } else {
                    p2 - p1
                }
            }
        }
    }

    /// Unit vector pointing out of the arrow at the given end
    pub fn outward_direction(&self, end: ArrowEnd) -> Point {
        let fallback = Point::new(1.0, 0.0);
        match end {
            ArrowEnd::End => self.tangent(1.0).normalized().unwrap_or(fallback),
            ArrowEnd::Start => (-self.tangent(0.0)).normalized().unwrap_or(-fallback),
        }
    }

    /// Polyline approximation. Line and elbow paths return their exact vertices.
    pub fn polyline(&self, steps: usize) -> Vec<Point> {
        match *self {
            ArrowPath::Line { p1, p2 } => vec![p1, p2],
            ArrowPath::Elbow { p1, corner, p2 } => vec![p1, corner, p2],
            ArrowPath::Quad { .. } => {
                let steps = steps.max(1);
                (0..=steps)
                    .map(|i| self.eval(i as f32 / steps as f32))
                    .collect()
            }
        }
    }

    /// Dense sampling along the parameter, used for tapered outlines
    pub fn sample(&self, steps: usize) -> Vec<(Point, Point)> {
        let steps = steps.max(1);
        (0..=steps)
            .map(|i| {
                let t = i as f32 / steps as f32;
                (self.eval(t), self.tangent(t))
            })
            .collect()
    }

    /// Distance from `p` to the centerline.
    ///
    /// Exact for straight and elbow paths, sampled for curves.
    pub fn distance(&self, p: Point, steps: usize) -> f32 {
        let points = self.polyline(steps);
        points
            .windows(2)
            .map(|w| distance_to_segment(p, w[0], w[1]))
            .fold(f32::INFINITY, f32::min)
    }

    /// Bounds of the whole (sampled) centerline, not just the chord
    pub fn bounds(&self, steps: usize) -> Rect {
        let points = self.polyline(steps);
        Rect::from_points(points).unwrap_or_default()
    }
}

/// Triangle (or swallowtail) head in the scale-compensated frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadGeometry {
    pub tip: Point,
    pub wing_a: Point,
    pub wing_b: Point,
    /// Indented back point for swallowtail heads
    pub notch: Option<Point>,
}

impl HeadGeometry {
    /// Build a head at `tip` pointing along unit `direction`
    pub fn new(tip: Point, direction: Point, length: f32, half_width: f32, swallowtail: bool) -> Self {
        let back = tip - direction.scale(length);
        let normal = direction.perp();
        Self {
            tip,
            wing_a: back + normal.scale(half_width),
            wing_b: back - normal.scale(half_width),
            notch: swallowtail.then(|| tip - direction.scale(length * 0.6)),
        }
    }

    pub fn points(&self) -> Vec<Point> {
        match self.notch {
            Some(notch) => vec![self.tip, self.wing_a, notch, self.wing_b],
            None => vec![self.tip, self.wing_a, self.wing_b],
        }
    }
}

/// Head length and half-width for a visual stroke width
pub fn head_dimensions(visual_width: f32, hollow: bool) -> (f32, f32) {
    let length = (visual_width * 2.5).max(10.0);
    let half_width = (visual_width * 1.5).max(6.0);
    if hollow {
        (length * 1.5, half_width * 1.5)
    } else {
        (length, half_width)
    }
}
