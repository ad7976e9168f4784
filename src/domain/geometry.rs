//! Geometry kernel: points, bounds, 2x3 affine matrices and quadratic bezier math
//!
//! All coordinates are `f32`. Matrices wrap `tiny_skia::Transform`, so the
//! renderers can hand them to tiny-skia unchanged.

use serde::{Deserialize, Serialize};
use tiny_skia::Transform;

use crate::error::{EditorError, EditorResult};

/// A 2D point (or vector) in whatever space the caller is working in
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Point) -> f32 {
        (self - other).length()
    }

    pub fn dot(self, other: Point) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn lerp(self, other: Point, t: f32) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) * 0.5, (self.y + other.y) * 0.5)
    }

    /// Unit vector in the same direction, or `None` for a (near) zero vector
    pub fn normalized(self) -> Option<Point> {
        let len = self.length();
        if len <= f32::EPSILON || !len.is_finite() {
            return None;
        }
        Some(Point::new(self.x / len, self.y / len))
    }

    /// Left-hand perpendicular `(-y, x)`
    pub fn perp(self) -> Point {
        Point::new(-self.y, self.x)
    }

    pub fn scale(self, k: f32) -> Point {
        Point::new(self.x * k, self.y * k)
    }

    /// Component-wise multiply
    pub fn scale_xy(self, sx: f32, sy: f32) -> Point {
        Point::new(self.x * sx, self.y * sy)
    }
}

impl std::ops::Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Neg for Point {
    type Output = Point;
    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

/// Axis-aligned bounds
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    /// Create a new rectangle from coordinates
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn from_xywh(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    /// Smallest rectangle enclosing all points, `None` for an empty iterator
    pub fn from_points(points: impl IntoIterator<Item = Point>) -> Option<Rect> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut rect = Rect::new(first.x, first.y, first.x, first.y);
        for p in iter {
            rect.left = rect.left.min(p.x);
            rect.top = rect.top.min(p.y);
            rect.right = rect.right.max(p.x);
            rect.bottom = rect.bottom.max(p.y);
        }
        Some(rect)
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.left + self.right) * 0.5,
            (self.top + self.bottom) * 0.5,
        )
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.left, self.top),
            Point::new(self.right, self.top),
            Point::new(self.right, self.bottom),
            Point::new(self.left, self.bottom),
        ]
    }

    /// Check if this rectangle contains a point (edges inclusive)
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x <= self.right && p.y >= self.top && p.y <= self.bottom
    }

    /// Calculate the intersection of two rectangles
    pub fn intersect(&self, other: Rect) -> Option<Rect> {
        let left = self.left.max(other.left);
        let top = self.top.max(other.top);
        let right = self.right.min(other.right);
        let bottom = self.bottom.min(other.bottom);
        if left < right && top < bottom {
            Some(Rect::new(left, top, right, bottom))
        } else {
            None
        }
    }

    pub fn to_skia(self) -> Option<tiny_skia::Rect> {
        tiny_skia::Rect::from_ltrb(self.left, self.top, self.right, self.bottom)
    }
}

/// 2x3 affine matrix backed by [`tiny_skia::Transform`]
///
/// Row layout `[sx, ky, kx, sy, tx, ty]`: `x' = sx*x + kx*y + tx`,
/// `y' = ky*x + sy*y + ty`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix(Transform);

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix(Transform {
        sx: 1.0,
        ky: 0.0,
        kx: 0.0,
        sy: 1.0,
        tx: 0.0,
        ty: 0.0,
    });

    pub fn from_row(sx: f32, ky: f32, kx: f32, sy: f32, tx: f32, ty: f32) -> Self {
        Self(Transform::from_row(sx, ky, kx, sy, tx, ty))
    }

    pub fn translate(tx: f32, ty: f32) -> Self {
        Self(Transform::from_translate(tx, ty))
    }

    pub fn scale(sx: f32, sy: f32) -> Self {
        Self(Transform::from_scale(sx, sy))
    }

    /// Rotation by `degrees`, clockwise on screen (y grows downward)
    pub fn rotate(degrees: f32) -> Self {
        Self(Transform::from_rotate(degrees))
    }

    pub fn skew_x(degrees: f32) -> Self {
        Self(Transform::from_skew(degrees.to_radians().tan(), 0.0))
    }

    pub fn skew_y(degrees: f32) -> Self {
        Self(Transform::from_skew(0.0, degrees.to_radians().tan()))
    }

    /// `self * other`: apply `other` first, then `self`
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix(self.0.pre_concat(other.0))
    }

    pub fn apply(&self, p: Point) -> Point {
        let mut points = [tiny_skia::Point::from_xy(p.x, p.y)];
        self.0.map_points(&mut points);
        Point::new(points[0].x, points[0].y)
    }

    /// Apply only the linear part (no translation)
    pub fn apply_vector(&self, v: Point) -> Point {
        let t = &self.0;
        Point::new(t.sx * v.x + t.kx * v.y, t.ky * v.x + t.sy * v.y)
    }

    /// Length of the images of the unit x and y axes
    pub fn axis_scales(&self) -> (f32, f32) {
        let t = &self.0;
        (t.sx.hypot(t.ky), t.kx.hypot(t.sy))
    }

    pub fn determinant(&self) -> f32 {
        self.0.sx * self.0.sy - self.0.ky * self.0.kx
    }

    pub fn is_finite(&self) -> bool {
        let t = &self.0;
        [t.sx, t.ky, t.kx, t.sy, t.tx, t.ty]
            .iter()
            .all(|v| v.is_finite())
    }

    pub fn inverse(&self) -> Option<Matrix> {
        self.0.invert().map(Matrix)
    }

    pub fn to_skia(self) -> Transform {
        self.0
    }
}

/// Pan/zoom state of the host canvas: `screen = zoom * scene + pan`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub pan: Point,
    pub zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan: Point::ZERO,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    pub fn matrix(&self) -> Matrix {
        Matrix::from_row(self.zoom, 0.0, 0.0, self.zoom, self.pan.x, self.pan.y)
    }

    pub fn to_screen(&self, scene: Point) -> Point {
        self.matrix().apply(scene)
    }

    pub fn to_scene(&self, screen: Point) -> Point {
        let zoom = if self.zoom.abs() > f32::EPSILON {
            self.zoom
        } else {
            1.0
        };
        Point::new((screen.x - self.pan.x) / zoom, (screen.y - self.pan.y) / zoom)
    }
}

fn check_point(p: Point, what: &str) -> EditorResult<()> {
    if p.is_finite() {
        Ok(())
    } else {
        Err(EditorError::geometry(format!("{what} is not finite")))
    }
}

/// Map `p` through `matrix`
pub fn transform_point(p: Point, matrix: &Matrix) -> EditorResult<Point> {
    check_point(p, "point")?;
    if !matrix.is_finite() {
        return Err(EditorError::geometry("matrix is not finite"));
    }
    Ok(matrix.apply(p))
}

/// Invert `matrix`, rejecting singular or non-finite input
pub fn invert(matrix: &Matrix) -> EditorResult<Matrix> {
    if !matrix.is_finite() {
        return Err(EditorError::geometry("matrix is not finite"));
    }
    matrix
        .inverse()
        .ok_or_else(|| EditorError::geometry("matrix is singular"))
}

/// Build `translate * rotate * scale * skewX * skewY`
///
/// Angles are in degrees. Zero scale is rejected because it would make the
/// shape impossible to pick or edit again.
pub fn compose_matrix(
    translation: Point,
    rotation: f32,
    scale_x: f32,
    scale_y: f32,
    skew_x: f32,
    skew_y: f32,
) -> EditorResult<Matrix> {
    check_point(translation, "translation")?;
    for (value, name) in [
        (rotation, "rotation"),
        (scale_x, "scaleX"),
        (scale_y, "scaleY"),
        (skew_x, "skewX"),
        (skew_y, "skewY"),
    ] {
        if !value.is_finite() {
            return Err(EditorError::geometry(format!("{name} is not finite")));
        }
    }
    if scale_x == 0.0 || scale_y == 0.0 {
        return Err(EditorError::geometry("scale must not be zero"));
    }
    if skew_x.abs() >= 90.0 || skew_y.abs() >= 90.0 {
        return Err(EditorError::geometry("skew must stay within (-90, 90) degrees"));
    }

    let m = Matrix::translate(translation.x, translation.y)
        .multiply(&Matrix::rotate(rotation))
        .multiply(&Matrix::scale(scale_x, scale_y))
        .multiply(&Matrix::skew_x(skew_x))
        .multiply(&Matrix::skew_y(skew_y));
    Ok(m)
}

/// Point on the quadratic bezier `p0 -> control -> p2` at parameter `t`
pub fn eval_quadratic_bezier(p0: Point, control: Point, p2: Point, t: f32) -> EditorResult<Point> {
    check_point(p0, "bezier start")?;
    check_point(control, "bezier control")?;
    check_point(p2, "bezier end")?;
    if !t.is_finite() {
        return Err(EditorError::geometry("bezier parameter is not finite"));
    }
    Ok(quad_point(p0, control, p2, t))
}

/// Derivative of the quadratic bezier at `t` (not normalized)
pub fn tangent_at(p0: Point, control: Point, p2: Point, t: f32) -> EditorResult<Point> {
    check_point(p0, "bezier start")?;
    check_point(control, "bezier control")?;
    check_point(p2, "bezier end")?;
    if !t.is_finite() {
        return Err(EditorError::geometry("bezier parameter is not finite"));
    }
    Ok(quad_tangent(p0, control, p2, t))
}

/// Unchecked bezier evaluation for callers that validated their inputs.
///
/// Written so `t == 0` yields `p0` and `t == 1` yields `p2` bit for bit.
pub(crate) fn quad_point(p0: Point, control: Point, p2: Point, t: f32) -> Point {
    let mt = 1.0 - t;
    let w0 = mt * mt;
    let w1 = 2.0 * mt * t;
    let w2 = t * t;
    Point::new(
        w0 * p0.x + w1 * control.x + w2 * p2.x,
        w0 * p0.y + w1 * control.y + w2 * p2.y,
    )
}

pub(crate) fn quad_tangent(p0: Point, control: Point, p2: Point, t: f32) -> Point {
    let mt = 1.0 - t;
    Point::new(
        2.0 * mt * (control.x - p0.x) + 2.0 * t * (p2.x - control.x),
        2.0 * mt * (control.y - p0.y) + 2.0 * t * (p2.y - control.y),
    )
}

/// Exact distance from `p` to the segment `a..b`
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f32 {
    let ab = b - a;
    let len_sq = ab.dot(ab);
    if len_sq <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance(a.lerp(b, t))
}
